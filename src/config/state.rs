// Application state module
// Immutable state shared by every connection

use super::types::Config;
use crate::error::Result;
use crate::routing::Mount;

/// Application state
pub struct AppState {
    pub config: Config,
    pub mount: Mount,
}

impl AppState {
    /// Build the state, validating the mount against the filesystem
    pub fn new(config: Config) -> Result<Self> {
        let mount = Mount::new(&config.mount)?;
        Ok(Self { config, mount })
    }
}
