use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use flaps_server::config::{self, AppState, Config, Overrides};
use flaps_server::{logger, server, Result};

/// Serve a local directory of static files over HTTP.
#[derive(Parser, Debug)]
#[command(name = "flaps-server")]
#[command(version)]
struct Args {
    /// Config file, extension optional; a missing file is ignored
    #[arg(short, long, env = "FLAPS_CONFIG", default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Listen host
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// URL prefix the directory is mounted at ("/" or e.g. "/flap")
    #[arg(long)]
    prefix: Option<String>,

    /// Directory to serve
    #[arg(short, long)]
    dir: Option<String>,

    /// Tokio worker threads
    #[arg(long)]
    workers: Option<usize>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            prefix: self.prefix.clone(),
            directory: self.dir.clone(),
            workers: self.workers,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let cfg = Config::load_from(&args.config, &args.overrides())?;
    logger::init(&cfg)?;

    // Fails fast when the directory is missing
    let state = Arc::new(AppState::new(cfg)?);
    let addr = state.config.get_socket_addr()?;

    // Tokio runtime sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = state.config.server.workers.filter(|&w| w > 0) {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async move {
        let listener = server::create_listener(addr)?;
        logger::log_server_start(&addr, &state);
        server::serve(listener, state, server::shutdown_signal()).await
    })
}
