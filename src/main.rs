use std::env;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{debug, error, info};

use ical_filter_proxy::{
    cli,
    config::Config,
    feed,
    logging::{self, LogConfig},
    server,
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse(env::args().skip(1).collect());

    if let Err(err) = logging::init(&LogConfig::new(args.debug, args.json)) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    debug!(config_file = %args.config.display(), "reading config");
    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "configuration is not valid");
            return ExitCode::FAILURE;
        }
    };
    debug!(calendars = config.calendars.len(), "loaded config");

    if args.validate {
        info!("configuration was validated successfully");
        return ExitCode::SUCCESS;
    }

    let client = match feed::client() {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let router = server::router(config.calendars, client);

    let listener = match TcpListener::bind(args.address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(address = %args.address, error = %err, "error starting web server");
            return ExitCode::FAILURE;
        }
    };

    info!(address = %args.address, "starting web server");
    if let Err(err) = server::serve(listener, router, server::shutdown_signal()).await {
        error!(error = %err, "web server failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
