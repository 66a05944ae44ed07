//! pass-secret-service - a freedesktop Secret Service backed by pass.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pass_secret_service::cli::{self, output, Cli, Settings};
use pass_secret_service::core::constants::LOG_ENV;
use pass_secret_service::dbus;
use pass_secret_service::error::{Error, Result};

fn main() {
    let cli = Cli::parse();

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => fail(&e),
    };

    init_tracing(&settings, cli.log_json);

    if cli.check {
        cli::print_settings(&settings);
        return;
    }

    if let Err(e) = run(&settings) {
        fail(&e);
    }
}

fn init_tracing(settings: &Settings, json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(fmt::layer().with_target(false).without_time())
            .init();
    }
}

fn run(settings: &Settings) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(settings.blocking_threads)
        .build()
        .map_err(|e| Error::Worker(format!("failed to start runtime: {}", e)))?;
    runtime.block_on(dbus::serve(settings))
}

fn fail(error: &Error) -> ! {
    output::error(&error.to_string());
    if let Some(hint) = cli::hint(error) {
        output::hint(hint);
    }
    std::process::exit(1);
}
