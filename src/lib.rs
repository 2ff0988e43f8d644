pub mod api;
pub mod catalog;
pub mod cli;
pub mod client;
pub mod config;
pub mod session;
pub mod upload;

#[cfg(test)]
mod testing;

pub use api::{ClientError, HttpJobApi, Job, JobApi, JobStatus, StyleCatalog, StylePreset};
pub use client::{resolve_result_location, JobClient, PollOptions, RetryPolicy};
pub use config::ClientConfig;
pub use session::{JobSessionController, SessionEvent, SessionState, UiPhase};
pub use upload::{SelectedFile, UploadLimits, ValidationError};

use cli::Command;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "styleforge_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Entry point for the `styleforge` binary. Returns the process exit code.
pub async fn run() -> i32 {
    // Load environment variables from .env file
    let _ = dotenvy::dotenv();
    init_tracing();

    let command = match cli::parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {}\n\n{}", e, cli::USAGE);
            return 2;
        }
    };

    if command == Command::Help {
        println!("{}", cli::USAGE);
        return 0;
    }

    let config = match ClientConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            eprintln!("error: {}", e);
            return 1;
        }
    };

    match cli::execute(command, &config).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {}", e);
            1
        }
    }
}
