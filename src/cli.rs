// src/cli.rs
// Command-line front end: one JobSessionController per invocation

use crate::api::{ClientError, Job, JobStatus};
use crate::catalog::fallback_catalog;
use crate::client::JobClient;
use crate::config::{ClientConfig, ConfigError};
use crate::session::{JobSessionController, SessionError, SessionEvent, UiPhase};
use crate::upload::SelectedFile;
use std::future::Future;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

pub const USAGE: &str = "\
Usage:
  styleforge styles
  styleforge generate <image> <style-id> [--output <path>]
  styleforge status <job-id>
  styleforge watch <job-id>
  styleforge health
  styleforge metrics

Environment:
  STYLEFORGE_API_URL            backend origin (default http://localhost:8000)
  STYLEFORGE_CONFIG             optional JSON config file
  STYLEFORGE_POLL_INTERVAL_MS   poll interval (default 1000)
  STYLEFORGE_POLL_TIMEOUT_MS    poll budget (default 300000)
  STYLEFORGE_MAX_RETRIES        retries for idempotent reads (default 0)
  RUST_LOG                      log filter (default styleforge_lib=info)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Styles,
    Generate {
        image: PathBuf,
        style_id: String,
        output: Option<PathBuf>,
    },
    Status {
        job_id: String,
    },
    Watch {
        job_id: String,
    },
    Health,
    Metrics,
    Help,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("missing command")]
    MissingCommand,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{}", .0.user_message())]
    Client(#[from] ClientError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Generation(String),
}

pub fn parse_args<I>(args: I) -> Result<Command, UsageError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let command = args.next().ok_or(UsageError::MissingCommand)?;

    let parsed = match command.as_str() {
        "styles" => Command::Styles,
        "health" => Command::Health,
        "metrics" => Command::Metrics,
        "help" | "-h" | "--help" => Command::Help,
        "status" => Command::Status {
            job_id: args.next().ok_or(UsageError::MissingArgument("job-id"))?,
        },
        "watch" => Command::Watch {
            job_id: args.next().ok_or(UsageError::MissingArgument("job-id"))?,
        },
        "generate" => {
            let mut positional = Vec::new();
            let mut output = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "-o" | "--output" => {
                        let path = args.next().ok_or(UsageError::MissingArgument("output path"))?;
                        output = Some(PathBuf::from(path));
                    }
                    _ => positional.push(arg),
                }
            }
            let mut positional = positional.into_iter();
            let image = positional.next().ok_or(UsageError::MissingArgument("image"))?;
            let style_id = positional.next().ok_or(UsageError::MissingArgument("style-id"))?;
            if let Some(extra) = positional.next() {
                return Err(UsageError::UnexpectedArgument(extra));
            }
            return Ok(Command::Generate {
                image: PathBuf::from(image),
                style_id,
                output,
            });
        }
        other => return Err(UsageError::UnknownCommand(other.to_string())),
    };

    match args.next() {
        Some(extra) => Err(UsageError::UnexpectedArgument(extra)),
        None => Ok(parsed),
    }
}

pub async fn execute(command: Command, config: &ClientConfig) -> Result<(), CliError> {
    let client = JobClient::from_config(config)?;

    match command {
        Command::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        Command::Styles => {
            let catalog = match client.list_styles().await {
                Ok(catalog) => catalog,
                Err(e) => {
                    tracing::warn!("Falling back to built-in styles: {}", e);
                    fallback_catalog()
                }
            };
            for style in &catalog.styles {
                println!("{:<16} {:<20} {}", style.id, style.name, style.description);
            }
            println!("{} styles", catalog.count);
            Ok(())
        }
        Command::Status { job_id } => {
            let job = client.get_job(&job_id).await?;
            print_job(&client, &job);
            Ok(())
        }
        Command::Watch { job_id } => {
            let cancel = cancel_on_ctrl_c(CancellationToken::new());
            let job = client
                .poll_job_cancellable(&job_id, config.poll_options(), &cancel, |job| {
                    print_progress(&job)
                })
                .await?;
            print_job(&client, &job);
            if job.status == JobStatus::Failed {
                let message = job.error_message().unwrap_or("job failed");
                return Err(CliError::Generation(message.to_string()));
            }
            Ok(())
        }
        Command::Health => {
            let health = client.health().await?;
            println!(
                "status={} version={} redis_connected={}",
                health.status, health.version, health.redis_connected
            );
            Ok(())
        }
        Command::Metrics => {
            let metrics = client.metrics().await?;
            println!(
                "total={} completed={} failed={} pending={} processing={}",
                metrics.total_jobs,
                metrics.completed_jobs,
                metrics.failed_jobs,
                metrics.pending_jobs,
                metrics.processing_jobs
            );
            Ok(())
        }
        Command::Generate {
            image,
            style_id,
            output,
        } => generate(client, config, image, style_id, output).await,
    }
}

async fn generate(
    client: JobClient,
    config: &ClientConfig,
    image: PathBuf,
    style_id: String,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let mut controller = JobSessionController::new(client, config.poll_options());
    let mut events = controller.subscribe();

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::JobUpdated { job } => print_progress(&job),
                SessionEvent::PhaseChanged { phase } => tracing::debug!("Phase: {}", phase),
                SessionEvent::Completed {
                    result_location, ..
                } => println!("Result: {}", result_location),
                SessionEvent::Failed { message } => eprintln!("Failed: {}", message),
            }
        }
    });

    let cancel = cancel_on_ctrl_c(controller.cancel_handle());

    or_cancelled(&cancel, controller.load_styles()).await?;
    let file = or_cancelled(&cancel, SelectedFile::from_path(&image)).await??;
    controller.select_file(file)?;
    controller.select_style(&style_id)?;

    let phase = controller.generate().await?;
    let outcome = match phase {
        UiPhase::Result => Ok(controller.state().result_location().map(str::to_string)),
        _ => Err(CliError::Generation(
            controller
                .state()
                .error()
                .unwrap_or("generation did not complete")
                .to_string(),
        )),
    };

    if let (Ok(Some(location)), Some(path)) = (&outcome, &output) {
        let bytes = or_cancelled(&cancel, controller.client().fetch_result(location)).await??;
        tokio::fs::write(path, &bytes).await?;
        println!("Saved {} bytes to {}", bytes.len(), path.display());
    }

    drop(controller);
    let _ = printer.await;
    outcome.map(|_| ())
}

fn cancel_on_ctrl_c(cancel: CancellationToken) -> CancellationToken {
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    cancel
}

/// Run `work` unless the token fires first
async fn or_cancelled<F: Future>(cancel: &CancellationToken, work: F) -> Result<F::Output, CliError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CliError::Client(ClientError::Cancelled)),
        output = work => Ok(output),
    }
}

fn print_progress(job: &Job) {
    println!("[{:>3}%] {} {}", job.progress_percent(), job.id, job.status);
}

fn print_job(client: &JobClient, job: &Job) {
    println!("job:      {}", job.id);
    println!("style:    {}", job.style_id);
    println!("status:   {}", job.status);
    println!("progress: {}%", job.progress_percent());
    println!("created:  {}", job.created_at.to_rfc3339());
    println!("updated:  {}", job.updated_at.to_rfc3339());
    if let Some(reference) = job.result_reference() {
        println!("result:   {}", client.resolve_result_location(reference));
    }
    if let Some(error) = job.error_message() {
        println!("error:    {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_generate() {
        assert_eq!(
            parse_args(args(&["generate", "me.jpg", "cyberpunk"])),
            Ok(Command::Generate {
                image: PathBuf::from("me.jpg"),
                style_id: "cyberpunk".to_string(),
                output: None,
            })
        );
        assert_eq!(
            parse_args(args(&["generate", "--output", "out.png", "me.jpg", "techwear"])),
            Ok(Command::Generate {
                image: PathBuf::from("me.jpg"),
                style_id: "techwear".to_string(),
                output: Some(PathBuf::from("out.png")),
            })
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_args(args(&["styles"])), Ok(Command::Styles));
        assert_eq!(parse_args(args(&["health"])), Ok(Command::Health));
        assert_eq!(parse_args(args(&["--help"])), Ok(Command::Help));
        assert_eq!(
            parse_args(args(&["watch", "abc"])),
            Ok(Command::Watch {
                job_id: "abc".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_cancelled_token_abandons_pending_work() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = or_cancelled(&cancel, std::future::pending::<()>()).await;

        assert!(matches!(
            outcome,
            Err(CliError::Client(ClientError::Cancelled))
        ));
    }

    #[tokio::test]
    async fn test_live_token_passes_output_through() {
        let cancel = CancellationToken::new();
        let outcome = or_cancelled(&cancel, async { 7 }).await;
        assert_eq!(outcome.unwrap(), 7);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_args(args(&[])), Err(UsageError::MissingCommand));
        assert_eq!(
            parse_args(args(&["paint"])),
            Err(UsageError::UnknownCommand("paint".to_string()))
        );
        assert_eq!(
            parse_args(args(&["status"])),
            Err(UsageError::MissingArgument("job-id"))
        );
        assert_eq!(
            parse_args(args(&["generate", "me.jpg"])),
            Err(UsageError::MissingArgument("style-id"))
        );
        assert_eq!(
            parse_args(args(&["generate", "me.jpg", "a", "b"])),
            Err(UsageError::UnexpectedArgument("b".to_string()))
        );
        assert_eq!(
            parse_args(args(&["metrics", "now"])),
            Err(UsageError::UnexpectedArgument("now".to_string()))
        );
    }
}
