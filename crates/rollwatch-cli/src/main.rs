//! rollwatch — verify that a fleet restarted and settled after a rollout.
//!
//! # Usage
//!
//! ```text
//! rollwatch init --selector component=kube-scheduler
//! rollwatch snapshot
//! rollwatch run -- kubectl apply -f patcher.yaml
//! rollwatch check --deadline 5m
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::{FleetArgs, PollArgs, TimingArgs};

#[derive(Parser)]
#[command(
    name = "rollwatch",
    about = "Verify that a fleet restarted and settled after a rollout",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a rollwatch.toml with reference timings
    Init {
        /// Where to write the config
        #[arg(short, long, default_value = "rollwatch.toml")]
        path: PathBuf,
        /// Label selector matching the fleet
        #[arg(short = 'l', long, default_value = "component=kube-scheduler")]
        selector: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Capture the fleet once and print the snapshot as JSON
    Snapshot {
        #[command(flatten)]
        fleet: FleetArgs,
    },
    /// Capture a baseline and wait for a restart triggered elsewhere
    Check {
        #[command(flatten)]
        fleet: FleetArgs,
        #[command(flatten)]
        poll: PollArgs,
    },
    /// Run a command as the mutation, bracketed by restart tracking.
    ///
    /// A non-zero exit of the command fails the run before any polling.
    Run {
        #[command(flatten)]
        fleet: FleetArgs,
        #[command(flatten)]
        timing: TimingArgs,
        /// Command to run, e.g. `kubectl apply -f patcher.yaml`
        #[arg(last = true, required = true, num_args = 1..)]
        command: Vec<String>,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,rollwatch=debug"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match cli.command {
        Commands::Init {
            path,
            selector,
            force,
        } => commands::init::init(&path, &selector, force),
        Commands::Snapshot { fleet } => {
            let config = commands::load_config(&fleet, None)?;
            commands::snapshot::snapshot(&config).await
        }
        Commands::Check { fleet, poll } => {
            let config = commands::load_config(&fleet, Some(&poll))?;
            commands::check::check(&config, poll.strict).await
        }
        Commands::Run {
            fleet,
            timing,
            command,
        } => {
            let config = commands::load_run_config(&fleet, &timing)?;
            commands::run::run(&config, &command, timing.poll.strict).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_collects_trailing_command() {
        let cli = Cli::try_parse_from([
            "rollwatch",
            "run",
            "--selector",
            "app=patcher",
            "--no-wait",
            "--",
            "kubectl",
            "apply",
            "-f",
            "patcher.yaml",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                fleet,
                timing,
                command,
            } => {
                assert_eq!(fleet.selector.as_deref(), Some("app=patcher"));
                assert!(timing.no_wait);
                assert_eq!(command, ["kubectl", "apply", "-f", "patcher.yaml"]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn run_requires_command() {
        assert!(Cli::try_parse_from(["rollwatch", "run"]).is_err());
    }

    #[test]
    fn check_parses_durations() {
        let cli = Cli::try_parse_from(["rollwatch", "check", "--deadline", "5m", "--poll-interval", "500ms"])
            .unwrap();
        match cli.command {
            Commands::Check { poll, .. } => {
                assert_eq!(poll.deadline, Some(std::time::Duration::from_secs(300)));
                assert_eq!(poll.poll_interval, Some(std::time::Duration::from_millis(500)));
            }
            _ => panic!("expected check"),
        }
        assert!(Cli::try_parse_from(["rollwatch", "check", "--deadline", "later"]).is_err());
    }

    #[test]
    fn check_rejects_no_wait() {
        assert!(Cli::try_parse_from(["rollwatch", "check", "--no-wait"]).is_err());
        assert!(Cli::try_parse_from(["rollwatch", "run", "--no-wait", "--strict", "--", "true"]).is_ok());
    }
}
