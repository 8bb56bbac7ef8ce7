pub mod check;
pub mod init;
pub mod run;
pub mod snapshot;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;

use rollwatch_core::RollwatchConfig;
use rollwatch_core::duration::parse_duration;
use rollwatch_fleet::{KubectlFleet, SnapshotCapturer};
use rollwatch_restart::{Orchestrator, WaitOutcome};

/// Which fleet to look at.
#[derive(Args, Debug)]
pub struct FleetArgs {
    /// Config file; optional when --selector is given
    #[arg(short, long, default_value = "rollwatch.toml")]
    pub config: PathBuf,
    /// Label selector, overrides [fleet].selector
    #[arg(short = 'l', long)]
    pub selector: Option<String>,
    /// Namespace, overrides [fleet].namespace
    #[arg(short, long)]
    pub namespace: Option<String>,
}

/// Restart wait timings, shared by `check` and `run`.
#[derive(Args, Debug, Default)]
pub struct PollArgs {
    /// Minimum uptime of a restarted pod, e.g. 10s
    #[arg(long, value_parser = duration_arg)]
    pub stabilization: Option<Duration>,
    /// Delay between polls, e.g. 5s
    #[arg(long, value_parser = duration_arg)]
    pub poll_interval: Option<Duration>,
    /// Give up waiting after this long, e.g. 2m
    #[arg(long, value_parser = duration_arg)]
    pub deadline: Option<Duration>,
    /// Exit non-zero when the restart is not confirmed
    #[arg(long)]
    pub strict: bool,
}

/// `run` timings: the poll timings plus switching tracking off.
#[derive(Args, Debug, Default)]
pub struct TimingArgs {
    /// Do not capture a baseline or wait for a restart
    #[arg(long)]
    pub no_wait: bool,
    #[command(flatten)]
    pub poll: PollArgs,
}

fn duration_arg(s: &str) -> Result<Duration, String> {
    parse_duration(s).ok_or_else(|| format!("invalid duration {s:?} (expected e.g. 500ms, 5s, 2m)"))
}

/// Load the config file (or scaffold one from --selector) and apply overrides.
pub fn load_config(fleet: &FleetArgs, poll: Option<&PollArgs>) -> anyhow::Result<RollwatchConfig> {
    let mut config = if fleet.config.exists() {
        RollwatchConfig::from_file(&fleet.config)?
    } else {
        let selector = fleet.selector.as_deref().with_context(|| {
            format!(
                "no config at {} and no --selector given",
                fleet.config.display()
            )
        })?;
        RollwatchConfig::scaffold(selector)
    };

    if let Some(selector) = &fleet.selector {
        config.fleet.selector = selector.clone();
    }
    if let Some(namespace) = &fleet.namespace {
        config.fleet.namespace = Some(namespace.clone());
    }

    if let Some(poll) = poll {
        if let Some(d) = poll.stabilization {
            config.restart.stabilization = d;
        }
        if let Some(d) = poll.poll_interval {
            config.restart.poll_interval = d;
        }
        if let Some(d) = poll.deadline {
            config.restart.deadline = d;
        }
    }

    config.validate()?;
    tracing::debug!(selector = %config.fleet.selector, timings = %config.timing_summary(), "config loaded");
    Ok(config)
}

/// [`load_config`] for `run`, which may also switch tracking off.
pub fn load_run_config(fleet: &FleetArgs, timing: &TimingArgs) -> anyhow::Result<RollwatchConfig> {
    let mut config = load_config(fleet, Some(&timing.poll))?;
    if timing.no_wait {
        config.restart.wait = false;
    }
    Ok(config)
}

pub fn capturer_for(config: &RollwatchConfig) -> SnapshotCapturer {
    let fleet = KubectlFleet::from_config(&config.fleet);
    SnapshotCapturer::new(Arc::new(fleet), config.fleet.selector.clone())
}

pub fn orchestrator_for(config: &RollwatchConfig) -> Orchestrator {
    Orchestrator::new(capturer_for(config), config.restart.clone())
}

/// Print the wait outcome. With `strict`, an unconfirmed restart is an error.
pub fn report(outcome: &WaitOutcome, strict: bool) -> anyhow::Result<()> {
    match outcome {
        WaitOutcome::Skipped => println!("- Restart tracking disabled"),
        WaitOutcome::Restarted { polls } => {
            println!("✓ Fleet restarted and stable (after {polls} polls)")
        }
        WaitOutcome::TimedOut { polls } => {
            println!("! Fleet restart NOT detected after {polls} polls, continuing")
        }
        WaitOutcome::Aborted(e) => println!("! Restart wait aborted: {e}"),
    }

    let unconfirmed = matches!(outcome, WaitOutcome::TimedOut { .. } | WaitOutcome::Aborted(_));
    if strict && unconfirmed {
        anyhow::bail!("fleet restart not confirmed");
    }
    Ok(())
}
