use anyhow::Context;
use tokio::process::Command;
use tracing::info;

use rollwatch_core::RollwatchConfig;

pub async fn run(config: &RollwatchConfig, command: &[String], strict: bool) -> anyhow::Result<()> {
    let (program, args) = command.split_first().context("no command given")?;
    let orchestrator = super::orchestrator_for(config);

    let done = orchestrator.run(|| run_command(program, args)).await?;
    println!("✓ {program} completed");
    super::report(&done.outcome, strict)
}

/// Run the mutation command with inherited stdio. Non-zero exit is an error.
async fn run_command(program: &str, args: &[String]) -> anyhow::Result<()> {
    info!(%program, ?args, "running mutation");
    let status = Command::new(program)
        .args(args)
        .status()
        .await
        .with_context(|| format!("failed to start {program}"))?;
    anyhow::ensure!(status.success(), "{program} exited with {status}");
    Ok(())
}
