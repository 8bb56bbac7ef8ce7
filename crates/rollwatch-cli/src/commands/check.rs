use rollwatch_core::RollwatchConfig;

/// Wait for a restart that something else is performing.
///
/// Restart tracking is forced on, even when the config file disables it:
/// without it there is nothing to check.
pub async fn check(config: &RollwatchConfig, strict: bool) -> anyhow::Result<()> {
    let mut config = config.clone();
    if !config.restart.wait {
        tracing::debug!("ignoring restart.wait = false for check");
        config.restart.wait = true;
    }

    let orchestrator = super::orchestrator_for(&config);
    let done = orchestrator.run(|| async { Ok(()) }).await?;
    super::report(&done.outcome, strict)
}
