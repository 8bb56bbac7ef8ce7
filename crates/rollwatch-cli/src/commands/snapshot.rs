use rollwatch_core::RollwatchConfig;

pub async fn snapshot(config: &RollwatchConfig) -> anyhow::Result<()> {
    let capturer = super::capturer_for(config);
    let snapshot = capturer.capture().await?;
    tracing::info!(
        selector = %config.fleet.selector,
        pods = snapshot.len(),
        running = snapshot.running_count(),
        "snapshot captured"
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
