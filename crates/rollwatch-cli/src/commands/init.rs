use std::path::Path;

use rollwatch_core::RollwatchConfig;

pub fn init(path: &Path, selector: &str, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let config = RollwatchConfig::scaffold(selector);
    config.write_to(path)?;
    println!("✓ Generated {}", path.display());
    println!("  {}", config.timing_summary());
    Ok(())
}
