use anyhow::Result;

use lockstep_core::AppConfig;

pub fn show(config: &AppConfig) -> Result<()> {
    println!("# {}\n", AppConfig::config_path().display());
    print!("{}", config.to_toml()?);
    Ok(())
}

pub fn init(force: bool) -> Result<()> {
    let path = AppConfig::config_path();
    if path.exists() && !force {
        println!("Config already exists at {}", path.display());
        println!("\nTo replace it with the defaults, run:");
        println!("  lockstep config init --force");
        return Ok(());
    }

    AppConfig::default().save_to(&path)?;
    tracing::info!(path = %path.display(), "Wrote default configuration");
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
