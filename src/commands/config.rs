use std::path::Path;

use anyhow::Result;

pub fn cmd_config(config: Option<&Path>, json: bool) -> Result<()> {
    let loaded = mirrorfleet::config::resolve(config)?;

    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&loaded.config)?);
    } else {
        println!("# {}", loaded.path.display());
        print!("{}", loaded.config.to_toml());
    }
    Ok(())
}
