use crate::config::generate::generate_starter_config;
use crate::config::{user_config_path, SYSTEM_CONFIG_PATH};
use console::style;
use std::fs;
use std::path::PathBuf;

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    write_config(&generate_starter_config(), stdout)
}

fn write_config(config_content: &str, stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    // Prefer ~/.config/samplegen/eventgen.yml, fall back to the system path
    let config_path = user_config_path()
        .filter(|path| match path.parent() {
            Some(parent) => match fs::create_dir_all(parent) {
                Ok(_) => true,
                Err(_) => {
                    eprintln!("Warning: Could not create directory {}", parent.display());
                    eprintln!("Falling back to {}", SYSTEM_CONFIG_PATH);
                    false
                }
            },
            None => false,
        })
        .unwrap_or_else(|| PathBuf::from(SYSTEM_CONFIG_PATH));

    if config_path.exists() {
        eprintln!(
            "{} Config file already exists at {}",
            style("Error:").red().bold(),
            config_path.display()
        );
        eprintln!("Remove it first or use --stdout to print the config");
        std::process::exit(1);
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, config_content)?;

    println!(
        "{} Config file written to {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    Ok(())
}
