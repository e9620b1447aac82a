//! Subcommands and the helpers they share.

pub mod cmyk;
pub mod config;
pub mod replace;

use std::fs;
use std::path::{Path, PathBuf};

use console::style;
use tracing::debug;

use pdfpress_core::PressConfig;

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pdfpress")
        .join("config.json")
}

/// Load the explicit config file, else the default one if it exists, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<PressConfig> {
    if let Some(path) = config_path {
        return Ok(PressConfig::from_file(Path::new(path))?);
    }
    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config {}", default_path.display());
        Ok(PressConfig::from_file(&default_path)?)
    } else {
        Ok(PressConfig::default())
    }
}

pub fn read_input(input: &Path) -> anyhow::Result<Vec<u8>> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    Ok(fs::read(input)?)
}

pub fn write_output(output: &Path, data: &[u8]) -> anyhow::Result<()> {
    fs::write(output, data)?;
    println!(
        "{} Output written to {}",
        style("✓").green(),
        output.display()
    );
    Ok(())
}
