//! Cmyk command - convert RGB color operators through a color table.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use pdfpress_core::{CmykConverter, ColorMapping};

use super::{load_config, read_input, write_output};

/// Arguments for the cmyk command.
#[derive(Args)]
pub struct CmykArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output PDF file
    #[arg(short, long)]
    output: PathBuf,

    /// JSON file with color mappings, replacing the configured table
    #[arg(short, long)]
    table: Option<PathBuf>,

    /// Extra mapping "R,G,B=C,M,Y,K" on the 0-10000 scale (repeatable)
    #[arg(short, long = "map", value_parser = parse_mapping)]
    mappings: Vec<ColorMapping>,

    /// Do not warn about colors missing from the table
    #[arg(long)]
    no_warn: bool,

    /// Write streams without compressing them
    #[arg(long)]
    no_compress: bool,
}

pub fn run(args: CmykArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut config = load_config(config_path)?;

    if let Some(path) = &args.table {
        let content = fs::read_to_string(path)?;
        config.color.table = serde_json::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Invalid color table {}: {}", path.display(), e)
        })?;
    }
    config.color.table.extend(args.mappings.iter().copied());
    if args.no_warn {
        config.color.warn_unmapped = false;
    }
    if args.no_compress {
        config.output.compress = false;
    }

    let table = config.color.table();
    if table.is_empty() {
        eprintln!(
            "{} Color table is empty, colors are left unchanged.",
            style("ℹ").blue()
        );
    }

    let data = read_input(&args.input)?;
    info!(
        "Converting {} with {} color mappings",
        args.input.display(),
        table.len()
    );

    let output = CmykConverter::new(&table)
        .with_warn_unmapped(config.color.warn_unmapped)
        .with_compression(config.output.compress)
        .convert(&data)?;
    write_output(&args.output, &output)?;

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Parse `R,G,B=C,M,Y,K`.
fn parse_mapping(value: &str) -> Result<ColorMapping, String> {
    let (rgb, cmyk) = value
        .split_once('=')
        .ok_or_else(|| format!("expected R,G,B=C,M,Y,K, got '{}'", value))?;
    Ok(ColorMapping {
        rgb: components(rgb)?,
        cmyk: components(cmyk)?,
    })
}

fn components<const N: usize>(list: &str) -> Result<[u16; N], String> {
    let values = list
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<u16>()
                .map_err(|_| format!("invalid component '{}'", part))
        })
        .collect::<Result<Vec<_>, _>>()?;
    values
        .try_into()
        .map_err(|v: Vec<u16>| format!("expected {} components, got {}", N, v.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping() {
        let mapping = parse_mapping("10000,0, 0=0,10000,10000,0").unwrap();
        assert_eq!(mapping.rgb, [10000, 0, 0]);
        assert_eq!(mapping.cmyk, [0, 10000, 10000, 0]);
    }

    #[test]
    fn test_parse_mapping_errors() {
        assert!(parse_mapping("1,2,3").is_err());
        assert!(parse_mapping("1,2=0,0,0,0").is_err());
        assert!(parse_mapping("1,2,3=0,0,0").is_err());
        assert!(parse_mapping("a,2,3=0,0,0,0").is_err());
    }
}
