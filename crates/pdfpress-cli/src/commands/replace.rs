//! Replace-images command - swap embedded images for replacement files.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use pdfpress_core::{ImageReplacement, ImageReplacer};

use super::{load_config, read_input, write_output};

/// Arguments for the replace-images command.
#[derive(Args)]
pub struct ReplaceArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output PDF file
    #[arg(short, long)]
    output: PathBuf,

    /// Pair "SOURCE=REPLACEMENT" of image files, added after configured pairs (repeatable)
    #[arg(short, long = "pair", value_parser = parse_pair)]
    pairs: Vec<ImageReplacement>,

    /// Write streams without compressing them
    #[arg(long)]
    no_compress: bool,
}

pub fn run(args: ReplaceArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut config = load_config(config_path)?;
    config.images.replacements.extend(args.pairs);
    if args.no_compress {
        config.output.compress = false;
    }

    let data = read_input(&args.input)?;
    let replacer = ImageReplacer::load(&config.images.replacements)
        .with_compression(config.output.compress);
    info!(
        "Replacing images in {} with {} of {} pairs usable",
        args.input.display(),
        replacer.pair_count(),
        config.images.replacements.len()
    );
    if replacer.pair_count() == 0 {
        eprintln!(
            "{} No usable image pairs, copying input unchanged.",
            style("ℹ").blue()
        );
    }

    let output = replacer.replace(&data)?;
    write_output(&args.output, &output)?;

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Parse `SOURCE=REPLACEMENT`.
fn parse_pair(value: &str) -> Result<ImageReplacement, String> {
    match value.split_once('=') {
        Some((source, replacement)) if !source.is_empty() && !replacement.is_empty() => {
            Ok(ImageReplacement {
                source: PathBuf::from(source),
                replacement: PathBuf::from(replacement),
            })
        }
        _ => Err(format!("expected SOURCE=REPLACEMENT, got '{}'", value)),
    }
}
