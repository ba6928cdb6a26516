use anyhow::{Context, Result};
use clap::Parser;
use std::fs;

use pdf_squeeze::cli::{Args, InputKind};
use pdf_squeeze::compress::{compress_image, PdfCompressor};
use pdf_squeeze::config::Settings;
use pdf_squeeze::document::{megabytes, DocumentHandle};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    // Read input file
    let content = fs::read(&args.input)
        .with_context(|| format!("Failed to read input file: {}", args.input.display()))?;

    let kind = args.kind.resolve(&args.input, &content);
    log::info!("Treating {} as {:?}", args.input.display(), kind);

    let settings = Settings::from_args(&args);
    let input = DocumentHandle::Bytes(content);
    let output_path = args.output_path(kind);

    let (data, original_size, target_met) = match kind {
        InputKind::Image => {
            let result = compress_image(&input, args.target_mb, &settings)
                .context("Failed to compress image")?;
            let met = result.met_target();
            (result.data, result.original_size, met)
        }
        _ => {
            let result = PdfCompressor::new(settings)
                .compress(&input, args.target_mb)
                .context("Failed to compress PDF")?;
            log::info!(
                "Chose {} after {} refinement attempts",
                result.stage,
                result.attempts_run
            );
            let met = result.met_target();
            (result.data, result.original_size, met)
        }
    };

    // Write output
    fs::write(&output_path, &data)
        .with_context(|| format!("Failed to write output file: {}", output_path.display()))?;

    println!(
        "Wrote {} ({:.2} MB -> {:.2} MB)",
        output_path.display(),
        megabytes(original_size),
        megabytes(data.len() as u64)
    );
    if !target_met {
        eprintln!("Target size not reached; wrote the smallest result found");
    }

    Ok(())
}
