use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "pdf-squeeze")]
#[command(
    author,
    version,
    about = "Shrink PDF documents and raster images toward a target file size"
)]
pub struct Args {
    /// Input PDF or image file path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file path (defaults to <input>_compressed.pdf / .jpg)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Target size in megabytes (defaults to 75% of the input size)
    #[arg(short = 't', long, value_parser = parse_target_mb)]
    pub target_mb: Option<f64>,

    /// Kind of input file
    #[arg(short = 'k', long, value_enum, default_value = "auto")]
    pub kind: InputKind,

    /// Skip the Ghostscript pass even when Ghostscript is installed
    #[arg(long)]
    pub no_external: bool,

    /// Explicit Ghostscript executable (skips PATH discovery)
    #[arg(long = "gs")]
    pub ghostscript: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// What the input file holds
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum InputKind {
    /// Decide from the extension, then from the file header
    #[default]
    Auto,
    /// PDF document
    Pdf,
    /// Raster image (JPEG, PNG, ...); written back as JPEG
    Image,
}

impl InputKind {
    /// Resolve `Auto` using the path extension or the `%PDF` magic bytes
    pub fn resolve(self, path: &Path, header: &[u8]) -> InputKind {
        match self {
            InputKind::Auto => {
                let pdf_extension = path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
                if pdf_extension || header.starts_with(b"%PDF") {
                    InputKind::Pdf
                } else {
                    InputKind::Image
                }
            }
            other => other,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            InputKind::Image => "jpg",
            _ => "pdf",
        }
    }
}

impl Args {
    /// Get the output path, defaulting to `<stem>_compressed.<ext>` beside the input
    pub fn output_path(&self, kind: InputKind) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let stem = self.input.file_stem().unwrap_or_default().to_string_lossy();
            self.input
                .with_file_name(format!("{}_compressed.{}", stem, kind.extension()))
        })
    }
}

/// Parse a positive, finite megabyte value
pub fn parse_target_mb(text: &str) -> Result<f64, String> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: {}", text))?;

    if !value.is_finite() || value <= 0.0 {
        return Err(format!("Target size must be positive: {}", text));
    }

    Ok(value)
}
