//! Command-line front end for the blue-noise generator.
//!
//! Everything here is boundary work: argument parsing, logging bootstrap,
//! image encoding and exit codes. The construction kernel itself lives in
//! `bluenoise-core`.
//!
//! Exit codes: 0 on success, 1 for invalid arguments, 2 when the output
//! file cannot be written.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bluenoise_core::{generate, BackendPreference, Preferences};

/// Generate a blue-noise dither array and write it as a grayscale image.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Square edge length; shorthand for --width N --height N.
    #[arg(short = 'b', long = "blue-noise", value_name = "SIZE")]
    size: Option<u32>,

    /// Grid width in cells (min 16).
    #[arg(long)]
    width: Option<u32>,

    /// Grid height in cells (min 16).
    #[arg(long)]
    height: Option<u32>,

    /// Seed for the initial-pattern sampler. The output is fully
    /// determined by (width, height, seed, backend).
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// CPU worker count; 0 selects the default pool size.
    #[arg(short, long, default_value_t = 0)]
    threads: u32,

    /// Compute back-end. `auto` tries the GPU first and falls back.
    #[arg(long, value_enum, default_value_t = Backend::Auto)]
    backend: Backend,

    /// Output image path.
    #[arg(short, long, default_value = "output.png")]
    output: PathBuf,

    /// Output format; inferred from the extension when omitted.
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Overwrite the output file if it already exists.
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Auto,
    Cpu,
    Gpu,
}

impl From<Backend> for BackendPreference {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Auto => BackendPreference::Auto,
            Backend::Cpu => BackendPreference::Cpu,
            Backend::Gpu => BackendPreference::Gpu,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Portable Network Graphics.
    Png,
    /// Portable aNyMap (PGM for grayscale output).
    Pnm,
}

impl Format {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("pgm") | Some("ppm") | Some("pbm") | Some("pnm") => Self::Pnm,
            _ => Self::Png,
        }
    }

    fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Pnm => image::ImageFormat::Pnm,
        }
    }
}

impl Cli {
    /// Resolve the grid dimensions from --blue-noise / --width / --height.
    fn dimensions(&self) -> anyhow::Result<(u32, u32)> {
        match (self.size, self.width, self.height) {
            (Some(s), None, None) => Ok((s, s)),
            (None, Some(w), Some(h)) => Ok((w, h)),
            (None, None, None) => Ok((32, 32)),
            (Some(_), _, _) => bail!("--blue-noise conflicts with --width/--height"),
            _ => bail!("--width and --height must be given together"),
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap's own help/version output is a successful exit.
            if e.use_stderr() {
                let _ = e.print();
                return ExitCode::from(1);
            }
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(RunError::Usage(e)) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
        Err(RunError::Output(e)) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Failure classes with distinct exit codes.
enum RunError {
    /// Bad arguments or an invalid generation request.
    Usage(anyhow::Error),
    /// The array was generated but could not be written.
    Output(anyhow::Error),
}

fn run(cli: &Cli) -> Result<(), RunError> {
    let (width, height) = cli.dimensions().map_err(RunError::Usage)?;

    let prefs = Preferences {
        back_end: cli.backend.into(),
        threads: cli.threads,
        seed: cli.seed,
    };

    let array = generate(width, height, &prefs)
        .context("generation failed")
        .map_err(RunError::Usage)?;

    write_image(cli, array.width(), array.height(), &array.to_grayscale())
        .map_err(RunError::Output)?;

    info!(output = %cli.output.display(), "dither array written");
    Ok(())
}

fn write_image(cli: &Cli, width: u32, height: u32, bytes: &[u8]) -> anyhow::Result<()> {
    if cli.output.exists() && !cli.overwrite {
        bail!(
            "{} already exists (pass --overwrite to replace it)",
            cli.output.display()
        );
    }

    let format = cli.format.unwrap_or_else(|| Format::for_path(&cli.output));
    let img = image::GrayImage::from_raw(width, height, bytes.to_vec())
        .context("grayscale buffer does not match the grid size")?;
    img.save_with_format(&cli.output, format.image_format())
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_shorthand_sets_both_axes() {
        let cli = Cli::parse_from(["bluenoise", "-b", "64"]);
        assert_eq!(cli.dimensions().unwrap(), (64, 64));
    }

    #[test]
    fn explicit_axes_must_come_in_pairs() {
        let cli = Cli::parse_from(["bluenoise", "--width", "32"]);
        assert!(cli.dimensions().is_err());

        let cli = Cli::parse_from(["bluenoise", "--width", "32", "--height", "16"]);
        assert_eq!(cli.dimensions().unwrap(), (32, 16));
    }

    #[test]
    fn shorthand_conflicts_with_explicit_axes() {
        let cli = Cli::parse_from(["bluenoise", "-b", "32", "--width", "16", "--height", "16"]);
        assert!(cli.dimensions().is_err());
    }

    #[test]
    fn format_inferred_from_extension() {
        assert_eq!(Format::for_path(Path::new("out.pgm")), Format::Pnm);
        assert_eq!(Format::for_path(Path::new("out.png")), Format::Png);
        assert_eq!(Format::for_path(Path::new("out")), Format::Png);
    }
}
