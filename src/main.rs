use appimage_thumbnailer::config::Config;
use appimage_thumbnailer::error::ThumbnailError;
use appimage_thumbnailer::{generate, ThumbnailRequest};
use clap::Parser;
use std::path::{self, PathBuf};
use std::process::ExitCode;

/// Render the icon of an AppImage as a square PNG thumbnail
#[derive(Parser, Debug)]
#[command(name = "appimage-thumbnailer", version)]
struct Cli {
    /// AppImage to read the icon from
    input: PathBuf,
    /// Where to write the PNG thumbnail
    output: PathBuf,
    /// Edge length of the thumbnail in pixels
    size: u32,
    /// Log every resolution and rendering step
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                // --help and --version
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(cli: Cli) -> Result<(), ThumbnailError> {
    let config = Config::load();

    let input = cli.input.canonicalize().map_err(|e| {
        ThumbnailError::Argument(format!("cannot access {}: {}", cli.input.display(), e))
    })?;
    let output = path::absolute(&cli.output).map_err(|e| {
        ThumbnailError::Argument(format!("invalid output path {}: {}", cli.output.display(), e))
    })?;

    let request = ThumbnailRequest {
        input,
        output,
        size: cli.size,
    };
    let report = generate(&request, &config)?;
    log::debug!(
        "{} {}x{} icon reached after {} hop(s)",
        report.kind.mime_type(),
        report.source_dimensions.0,
        report.source_dimensions.1,
        report.hops
    );
    Ok(())
}
