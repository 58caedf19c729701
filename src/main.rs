//! rawpeek - inspect camera raw files from the command line.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rawpeek::{
    config::{Cli, Command, InfoConfig, ThumbnailConfig},
    FileRangeReader, Identification, ParseOptions, RawFile, ThumbnailOutcome,
};

/// Exit code when a file has no thumbnail that can be emitted.
const EXIT_NO_THUMBNAIL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Info(config) => run_info(config).await,
        Command::Thumbnail(config) => run_thumbnail(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose { "rawpeek=debug" } else { "rawpeek=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Validate options and open the file.
async fn open(
    file: &std::path::Path,
    options: &ParseOptions,
) -> Result<RawFile<FileRangeReader>, ExitCode> {
    if let Err(e) = options.validate() {
        error!("Configuration error: {}", e);
        return Err(ExitCode::FAILURE);
    }

    match FileRangeReader::open(file).await {
        Ok(reader) => Ok(RawFile::with_options(reader, options.clone())),
        Err(e) => {
            error!("Cannot open {}: {}", file.display(), e);
            Err(ExitCode::FAILURE)
        }
    }
}

// =============================================================================
// Info Command
// =============================================================================

async fn run_info(config: InfoConfig) -> ExitCode {
    init_logging(config.verbose);

    let raw = match open(&config.file, &config.options).await {
        Ok(raw) => raw,
        Err(code) => return code,
    };

    let id = match raw.identify().await {
        Ok(id) => id,
        Err(e) => {
            error!("Identification failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.json {
        match serde_json::to_string_pretty(&id) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Cannot serialize identification: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_report(&config, &id);
    }

    ExitCode::SUCCESS
}

/// Print the human-readable summary.
fn print_report(config: &InfoConfig, id: &Identification) {
    let meta = &id.metadata;

    println!("Filename:          {}", config.file.display());
    println!("Container:         {}", id.format.name());
    if let Some(ts) = meta.timestamp {
        println!("Timestamp:         {}", ts.format("%Y-%m-%d %H:%M:%S"));
    }
    println!("Camera:            {} {}", meta.make, meta.model);
    if !meta.artist.is_empty() {
        println!("Owner:             {}", meta.artist);
    }
    if meta.iso_speed > 0.0 {
        println!("ISO speed:         {}", meta.iso_speed as i64);
    }
    if meta.shutter > 0.0 {
        if meta.shutter < 1.0 {
            println!("Shutter:           1/{:.1} sec", 1.0 / meta.shutter);
        } else {
            println!("Shutter:           {:.1} sec", meta.shutter);
        }
    }
    if meta.aperture > 0.0 {
        println!("Aperture:          f/{:.1}", meta.aperture);
    }
    if meta.focal_len > 0.0 {
        println!("Focal length:      {:.1} mm", meta.focal_len);
    }
    println!("Orientation:       {}", meta.flip);
    println!("Raw size:          {} x {}", meta.raw_width, meta.raw_height);
    if meta.thumb_offset > 0 {
        println!(
            "Thumbnail:         {} x {}, {} bytes at {} ({})",
            meta.thumb_width,
            meta.thumb_height,
            meta.thumb_length,
            meta.thumb_offset,
            id.thumbnail_kind.name()
        );
    } else {
        println!("Thumbnail:         none");
    }
    println!("Directories:       {}", id.directories.len());
}

// =============================================================================
// Thumbnail Command
// =============================================================================

async fn run_thumbnail(config: ThumbnailConfig) -> ExitCode {
    init_logging(config.verbose);

    let raw = match open(&config.file, &config.options).await {
        Ok(raw) => raw,
        Err(code) => return code,
    };

    let bytes = match raw.thumbnail().await {
        Ok(ThumbnailOutcome::Jpeg(bytes)) => bytes,
        Ok(ThumbnailOutcome::NotFound) => {
            error!("{} has no thumbnail", config.file.display());
            return ExitCode::from(EXIT_NO_THUMBNAIL);
        }
        Ok(ThumbnailOutcome::Unsupported(kind)) => {
            error!(
                "{} has a {} thumbnail, which cannot be extracted",
                config.file.display(),
                kind.name()
            );
            return ExitCode::from(EXIT_NO_THUMBNAIL);
        }
        Err(e) => {
            error!("Thumbnail extraction failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let output = config.output_path();
    if let Err(e) = tokio::fs::write(&output, &bytes).await {
        error!("Cannot write {}: {}", output.display(), e);
        return ExitCode::FAILURE;
    }

    info!("Wrote {} ({} bytes)", output.display(), bytes.len());
    ExitCode::SUCCESS
}
