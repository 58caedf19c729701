//! Configuration for rawpeek.
//!
//! This module provides:
//! - [`ParseOptions`], the library-level knobs of an identification pass
//! - The `rawpeek` command line, parsed with clap, with environment fallbacks
//!
//! # Example
//!
//! ```ignore
//! use rawpeek::config::Cli;
//!
//! let cli = Cli::parse();
//! match cli.into_command() {
//!     Command::Info(args) => println!("{}", args.file.display()),
//!     Command::Thumbnail(args) => println!("{}", args.output_path().display()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `RAWPEEK_SHOT_SELECT` - Shot to describe in multi-shot files (default: 0)
//! - `RAWPEEK_WINDOW_SIZE` - Read-ahead window in bytes (default: 65536)
//! - `RAWPEEK_MAX_THUMBNAIL_BYTES` - Largest thumbnail to extract (default: 64MB)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::io::DEFAULT_WINDOW_SIZE;

// =============================================================================
// Default Values
// =============================================================================

/// Default thumbnail allocation ceiling (64MB).
pub const DEFAULT_MAX_THUMBNAIL_BYTES: u64 = 64 * 1024 * 1024;

/// Smallest accepted read-ahead window.
pub const MIN_WINDOW_SIZE: usize = 512;

/// Largest accepted read-ahead window (16MB).
pub const MAX_WINDOW_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// ParseOptions
// =============================================================================

/// Options for one identification pass.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Which shot of a multi-shot file to describe (0 = first).
    #[arg(long, default_value_t = 0, env = "RAWPEEK_SHOT_SELECT", global = true)]
    pub shot_select: u32,

    /// Read-ahead window of the byte cursor, in bytes.
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE, env = "RAWPEEK_WINDOW_SIZE", global = true)]
    pub window_size: usize,

    /// Largest thumbnail, in bytes, that will be read into memory.
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_THUMBNAIL_BYTES,
        env = "RAWPEEK_MAX_THUMBNAIL_BYTES",
        global = true
    )]
    pub max_thumbnail_bytes: u64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            shot_select: 0,
            window_size: DEFAULT_WINDOW_SIZE,
            max_thumbnail_bytes: DEFAULT_MAX_THUMBNAIL_BYTES,
        }
    }
}

impl ParseOptions {
    /// Validate the options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size < MIN_WINDOW_SIZE || self.window_size > MAX_WINDOW_SIZE {
            return Err("window_size must be between 512B and 16MB".to_string());
        }

        if self.max_thumbnail_bytes == 0 {
            return Err("max_thumbnail_bytes must be greater than 0".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// rawpeek - Identify camera raw files and extract their embedded previews.
///
/// Reads only the container structure: make, model, exposure, orientation
/// and the location of the best embedded JPEG. Sensor data is never decoded.
#[derive(Parser, Debug, Clone)]
#[command(name = "rawpeek")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub options: ParseOptions,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false, global = true)]
    pub verbose: bool,
}

/// Subcommands of the `rawpeek` binary.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Identify a file and print its metadata.
    Info(InfoConfig),

    /// Extract the embedded JPEG thumbnail.
    Thumbnail(ThumbnailConfig),
}

/// Arguments of `rawpeek info`.
#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// Raw file to inspect.
    pub file: PathBuf,

    /// Print the full identification as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[arg(skip)]
    pub options: ParseOptions,

    #[arg(skip)]
    pub verbose: bool,
}

/// Arguments of `rawpeek thumbnail`.
#[derive(Args, Debug, Clone)]
pub struct ThumbnailConfig {
    /// Raw file to read.
    pub file: PathBuf,

    /// Where to write the JPEG (default: `<FILE>.thumb.jpg`).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(skip)]
    pub options: ParseOptions,

    #[arg(skip)]
    pub verbose: bool,
}

impl ThumbnailConfig {
    /// Resolved output path.
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => {
                let mut name = self.file.clone().into_os_string();
                name.push(".thumb.jpg");
                PathBuf::from(name)
            }
        }
    }
}

impl Cli {
    /// Fold the global flags into the selected subcommand.
    pub fn into_command(self) -> Command {
        match self.command {
            Command::Info(mut config) => {
                config.options = self.options;
                config.verbose = self.verbose;
                Command::Info(config)
            }
            Command::Thumbnail(mut config) => {
                config.options = self.options;
                config.verbose = self.verbose;
                Command::Thumbnail(config)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
