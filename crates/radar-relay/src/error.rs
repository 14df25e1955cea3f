//! Error types for the relay binary.
//!
//! [`RelayError`] is the top-level error: every variant is fatal and
//! `main` propagates it with `?` so the process exits non-zero.

use std::path::PathBuf;

/// Failures before any demo data has been read.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// No `-demo` path was given.
    #[error("no demo file given (use -demo <path>)")]
    MissingDemoPath,

    /// The demo file could not be opened.
    #[error("cannot open demo {}: {source}", path.display())]
    OpenDemo {
        /// Path that was tried.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Top-level error for the relay binary.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Argument or demo-file problems.
    #[error("startup error: {source}")]
    Startup {
        /// The underlying startup error.
        #[from]
        source: StartupError,
    },

    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: radar_core::ConfigError,
    },

    /// The metadata client could not be built or calibration failed.
    #[error("calibration error: {source}")]
    Calibration {
        /// The underlying calibration error.
        #[from]
        source: radar_core::CalibrationError,
    },

    /// Demo ingestion failed.
    #[error("ingestion error: {source}")]
    Ingest {
        /// The underlying ingestion error.
        #[from]
        source: radar_core::IngestError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: radar_server::ServerError,
    },
}
