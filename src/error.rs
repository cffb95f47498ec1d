//! Error types for license-collect
//!
//! Library modules return [`Result<T>`]. Missing licenses are not errors and
//! never show up here; see [`crate::fetcher`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for license-collect operations
pub type Result<T> = std::result::Result<T, Error>;

/// All errors that can occur while resolving licenses
#[derive(Error, Debug)]
pub enum Error {
    // Input errors
    #[error("Lockfile could not be loaded at {path}: {reason}")]
    ManifestUnreadable { path: PathBuf, reason: String },

    #[error("License URL could not be built for {identity} ({location})")]
    InvalidLocation { identity: String, location: String },

    #[error("Not a repository reference: {0}")]
    InvalidReference(String),

    // Tooling errors
    #[error("git command is not available. Please install git.")]
    GitNotAvailable,

    #[error("Failed to create temporary directory: {0}")]
    TempDirCreationFailed(#[source] std::io::Error),

    #[error("Failed to clone repository: {0}")]
    CloneFailed(String),

    #[error("Failed to checkout version: {0}")]
    CheckoutFailed(String),

    #[error("Failed to resolve package: {0}")]
    ResolveFailed(String),

    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    #[error("Failed to lock cache entry {path}: {source}")]
    CacheLock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Validation errors
    #[error("Package.swift could not be found in {0}")]
    InvalidPackagePath(PathBuf),

    #[error("Invalid repository URL: {0}. URL must be in format https://github.com/owner/repo")]
    InvalidRepositoryUrl(String),

    #[error("At least one package directory or repository URL must be provided")]
    NoInputProvided,

    #[error("{0} cannot be empty")]
    EmptyArgument(&'static str),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("{reference}: {source}")]
    Reference {
        reference: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0} is not a valid Swift identifier")]
    InvalidName(String),

    // Aggregated group failures
    #[error("{}", format_failures(.0))]
    Resolution(Vec<GroupFailure>),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One input group that failed as a whole, with the error that aborted it.
#[derive(Debug)]
pub struct GroupFailure {
    pub group: &'static str,
    pub error: Error,
}

fn format_failures(failures: &[GroupFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} failed: {}", f.group, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error (the process could not be spawned)
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error (the process exited non-zero)
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Attribute an error to the repository it came from
    pub fn reference(reference: impl Into<String>, source: Error) -> Self {
        Self::Reference {
            reference: reference.into(),
            source: Box::new(source),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::GitNotAvailable => Some("Install git and make sure it is on PATH"),
            Self::InvalidPackagePath(_) => Some("Pass directories that contain a Package.swift"),
            Self::NoInputProvided => Some("Pass a package directory, --repo or --package-repo"),
            Self::InvalidName(_) => {
                Some("Use letters, digits and underscores, not starting with a digit")
            }
            Self::Reference { source, .. } => source.hint(),
            _ => None,
        }
    }
}
