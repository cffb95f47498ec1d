//! `license-collect` gathers the license texts of a package's dependencies.
//!
//! # Flow
//! 1. Parse repository references ([`reference`]) and read lockfiles ([`manifest`]).
//! 2. Clone and resolve repositories whose dependencies are wanted ([`resolver`], [`git`]).
//! 3. Download license files in fallback order ([`fetcher`]).
//! 4. Merge every source into one sorted, deduplicated set ([`orchestrator`]).
//! 5. Write the set as Swift source or JSON ([`output`]).

pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod git;
pub mod manifest;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod package_manager;
pub mod process;
pub mod reference;
pub mod resolver;
pub mod validate;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use models::License;
pub use orchestrator::{Inputs, Resolution, ResolutionOrchestrator};
