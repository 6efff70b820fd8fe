//! Result type alias shared across the workspace.
//!
//! Defaults the error type to the common `DeskError`, so functions can simply
//! return `Result<T>`.
use crate::error::DeskError;

/// Workspace-wide `Result` alias with `DeskError` as the default error.
pub type Result<T, E = DeskError> = std::result::Result<T, E>;
