//! Shared configuration and error types for the sundial workspace.

pub mod config;
pub mod error;
