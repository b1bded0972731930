//! Configuration module for FileFerry
//!
//! Provides the per-invocation options snapshot, CLI argument parsing,
//! and job-file deserialization.

mod options;

pub use options::*;
