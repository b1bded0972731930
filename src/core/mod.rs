//! Transfer pipeline
//!
//! Provides the batch transfer engine and the pieces it is assembled from:
//! destination naming, advisory lock coordination, the atomic/streamed
//! transfer strategies, and the retry wrapper for transient backend
//! failures.

mod engine;
mod lock;
mod naming;
mod retry;
mod strategy;

pub use engine::*;
pub use lock::*;
pub use naming::*;
pub use retry::*;
pub use strategy::*;
