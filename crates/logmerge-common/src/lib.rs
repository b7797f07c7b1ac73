//! logmerge common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging setup for the logmerge workspace.
//!
//! - **Error Handling**: [`LogMergeError`] and the [`Result`] alias used by
//!   every pipeline component
//! - **Logging**: `tracing` subscriber configuration ([`logging`])
//!
//! # Example
//!
//! ```no_run
//! use logmerge_common::logging::{init_logging, LogConfig};
//! use logmerge_common::{LogMergeError, Result};
//!
//! fn require(value: Option<String>) -> Result<String> {
//!     value.ok_or_else(|| LogMergeError::config("R2_BUCKET is not set"))
//! }
//!
//! let _guard = init_logging(&LogConfig::default()).unwrap();
//! ```

pub mod error;
pub mod logging;

pub use error::{LogMergeError, Result};
