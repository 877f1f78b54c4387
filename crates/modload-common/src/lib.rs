//! Modload Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging setup, and error handling for the modload workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`CommonError`] and the crate [`Result`] alias
//! - **Logging**: [`logging::LogConfig`] and [`logging::init_logging`]
//! - **Types**: validated document-database paths ([`types::CollectionPath`],
//!   [`types::DocumentPath`])
//!
//! # Example
//!
//! ```
//! use modload_common::types::CollectionPath;
//!
//! let quizzes = CollectionPath::root("modules")
//!     .unwrap()
//!     .doc("m1")
//!     .unwrap()
//!     .collection("quizzes")
//!     .unwrap();
//! assert_eq!(quizzes.as_str(), "modules/m1/quizzes");
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
