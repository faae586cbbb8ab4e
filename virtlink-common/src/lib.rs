//! # virtlink Common
//!
//! Shared utilities for programs and test suites built on `virtlink-client`.
//!
//! ## Logging
//!
//! ```rust,ignore
//! use virtlink_common::init_logging;
//!
//! init_logging("info").unwrap();
//! tracing::info!("client ready");
//! ```

pub mod logging;

pub use logging::{init_logging, init_logging_json, init_test_logging};
