//! Remote backend.
//!
//! Runs every operation against a live service through a [`Transport`],
//! wrapping each call in the retry engine and converting responses into
//! value records.
//!
//! [`Transport`]: crate::transport::Transport

mod backend;

pub use backend::RemoteBackend;
