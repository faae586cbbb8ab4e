//! # virtlink Client
//!
//! Typed client for a remote virtualization management service: virtual
//! machines, CD-ROM (ISO) attachments and storage-domain files.
//!
//! Every operation runs against one of two interchangeable backends:
//! - **Remote** - a live service reached through a [`Transport`], with every
//!   call wrapped in the retry engine
//! - **Mock** - a lock-protected in-memory store reproducing the remote
//!   backend's errors, uniqueness rules and identifiers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   Client (facade) -> Vm, Cdrom, File    │
//! └─────────────────────┬───────────────────┘
//!                       │  Backend trait
//!         ┌─────────────┴─────────────┐
//!         ▼                           ▼
//! ┌───────────────────┐     ┌───────────────────┐
//! │   RemoteBackend   │     │    MockBackend    │
//! │ retry -> transport│     │  Mutex<MockState> │
//! │    -> convert     │     │                   │
//! └───────────────────┘     └───────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use virtlink_client::{Client, CreateVmParams, MockBackend};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = Arc::new(MockBackend::new());
//!     let client = Client::new(mock.clone());
//!
//!     let vm = client
//!         .create_vm(&mock.default_cluster_id(), &mock.blank_template_id(), "my-vm", &CreateVmParams::new(), None)
//!         .await
//!         .unwrap();
//!
//!     let cdrom = vm.attach_iso("fedora-iso", None).await.unwrap();
//!     cdrom.eject(None).await.unwrap();
//! }
//! ```

pub mod client;
pub mod config;
pub mod convert;
pub mod entity;
pub mod error;
pub mod ids;
pub mod mock;
pub mod remote;
pub mod retry;
pub mod traits;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::ClientConfig;
pub use entity::{Cdrom, File, StorageDomain, Vm};
pub use error::{ClientError, ErrorCode, Result};
pub use ids::*;
pub use mock::MockBackend;
pub use remote::RemoteBackend;
pub use retry::{retry, RetryPolicy};
pub use traits::Backend;
pub use transport::{Transport, TransportError, TransportResult};
pub use types::*;
