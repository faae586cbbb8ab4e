//! Transport boundary consumed by the remote backend.
//!
//! The wire protocol itself lives outside this crate. Implementations of
//! [`Transport`] perform one request per call and report either a payload
//! or a [`TransportError`]. Every payload field is optional: servers are
//! free to omit anything, and the conversion layer decides what is
//! required.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ClientError;

// =============================================================================
// WIRE OBJECTS
// =============================================================================

/// Reference to another resource by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl LinkObject {
    pub fn to(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdromObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Loaded media. An object with no id means "no media".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsObject {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot: Option<BootObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmdline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_kernel_cmdline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initrd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<LinkObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<LinkObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<OsObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDomainObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
}

// =============================================================================
// LIST RESPONSES
// =============================================================================
//
// The collection field may be missing entirely; that means "no items".

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm: Option<Vec<VmObject>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdromList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdrom: Option<Vec<CdromObject>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<Vec<FileObject>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDomainList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_domain: Option<Vec<StorageDomainObject>>,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Failure reported by a transport implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server reported that the resource does not exist (HTTP 404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The server rejected the request as conflicting (HTTP 409).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The server rejected the request body (HTTP 400).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The connection could not be established or was lost.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The request did not complete in time.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Any other server-side failure.
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotFound(msg) => ClientError::NotFound(msg),
            TransportError::Conflict(msg) => ClientError::Conflict(msg),
            TransportError::BadRequest(msg) => ClientError::BadArgument(msg),
            other => ClientError::Unidentified(other.to_string()),
        }
    }
}

/// Result type alias for transport calls.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

// =============================================================================
// TRANSPORT TRAIT
// =============================================================================

/// One request/response round-trip per resource and verb.
///
/// `get_*` returns `None` when the response carried no object. `add_*` and
/// `update_*` return the object as echoed by the server, again `None` if
/// absent.
#[async_trait]
pub trait Transport: Send + Sync {
    // =========================================================================
    // Virtual machines
    // =========================================================================

    async fn get_vm(&self, vm_id: &str) -> TransportResult<Option<VmObject>>;

    async fn list_vms(&self) -> TransportResult<VmList>;

    async fn add_vm(&self, vm: &VmObject) -> TransportResult<Option<VmObject>>;

    async fn update_vm(&self, vm_id: &str, vm: &VmObject) -> TransportResult<Option<VmObject>>;

    async fn remove_vm(&self, vm_id: &str) -> TransportResult<()>;

    // =========================================================================
    // CD-ROM attachments
    // =========================================================================

    async fn get_cdrom(&self, vm_id: &str, cdrom_id: &str) -> TransportResult<Option<CdromObject>>;

    async fn list_cdroms(&self, vm_id: &str) -> TransportResult<CdromList>;

    async fn add_cdrom(&self, vm_id: &str, cdrom: &CdromObject) -> TransportResult<Option<CdromObject>>;

    async fn update_cdrom(
        &self,
        vm_id: &str,
        cdrom_id: &str,
        cdrom: &CdromObject,
    ) -> TransportResult<Option<CdromObject>>;

    // =========================================================================
    // Storage domains and files
    // =========================================================================

    async fn get_storage_domain(&self, storage_domain_id: &str) -> TransportResult<Option<StorageDomainObject>>;

    async fn list_storage_domains(&self) -> TransportResult<StorageDomainList>;

    async fn get_file(&self, storage_domain_id: &str, file_id: &str) -> TransportResult<Option<FileObject>>;

    /// List files; `refresh` asks the server to rescan the domain first.
    async fn list_files(&self, storage_domain_id: &str, refresh: bool) -> TransportResult<FileList>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_transport_error_classification() {
        let cases = [
            (TransportError::NotFound("vm".into()), ErrorCode::NotFound),
            (TransportError::Conflict("name".into()), ErrorCode::Conflict),
            (TransportError::BadRequest("body".into()), ErrorCode::BadArgument),
            (TransportError::Connection("reset".into()), ErrorCode::Unidentified),
            (TransportError::Timeout("30s".into()), ErrorCode::Unidentified),
            (
                TransportError::Server { status: 503, message: "busy".into() },
                ErrorCode::Unidentified,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(ClientError::from(err).code(), code);
        }
    }

    #[test]
    fn test_list_without_collection_field_parses() {
        let list: FileList = serde_json::from_str("{}").unwrap();
        assert!(list.file.is_none());

        let list: CdromList = serde_json::from_str(r#"{"cdrom":[{"id":"c1"}]}"#).unwrap();
        assert_eq!(list.cdrom.unwrap()[0].id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_partial_objects_serialize_sparsely() {
        let cdrom = CdromObject {
            id: None,
            file: Some(FileObject { id: Some("iso-1".into()), ..Default::default() }),
        };
        assert_eq!(serde_json::to_string(&cdrom).unwrap(), r#"{"file":{"id":"iso-1"}}"#);
    }
}
