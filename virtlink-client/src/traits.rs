//! Backend abstraction shared by the remote and mock implementations.

use async_trait::async_trait;

use crate::error::Result;
use crate::ids::*;
use crate::retry::RetryPolicy;
use crate::types::*;

/// Core operation set.
///
/// Both [`RemoteBackend`](crate::RemoteBackend) and
/// [`MockBackend`](crate::MockBackend) implement this trait with identical
/// inputs, results and error classifications, so code exercised against the
/// mock runs unchanged against a live service.
///
/// Every operation takes an optional retry policy override as its last
/// argument. The mock never fails transiently and ignores it.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short backend name for diagnostics (e.g. "remote", "mock").
    fn name(&self) -> &'static str;

    // =========================================================================
    // Virtual machines
    // =========================================================================

    /// Create a VM from a template in a cluster.
    async fn create_vm(
        &self,
        cluster_id: &ClusterId,
        template_id: &TemplateId,
        name: &str,
        params: &CreateVmParams,
        policy: Option<RetryPolicy>,
    ) -> Result<VmData>;

    async fn get_vm(&self, vm_id: &VmId, policy: Option<RetryPolicy>) -> Result<VmData>;

    async fn list_vms(&self, policy: Option<RetryPolicy>) -> Result<Vec<VmData>>;

    /// Apply a field-level update and return the new snapshot.
    async fn update_vm(
        &self,
        vm_id: &VmId,
        params: &UpdateVmParams,
        policy: Option<RetryPolicy>,
    ) -> Result<VmData>;

    async fn remove_vm(&self, vm_id: &VmId, policy: Option<RetryPolicy>) -> Result<()>;

    // =========================================================================
    // CD-ROM attachments
    // =========================================================================

    /// Attach a new CD-ROM loaded with `iso_image_id`.
    async fn attach_cdrom(
        &self,
        vm_id: &VmId,
        iso_image_id: &str,
        policy: Option<RetryPolicy>,
    ) -> Result<CdromData>;

    async fn get_cdrom(
        &self,
        vm_id: &VmId,
        cdrom_id: &CdromId,
        policy: Option<RetryPolicy>,
    ) -> Result<CdromData>;

    async fn list_cdroms(&self, vm_id: &VmId, policy: Option<RetryPolicy>) -> Result<Vec<CdromData>>;

    /// Replace the media in an existing CD-ROM.
    async fn change_cdrom(
        &self,
        vm_id: &VmId,
        cdrom_id: &CdromId,
        iso_image_id: &str,
        policy: Option<RetryPolicy>,
    ) -> Result<CdromData>;

    /// Remove the media from a CD-ROM. Ejecting an empty CD-ROM succeeds.
    async fn eject_cdrom(
        &self,
        vm_id: &VmId,
        cdrom_id: &CdromId,
        policy: Option<RetryPolicy>,
    ) -> Result<CdromData>;

    // =========================================================================
    // Storage domains and files
    // =========================================================================

    async fn get_storage_domain(
        &self,
        storage_domain_id: &StorageDomainId,
        policy: Option<RetryPolicy>,
    ) -> Result<StorageDomainData>;

    async fn list_storage_domains(&self, policy: Option<RetryPolicy>) -> Result<Vec<StorageDomainData>>;

    /// Get one file. An unknown storage domain is reported before an
    /// unknown file.
    async fn get_storage_domain_file(
        &self,
        storage_domain_id: &StorageDomainId,
        file_id: &FileId,
        policy: Option<RetryPolicy>,
    ) -> Result<FileData>;

    /// List files; `refresh` forces the service to rescan the domain.
    async fn list_storage_domain_files(
        &self,
        storage_domain_id: &StorageDomainId,
        refresh: bool,
        policy: Option<RetryPolicy>,
    ) -> Result<Vec<FileData>>;
}
