//! Client facade over a [`Backend`].

use std::fmt;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::entity::{Cdrom, File, StorageDomain, Vm};
use crate::error::Result;
use crate::ids::*;
use crate::mock::MockBackend;
use crate::remote::RemoteBackend;
use crate::retry::RetryPolicy;
use crate::traits::Backend;
use crate::transport::Transport;
use crate::types::*;

/// Entry point for callers.
///
/// Cheap to clone. Every entity it returns keeps a clone of the client so
/// follow-up calls (`vm.attach_iso(..)`, `cdrom.eject(..)`) go to the same
/// backend that produced the entity.
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn Backend>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Client {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Client over a live service.
    pub fn remote<T: Transport + 'static>(transport: T, config: ClientConfig) -> Self {
        Self::new(Arc::new(RemoteBackend::with_config(transport, config)))
    }

    /// Client over a fresh in-memory backend.
    ///
    /// Keep your own `Arc<MockBackend>` and use [`Client::new`] instead when
    /// the test needs the mock's fixture helpers.
    pub fn mock() -> Self {
        Self::new(Arc::new(MockBackend::new()))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn vm(&self, data: VmData) -> Vm {
        Vm::new(self.clone(), data)
    }

    fn cdrom(&self, data: CdromData) -> Cdrom {
        Cdrom::new(self.clone(), data)
    }

    fn file(&self, data: FileData) -> File {
        File::new(self.clone(), data)
    }

    fn storage_domain(&self, data: StorageDomainData) -> StorageDomain {
        StorageDomain::new(self.clone(), data)
    }

    // =========================================================================
    // Virtual machines
    // =========================================================================

    pub async fn create_vm(
        &self,
        cluster_id: &ClusterId,
        template_id: &TemplateId,
        name: &str,
        params: &CreateVmParams,
        policy: Option<RetryPolicy>,
    ) -> Result<Vm> {
        let data = self
            .backend
            .create_vm(cluster_id, template_id, name, params, policy)
            .await?;
        Ok(self.vm(data))
    }

    pub async fn get_vm(&self, vm_id: &VmId, policy: Option<RetryPolicy>) -> Result<Vm> {
        let data = self.backend.get_vm(vm_id, policy).await?;
        Ok(self.vm(data))
    }

    pub async fn list_vms(&self, policy: Option<RetryPolicy>) -> Result<Vec<Vm>> {
        let vms = self.backend.list_vms(policy).await?;
        Ok(vms.into_iter().map(|data| self.vm(data)).collect())
    }

    pub async fn update_vm(
        &self,
        vm_id: &VmId,
        params: &UpdateVmParams,
        policy: Option<RetryPolicy>,
    ) -> Result<Vm> {
        let data = self.backend.update_vm(vm_id, params, policy).await?;
        Ok(self.vm(data))
    }

    pub async fn remove_vm(&self, vm_id: &VmId, policy: Option<RetryPolicy>) -> Result<()> {
        self.backend.remove_vm(vm_id, policy).await
    }

    // =========================================================================
    // CD-ROM attachments
    // =========================================================================

    pub async fn attach_cdrom(
        &self,
        vm_id: &VmId,
        iso_image_id: &str,
        policy: Option<RetryPolicy>,
    ) -> Result<Cdrom> {
        let data = self.backend.attach_cdrom(vm_id, iso_image_id, policy).await?;
        Ok(self.cdrom(data))
    }

    pub async fn get_cdrom(
        &self,
        vm_id: &VmId,
        cdrom_id: &CdromId,
        policy: Option<RetryPolicy>,
    ) -> Result<Cdrom> {
        let data = self.backend.get_cdrom(vm_id, cdrom_id, policy).await?;
        Ok(self.cdrom(data))
    }

    pub async fn list_cdroms(&self, vm_id: &VmId, policy: Option<RetryPolicy>) -> Result<Vec<Cdrom>> {
        let cdroms = self.backend.list_cdroms(vm_id, policy).await?;
        Ok(cdroms.into_iter().map(|data| self.cdrom(data)).collect())
    }

    pub async fn change_cdrom(
        &self,
        vm_id: &VmId,
        cdrom_id: &CdromId,
        iso_image_id: &str,
        policy: Option<RetryPolicy>,
    ) -> Result<Cdrom> {
        let data = self
            .backend
            .change_cdrom(vm_id, cdrom_id, iso_image_id, policy)
            .await?;
        Ok(self.cdrom(data))
    }

    pub async fn eject_cdrom(
        &self,
        vm_id: &VmId,
        cdrom_id: &CdromId,
        policy: Option<RetryPolicy>,
    ) -> Result<Cdrom> {
        let data = self.backend.eject_cdrom(vm_id, cdrom_id, policy).await?;
        Ok(self.cdrom(data))
    }

    // =========================================================================
    // Storage domains and files
    // =========================================================================

    pub async fn get_storage_domain(
        &self,
        storage_domain_id: &StorageDomainId,
        policy: Option<RetryPolicy>,
    ) -> Result<StorageDomain> {
        let data = self.backend.get_storage_domain(storage_domain_id, policy).await?;
        Ok(self.storage_domain(data))
    }

    pub async fn list_storage_domains(&self, policy: Option<RetryPolicy>) -> Result<Vec<StorageDomain>> {
        let domains = self.backend.list_storage_domains(policy).await?;
        Ok(domains.into_iter().map(|data| self.storage_domain(data)).collect())
    }

    pub async fn get_storage_domain_file(
        &self,
        storage_domain_id: &StorageDomainId,
        file_id: &FileId,
        policy: Option<RetryPolicy>,
    ) -> Result<File> {
        let data = self
            .backend
            .get_storage_domain_file(storage_domain_id, file_id, policy)
            .await?;
        Ok(self.file(data))
    }

    pub async fn list_storage_domain_files(
        &self,
        storage_domain_id: &StorageDomainId,
        refresh: bool,
        policy: Option<RetryPolicy>,
    ) -> Result<Vec<File>> {
        let files = self
            .backend
            .list_storage_domain_files(storage_domain_id, refresh, policy)
            .await?;
        Ok(files.into_iter().map(|data| self.file(data)).collect())
    }
}
