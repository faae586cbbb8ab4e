//! Entity snapshots with convenience methods.
//!
//! An entity is a value record plus the [`Client`] that produced it. The
//! convenience methods only re-invoke the client with the entity's own
//! identifiers; they never touch the snapshot itself, and mutating calls
//! return a new snapshot.

use crate::client::Client;
use crate::error::Result;
use crate::ids::*;
use crate::retry::RetryPolicy;
use crate::types::*;

macro_rules! entity_common {
    ($entity:ident, $data:ty) => {
        impl $entity {
            pub(crate) fn new(client: Client, data: $data) -> Self {
                Self { client, data }
            }

            /// The underlying value record.
            pub fn data(&self) -> &$data {
                &self.data
            }

            pub fn into_data(self) -> $data {
                self.data
            }
        }

        impl PartialEq for $entity {
            fn eq(&self, other: &Self) -> bool {
                self.data == other.data
            }
        }
    };
}

// =============================================================================
// VM
// =============================================================================

/// Snapshot of a virtual machine.
#[derive(Debug, Clone)]
pub struct Vm {
    client: Client,
    data: VmData,
}

entity_common!(Vm, VmData);

impl Vm {
    pub fn id(&self) -> &VmId {
        &self.data.id
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn comment(&self) -> &str {
        &self.data.comment
    }

    pub fn description(&self) -> &str {
        &self.data.description
    }

    pub fn cluster_id(&self) -> &ClusterId {
        &self.data.cluster_id
    }

    pub fn template_id(&self) -> &TemplateId {
        &self.data.template_id
    }

    pub fn os(&self) -> &VmOs {
        &self.data.os
    }

    /// Apply a field-level update to this VM.
    pub async fn update(&self, params: &UpdateVmParams, policy: Option<RetryPolicy>) -> Result<Vm> {
        self.client.update_vm(self.id(), params, policy).await
    }

    pub async fn remove(&self, policy: Option<RetryPolicy>) -> Result<()> {
        self.client.remove_vm(self.id(), policy).await
    }

    /// Attach a new CD-ROM loaded with `iso_image_id`.
    pub async fn attach_iso(&self, iso_image_id: &str, policy: Option<RetryPolicy>) -> Result<Cdrom> {
        self.client.attach_cdrom(self.id(), iso_image_id, policy).await
    }

    pub async fn list_cdroms(&self, policy: Option<RetryPolicy>) -> Result<Vec<Cdrom>> {
        self.client.list_cdroms(self.id(), policy).await
    }

    pub async fn get_cdrom(&self, cdrom_id: &CdromId, policy: Option<RetryPolicy>) -> Result<Cdrom> {
        self.client.get_cdrom(self.id(), cdrom_id, policy).await
    }

    pub async fn change_iso(
        &self,
        cdrom_id: &CdromId,
        iso_image_id: &str,
        policy: Option<RetryPolicy>,
    ) -> Result<Cdrom> {
        self.client.change_cdrom(self.id(), cdrom_id, iso_image_id, policy).await
    }

    pub async fn eject_iso(&self, cdrom_id: &CdromId, policy: Option<RetryPolicy>) -> Result<Cdrom> {
        self.client.eject_cdrom(self.id(), cdrom_id, policy).await
    }
}

// =============================================================================
// CD-ROM
// =============================================================================

/// Snapshot of a CD-ROM attachment.
#[derive(Debug, Clone)]
pub struct Cdrom {
    client: Client,
    data: CdromData,
}

entity_common!(Cdrom, CdromData);

impl Cdrom {
    pub fn id(&self) -> &CdromId {
        &self.data.id
    }

    pub fn vm_id(&self) -> &VmId {
        &self.data.vm_id
    }

    /// Id of the loaded file, empty when no media is loaded.
    pub fn file_id(&self) -> &str {
        &self.data.file_id
    }

    /// Name of the loaded file, empty when no media is loaded.
    pub fn file_name(&self) -> &str {
        &self.data.file_name
    }

    pub fn media(&self) -> CdromMedia<'_> {
        self.data.media()
    }

    /// Fetch the VM this CD-ROM belongs to.
    pub async fn vm(&self, policy: Option<RetryPolicy>) -> Result<Vm> {
        self.client.get_vm(self.vm_id(), policy).await
    }

    /// Load a different ISO into this CD-ROM.
    pub async fn change(&self, iso_image_id: &str, policy: Option<RetryPolicy>) -> Result<Cdrom> {
        self.client
            .change_cdrom(self.vm_id(), self.id(), iso_image_id, policy)
            .await
    }

    pub async fn eject(&self, policy: Option<RetryPolicy>) -> Result<Cdrom> {
        self.client.eject_cdrom(self.vm_id(), self.id(), policy).await
    }
}

// =============================================================================
// STORAGE
// =============================================================================

/// Snapshot of a storage domain.
#[derive(Debug, Clone)]
pub struct StorageDomain {
    client: Client,
    data: StorageDomainData,
}

entity_common!(StorageDomain, StorageDomainData);

impl StorageDomain {
    pub fn id(&self) -> &StorageDomainId {
        &self.data.id
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn storage_type(&self) -> &str {
        &self.data.storage_type
    }

    pub async fn list_files(&self, refresh: bool, policy: Option<RetryPolicy>) -> Result<Vec<File>> {
        self.client
            .list_storage_domain_files(self.id(), refresh, policy)
            .await
    }

    pub async fn get_file(&self, file_id: &FileId, policy: Option<RetryPolicy>) -> Result<File> {
        self.client.get_storage_domain_file(self.id(), file_id, policy).await
    }
}

/// Snapshot of a file in a storage domain.
#[derive(Debug, Clone)]
pub struct File {
    client: Client,
    data: FileData,
}

entity_common!(File, FileData);

impl File {
    pub fn id(&self) -> &FileId {
        &self.data.id
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn file_type(&self) -> &str {
        &self.data.file_type
    }

    pub fn storage_domain_id(&self) -> &StorageDomainId {
        &self.data.storage_domain_id
    }

    pub fn comment(&self) -> &str {
        &self.data.comment
    }

    pub fn description(&self) -> &str {
        &self.data.description
    }

    /// Fetch the storage domain holding this file.
    pub async fn storage_domain(&self, policy: Option<RetryPolicy>) -> Result<StorageDomain> {
        self.client.get_storage_domain(self.storage_domain_id(), policy).await
    }
}
