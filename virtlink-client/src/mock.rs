//! Mock backend for testing and development.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{ClientError, Result};
use crate::ids::*;
use crate::retry::RetryPolicy;
use crate::traits::Backend;
use crate::types::*;

/// In-memory implementation of [`Backend`].
///
/// Reproduces the remote backend's error classifications, uniqueness rules
/// and identity semantics without a live service. Useful for:
/// - Unit and integration testing
/// - Development without access to a management service
///
/// All state sits behind one mutex; every operation, read or write, holds
/// it for its whole duration. Stored records are replaced, never edited in
/// place, and callers only ever receive copies.
pub struct MockBackend {
    state: Mutex<MockState>,
    default_cluster_id: ClusterId,
    default_storage_domain_id: StorageDomainId,
}

#[derive(Default)]
struct MockState {
    clusters: HashSet<ClusterId>,
    templates: HashSet<TemplateId>,
    vms: HashMap<VmId, VmData>,
    cdroms: HashMap<VmId, HashMap<CdromId, CdromData>>,
    storage_domains: HashMap<StorageDomainId, StorageDomainData>,
    files: HashMap<StorageDomainId, HashMap<FileId, FileData>>,
}

impl MockState {
    /// Whether `id` names any live resource of any kind.
    fn id_in_use(&self, id: &str) -> bool {
        self.clusters.iter().any(|c| c.as_str() == id)
            || self.templates.iter().any(|t| t.as_str() == id)
            || self.vms.keys().any(|v| v.as_str() == id)
            || self.storage_domains.keys().any(|s| s.as_str() == id)
            || self.cdroms.values().flat_map(|m| m.keys()).any(|c| c.as_str() == id)
            || self.files.values().flat_map(|m| m.keys()).any(|f| f.as_str() == id)
    }

    fn generate_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.id_in_use(&id) {
                return id;
            }
        }
    }

    fn vm(&self, vm_id: &VmId) -> Result<&VmData> {
        self.vms
            .get(vm_id)
            .ok_or_else(|| ClientError::NotFound(format!("VM with ID {} not found", vm_id)))
    }

    fn cdrom(&self, vm_id: &VmId, cdrom_id: &CdromId) -> Result<&CdromData> {
        self.vm(vm_id)?;
        self.cdroms
            .get(vm_id)
            .and_then(|cdroms| cdroms.get(cdrom_id))
            .ok_or_else(|| {
                ClientError::NotFound(format!("CD-ROM with ID {} not found for VM {}", cdrom_id, vm_id))
            })
    }

    fn storage_domain(&self, storage_domain_id: &StorageDomainId) -> Result<&StorageDomainData> {
        self.storage_domains.get(storage_domain_id).ok_or_else(|| {
            ClientError::NotFound(format!("storage domain with ID {} not found", storage_domain_id))
        })
    }

    fn put_cdrom(&mut self, cdrom: CdromData) -> CdromData {
        self.cdroms
            .entry(cdrom.vm_id.clone())
            .or_default()
            .insert(cdrom.id.clone(), cdrom.clone());
        cdrom
    }
}

fn require_iso(iso_image_id: &str) -> Result<()> {
    if iso_image_id.is_empty() {
        return Err(ClientError::BadArgument("ISO image ID cannot be empty".to_string()));
    }
    Ok(())
}

/// Display name the mock gives to attached media.
fn mock_iso_name(iso_image_id: &str) -> String {
    format!("iso-{}.iso", iso_image_id)
}

impl MockBackend {
    /// Create a mock backend seeded with one cluster, the blank template and
    /// one ISO storage domain.
    pub fn new() -> Self {
        info!("Creating mock backend");

        let mut state = MockState::default();
        state.templates.insert(TemplateId::new(BLANK_TEMPLATE_ID));

        let default_cluster_id = ClusterId::new(state.generate_id());
        state.clusters.insert(default_cluster_id.clone());

        let default_storage_domain_id = StorageDomainId::new(state.generate_id());
        state.storage_domains.insert(
            default_storage_domain_id.clone(),
            StorageDomainData {
                id: default_storage_domain_id.clone(),
                name: "iso-domain".to_string(),
                storage_type: "nfs".to_string(),
            },
        );

        Self {
            state: Mutex::new(state),
            default_cluster_id,
            default_storage_domain_id,
        }
    }

    /// Cluster new VMs can be placed in.
    pub fn default_cluster_id(&self) -> ClusterId {
        self.default_cluster_id.clone()
    }

    /// Template new VMs can be created from.
    pub fn blank_template_id(&self) -> TemplateId {
        TemplateId::new(BLANK_TEMPLATE_ID)
    }

    /// The storage domain seeded at construction.
    pub fn default_storage_domain_id(&self) -> StorageDomainId {
        self.default_storage_domain_id.clone()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| ClientError::Bug("Lock poisoned".to_string()))
    }

    /// Register another storage domain.
    pub fn add_storage_domain(
        &self,
        name: impl Into<String>,
        storage_type: impl Into<String>,
    ) -> Result<StorageDomainData> {
        let name = name.into();
        if name.is_empty() {
            return Err(ClientError::BadArgument("storage domain name cannot be empty".to_string()));
        }

        let mut state = self.lock()?;
        if state.storage_domains.values().any(|sd| sd.name == name) {
            return Err(ClientError::Conflict(format!(
                "A storage domain with the name \"{}\" already exists.",
                name
            )));
        }

        let domain = StorageDomainData {
            id: StorageDomainId::new(state.generate_id()),
            name,
            storage_type: storage_type.into(),
        };
        state.storage_domains.insert(domain.id.clone(), domain.clone());

        info!(storage_domain_id = %domain.id, "Mock storage domain added");
        Ok(domain)
    }

    /// Place a file into a storage domain.
    pub fn add_file(
        &self,
        storage_domain_id: &StorageDomainId,
        name: impl Into<String>,
        file_type: impl Into<String>,
    ) -> Result<FileData> {
        let name = name.into();
        if name.is_empty() {
            return Err(ClientError::BadArgument("file name cannot be empty".to_string()));
        }

        let mut state = self.lock()?;
        state.storage_domain(storage_domain_id)?;
        let taken = state
            .files
            .get(storage_domain_id)
            .map_or(false, |files| files.values().any(|f| f.name == name));
        if taken {
            return Err(ClientError::Conflict(format!(
                "A file with the name \"{}\" already exists in storage domain {}.",
                name, storage_domain_id
            )));
        }

        let file = FileData {
            id: FileId::new(state.generate_id()),
            name,
            file_type: file_type.into(),
            storage_domain_id: storage_domain_id.clone(),
            comment: String::new(),
            description: String::new(),
        };
        state
            .files
            .entry(storage_domain_id.clone())
            .or_default()
            .insert(file.id.clone(), file.clone());

        info!(storage_domain_id = %storage_domain_id, file_id = %file.id, "Mock file added");
        Ok(file)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    #[instrument(skip(self, params, _policy), fields(vm_name = %name))]
    async fn create_vm(
        &self,
        cluster_id: &ClusterId,
        template_id: &TemplateId,
        name: &str,
        params: &CreateVmParams,
        _policy: Option<RetryPolicy>,
    ) -> Result<VmData> {
        if name.is_empty() {
            return Err(ClientError::BadArgument("VM name must not be empty".to_string()));
        }

        let mut state = self.lock()?;

        if !state.clusters.contains(cluster_id) {
            return Err(ClientError::NotFound(format!("cluster with ID {} not found", cluster_id)));
        }
        if !state.templates.contains(template_id) {
            return Err(ClientError::NotFound(format!("template with ID {} not found", template_id)));
        }
        if state.vms.values().any(|vm| vm.name == name) {
            return Err(ClientError::Conflict(format!(
                "A VM with the name \"{}\" already exists.",
                name
            )));
        }

        let vm = VmData {
            id: VmId::new(state.generate_id()),
            name: name.to_string(),
            comment: params.comment.clone().unwrap_or_default(),
            description: params.description.clone().unwrap_or_default(),
            cluster_id: cluster_id.clone(),
            template_id: template_id.clone(),
            os: params.os.as_ref().map(VmOs::from_params).unwrap_or_default(),
        };
        state.vms.insert(vm.id.clone(), vm.clone());

        info!(vm_id = %vm.id, "Mock VM created");
        Ok(vm)
    }

    #[instrument(skip(self, _policy), fields(vm_id = %vm_id))]
    async fn get_vm(&self, vm_id: &VmId, _policy: Option<RetryPolicy>) -> Result<VmData> {
        let state = self.lock()?;
        state.vm(vm_id).cloned()
    }

    async fn list_vms(&self, _policy: Option<RetryPolicy>) -> Result<Vec<VmData>> {
        let state = self.lock()?;
        let mut vms: Vec<VmData> = state.vms.values().cloned().collect();
        vms.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(count = vms.len(), "Listed VMs");
        Ok(vms)
    }

    #[instrument(skip(self, params, _policy), fields(vm_id = %vm_id))]
    async fn update_vm(
        &self,
        vm_id: &VmId,
        params: &UpdateVmParams,
        _policy: Option<RetryPolicy>,
    ) -> Result<VmData> {
        params.validate()?;

        let mut state = self.lock()?;
        let current = state.vm(vm_id)?;

        if let Some(name) = &params.name {
            let taken = state
                .vms
                .values()
                .any(|other| other.id != *vm_id && other.name == *name);
            if taken {
                return Err(ClientError::Conflict(format!(
                    "A VM with the name \"{}\" already exists.",
                    name
                )));
            }
        }

        let updated = current.merged(params);
        state.vms.insert(vm_id.clone(), updated.clone());

        info!("Mock VM updated");
        Ok(updated)
    }

    #[instrument(skip(self, _policy), fields(vm_id = %vm_id))]
    async fn remove_vm(&self, vm_id: &VmId, _policy: Option<RetryPolicy>) -> Result<()> {
        let mut state = self.lock()?;
        state.vm(vm_id)?;

        state.vms.remove(vm_id);
        state.cdroms.remove(vm_id);

        info!("Mock VM removed");
        Ok(())
    }

    #[instrument(skip(self, _policy), fields(vm_id = %vm_id, iso_image_id = %iso_image_id))]
    async fn attach_cdrom(
        &self,
        vm_id: &VmId,
        iso_image_id: &str,
        _policy: Option<RetryPolicy>,
    ) -> Result<CdromData> {
        require_iso(iso_image_id)?;

        let mut state = self.lock()?;
        state.vm(vm_id)?;

        let cdrom = CdromData {
            id: CdromId::new(state.generate_id()),
            vm_id: vm_id.clone(),
            file_id: iso_image_id.to_string(),
            file_name: mock_iso_name(iso_image_id),
        };
        let cdrom = state.put_cdrom(cdrom);

        info!(cdrom_id = %cdrom.id, "ISO attached (mock)");
        Ok(cdrom)
    }

    #[instrument(skip(self, _policy), fields(vm_id = %vm_id, cdrom_id = %cdrom_id))]
    async fn get_cdrom(
        &self,
        vm_id: &VmId,
        cdrom_id: &CdromId,
        _policy: Option<RetryPolicy>,
    ) -> Result<CdromData> {
        let state = self.lock()?;
        state.cdrom(vm_id, cdrom_id).cloned()
    }

    #[instrument(skip(self, _policy), fields(vm_id = %vm_id))]
    async fn list_cdroms(&self, vm_id: &VmId, _policy: Option<RetryPolicy>) -> Result<Vec<CdromData>> {
        let state = self.lock()?;
        state.vm(vm_id)?;

        let mut cdroms: Vec<CdromData> = state
            .cdroms
            .get(vm_id)
            .map(|cdroms| cdroms.values().cloned().collect())
            .unwrap_or_default();
        cdroms.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(cdroms)
    }

    #[instrument(skip(self, _policy), fields(vm_id = %vm_id, cdrom_id = %cdrom_id, iso_image_id = %iso_image_id))]
    async fn change_cdrom(
        &self,
        vm_id: &VmId,
        cdrom_id: &CdromId,
        iso_image_id: &str,
        _policy: Option<RetryPolicy>,
    ) -> Result<CdromData> {
        require_iso(iso_image_id)?;

        let mut state = self.lock()?;
        let changed = CdromData {
            file_id: iso_image_id.to_string(),
            file_name: mock_iso_name(iso_image_id),
            ..state.cdrom(vm_id, cdrom_id)?.clone()
        };
        let changed = state.put_cdrom(changed);

        info!("CD-ROM media changed (mock)");
        Ok(changed)
    }

    #[instrument(skip(self, _policy), fields(vm_id = %vm_id, cdrom_id = %cdrom_id))]
    async fn eject_cdrom(
        &self,
        vm_id: &VmId,
        cdrom_id: &CdromId,
        _policy: Option<RetryPolicy>,
    ) -> Result<CdromData> {
        let mut state = self.lock()?;
        let ejected = CdromData {
            file_id: String::new(),
            file_name: String::new(),
            ..state.cdrom(vm_id, cdrom_id)?.clone()
        };
        let ejected = state.put_cdrom(ejected);

        info!("CD-ROM ejected (mock)");
        Ok(ejected)
    }

    #[instrument(skip(self, _policy), fields(storage_domain_id = %storage_domain_id))]
    async fn get_storage_domain(
        &self,
        storage_domain_id: &StorageDomainId,
        _policy: Option<RetryPolicy>,
    ) -> Result<StorageDomainData> {
        let state = self.lock()?;
        state.storage_domain(storage_domain_id).cloned()
    }

    async fn list_storage_domains(&self, _policy: Option<RetryPolicy>) -> Result<Vec<StorageDomainData>> {
        let state = self.lock()?;
        let mut domains: Vec<StorageDomainData> = state.storage_domains.values().cloned().collect();
        domains.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(domains)
    }

    #[instrument(skip(self, _policy), fields(storage_domain_id = %storage_domain_id, file_id = %file_id))]
    async fn get_storage_domain_file(
        &self,
        storage_domain_id: &StorageDomainId,
        file_id: &FileId,
        _policy: Option<RetryPolicy>,
    ) -> Result<FileData> {
        let state = self.lock()?;
        state.storage_domain(storage_domain_id)?;

        state
            .files
            .get(storage_domain_id)
            .and_then(|files| files.get(file_id))
            .cloned()
            .ok_or_else(|| {
                ClientError::NotFound(format!(
                    "file {} not found in storage domain {}",
                    file_id, storage_domain_id
                ))
            })
    }

    #[instrument(skip(self, _policy), fields(storage_domain_id = %storage_domain_id))]
    async fn list_storage_domain_files(
        &self,
        storage_domain_id: &StorageDomainId,
        _refresh: bool,
        _policy: Option<RetryPolicy>,
    ) -> Result<Vec<FileData>> {
        let state = self.lock()?;
        state.storage_domain(storage_domain_id)?;

        let mut files: Vec<FileData> = state
            .files
            .get(storage_domain_id)
            .map(|files| files.values().cloned().collect())
            .unwrap_or_default();
        files.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(count = files.len(), "Listed files");
        Ok(files)
    }
}
