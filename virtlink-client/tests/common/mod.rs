//! In-process stand-in for the management service, used to drive the
//! remote backend through real request/response round-trips.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use virtlink_client::transport::*;
use virtlink_client::{ClientConfig, RetryPolicy};

pub const CLUSTER_ID: &str = "cluster-1";
pub const STORAGE_DOMAIN_ID: &str = "sd-iso";

/// Policies with millisecond backoff so retry tests stay fast.
pub fn fast_config() -> ClientConfig {
    let fast = RetryPolicy::no_retry()
        .with_max_attempts(4)
        .with_backoff(
            std::time::Duration::from_millis(1),
            std::time::Duration::from_millis(5),
        );
    ClientConfig {
        read: fast.clone(),
        write: fast,
    }
}

#[derive(Default)]
struct ServerState {
    vms: HashMap<String, VmObject>,
    cdroms: HashMap<String, Vec<CdromObject>>,
    domains: Vec<StorageDomainObject>,
    files: HashMap<String, Vec<FileObject>>,
    failures: VecDeque<TransportError>,
    calls: usize,
    next_id: u64,
    drop_write_responses: bool,
}

impl ServerState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn vm_exists(&self, vm_id: &str) -> TransportResult<()> {
        if self.vms.contains_key(vm_id) {
            Ok(())
        } else {
            Err(TransportError::NotFound(format!("vm {}", vm_id)))
        }
    }

    fn domain_exists(&self, sd_id: &str) -> TransportResult<()> {
        if self.domains.iter().any(|d| d.id.as_deref() == Some(sd_id)) {
            Ok(())
        } else {
            Err(TransportError::NotFound(format!("storage domain {}", sd_id)))
        }
    }

    fn media_name(&self, file_id: &str) -> String {
        self.files
            .values()
            .flatten()
            .find(|f| f.id.as_deref() == Some(file_id))
            .and_then(|f| f.name.clone())
            .unwrap_or_else(|| format!("{}.iso", file_id))
    }

    fn media(&self, requested: Option<&FileObject>) -> Option<FileObject> {
        let file_id = requested.and_then(|f| f.id.clone())?;
        Some(FileObject {
            name: Some(self.media_name(&file_id)),
            id: Some(file_id),
            ..Default::default()
        })
    }
}

/// Fake service with failure injection and response shaping.
///
/// Clones share one state, so a test can keep a handle after giving the
/// transport to a client.
#[derive(Clone)]
pub struct FakeServer {
    state: Arc<Mutex<ServerState>>,
}

impl FakeServer {
    pub fn new() -> Self {
        let state = ServerState {
            domains: vec![StorageDomainObject {
                id: Some(STORAGE_DOMAIN_ID.to_string()),
                name: Some("iso-domain".to_string()),
                storage_type: None,
            }],
            ..Default::default()
        };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Fail the next calls with these errors, in order.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = TransportError>) {
        self.state.lock().unwrap().failures.extend(errors);
    }

    /// Number of transport calls received so far.
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    /// Make add/update calls succeed but omit the object from the response.
    pub fn drop_write_responses(&self) {
        self.state.lock().unwrap().drop_write_responses = true;
    }

    pub fn add_file(&self, file: FileObject) {
        self.state
            .lock()
            .unwrap()
            .files
            .entry(STORAGE_DOMAIN_ID.to_string())
            .or_default()
            .push(file);
    }

    fn begin(&self) -> TransportResult<std::sync::MutexGuard<'_, ServerState>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        match state.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

fn merge_os(current: Option<OsObject>, update: &OsObject) -> OsObject {
    let mut os = current.unwrap_or_default();
    if update.boot.is_some() {
        os.boot = update.boot.clone();
    }
    if update.cmdline.is_some() {
        os.cmdline = update.cmdline.clone();
    }
    if update.custom_kernel_cmdline.is_some() {
        os.custom_kernel_cmdline = update.custom_kernel_cmdline.clone();
    }
    if update.initrd.is_some() {
        os.initrd = update.initrd.clone();
    }
    if update.kernel.is_some() {
        os.kernel = update.kernel.clone();
    }
    os
}

#[async_trait]
impl Transport for FakeServer {
    async fn get_vm(&self, vm_id: &str) -> TransportResult<Option<VmObject>> {
        let state = self.begin()?;
        state.vm_exists(vm_id)?;
        Ok(state.vms.get(vm_id).cloned())
    }

    async fn list_vms(&self) -> TransportResult<VmList> {
        let state = self.begin()?;
        let mut vms: Vec<VmObject> = state.vms.values().cloned().collect();
        vms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(VmList { vm: (!vms.is_empty()).then_some(vms) })
    }

    async fn add_vm(&self, vm: &VmObject) -> TransportResult<Option<VmObject>> {
        let mut state = self.begin()?;
        let name = vm.name.clone().unwrap_or_default();
        if state.vms.values().any(|v| v.name.as_deref() == Some(name.as_str())) {
            return Err(TransportError::Conflict(format!("name {} in use", name)));
        }
        let mut stored = vm.clone();
        stored.id = Some(state.next_id("vm"));
        state.vms.insert(stored.id.clone().unwrap_or_default(), stored.clone());
        Ok((!state.drop_write_responses).then_some(stored))
    }

    async fn update_vm(&self, vm_id: &str, vm: &VmObject) -> TransportResult<Option<VmObject>> {
        let mut state = self.begin()?;
        state.vm_exists(vm_id)?;
        if let Some(name) = &vm.name {
            let taken = state
                .vms
                .iter()
                .any(|(id, other)| id != vm_id && other.name.as_deref() == Some(name.as_str()));
            if taken {
                return Err(TransportError::Conflict(format!("name {} in use", name)));
            }
        }

        let drop_response = state.drop_write_responses;
        let stored = state
            .vms
            .get_mut(vm_id)
            .ok_or_else(|| TransportError::NotFound(vm_id.to_string()))?;
        if vm.name.is_some() {
            stored.name = vm.name.clone();
        }
        if vm.comment.is_some() {
            stored.comment = vm.comment.clone();
        }
        if vm.description.is_some() {
            stored.description = vm.description.clone();
        }
        if let Some(os) = &vm.os {
            stored.os = Some(merge_os(stored.os.take(), os));
        }
        Ok((!drop_response).then(|| stored.clone()))
    }

    async fn remove_vm(&self, vm_id: &str) -> TransportResult<()> {
        let mut state = self.begin()?;
        state.vm_exists(vm_id)?;
        state.vms.remove(vm_id);
        state.cdroms.remove(vm_id);
        Ok(())
    }

    async fn get_cdrom(&self, vm_id: &str, cdrom_id: &str) -> TransportResult<Option<CdromObject>> {
        let state = self.begin()?;
        state.vm_exists(vm_id)?;
        state
            .cdroms
            .get(vm_id)
            .and_then(|cdroms| cdroms.iter().find(|c| c.id.as_deref() == Some(cdrom_id)))
            .cloned()
            .map(Some)
            .ok_or_else(|| TransportError::NotFound(format!("cdrom {}", cdrom_id)))
    }

    async fn list_cdroms(&self, vm_id: &str) -> TransportResult<CdromList> {
        let state = self.begin()?;
        state.vm_exists(vm_id)?;
        let cdroms = state.cdroms.get(vm_id).cloned().unwrap_or_default();
        Ok(CdromList { cdrom: (!cdroms.is_empty()).then_some(cdroms) })
    }

    async fn add_cdrom(&self, vm_id: &str, cdrom: &CdromObject) -> TransportResult<Option<CdromObject>> {
        let mut state = self.begin()?;
        state.vm_exists(vm_id)?;
        let stored = CdromObject {
            id: Some(state.next_id("cdrom")),
            file: state.media(cdrom.file.as_ref()),
        };
        state.cdroms.entry(vm_id.to_string()).or_default().push(stored.clone());
        Ok((!state.drop_write_responses).then_some(stored))
    }

    async fn update_cdrom(
        &self,
        vm_id: &str,
        cdrom_id: &str,
        cdrom: &CdromObject,
    ) -> TransportResult<Option<CdromObject>> {
        let mut state = self.begin()?;
        state.vm_exists(vm_id)?;
        let media = state.media(cdrom.file.as_ref());
        let drop_response = state.drop_write_responses;
        let stored = state
            .cdroms
            .get_mut(vm_id)
            .and_then(|cdroms| cdroms.iter_mut().find(|c| c.id.as_deref() == Some(cdrom_id)))
            .ok_or_else(|| TransportError::NotFound(format!("cdrom {}", cdrom_id)))?;
        stored.file = media;
        Ok((!drop_response).then(|| stored.clone()))
    }

    async fn get_storage_domain(&self, storage_domain_id: &str) -> TransportResult<Option<StorageDomainObject>> {
        let state = self.begin()?;
        state.domain_exists(storage_domain_id)?;
        Ok(state
            .domains
            .iter()
            .find(|d| d.id.as_deref() == Some(storage_domain_id))
            .cloned())
    }

    async fn list_storage_domains(&self) -> TransportResult<StorageDomainList> {
        let state = self.begin()?;
        Ok(StorageDomainList { storage_domain: Some(state.domains.clone()) })
    }

    async fn get_file(&self, storage_domain_id: &str, file_id: &str) -> TransportResult<Option<FileObject>> {
        let state = self.begin()?;
        state.domain_exists(storage_domain_id)?;
        state
            .files
            .get(storage_domain_id)
            .and_then(|files| files.iter().find(|f| f.id.as_deref() == Some(file_id)))
            .cloned()
            .map(Some)
            .ok_or_else(|| TransportError::NotFound(format!("file {}", file_id)))
    }

    async fn list_files(&self, storage_domain_id: &str, _refresh: bool) -> TransportResult<FileList> {
        let state = self.begin()?;
        state.domain_exists(storage_domain_id)?;
        let files = state.files.get(storage_domain_id).cloned().unwrap_or_default();
        Ok(FileList { file: (!files.is_empty()).then_some(files) })
    }
}
