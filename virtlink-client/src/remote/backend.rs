//! Transport-backed implementation of [`Backend`].

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::config::ClientConfig;
use crate::convert::*;
use crate::error::{ClientError, ErrorCode, Result};
use crate::ids::*;
use crate::retry::{retry, RetryPolicy};
use crate::traits::Backend;
use crate::transport::*;
use crate::types::*;

/// Backend talking to a live virtualization management service.
///
/// Each public operation picks the read or write policy from its
/// [`ClientConfig`] (unless the caller overrides it) and retries a single
/// `*_once` attempt under that policy.
pub struct RemoteBackend<T> {
    transport: T,
    config: ClientConfig,
}

impl<T: Transport> RemoteBackend<T> {
    /// Create a remote backend with default retry policies.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: T, config: ClientConfig) -> Self {
        info!(
            read_attempts = config.read.max_attempts,
            write_attempts = config.write.max_attempts,
            "Creating remote backend"
        );
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn read_policy(&self, policy: Option<RetryPolicy>) -> RetryPolicy {
        policy.unwrap_or_else(move || self.config.read.clone())
    }

    fn write_policy(&self, policy: Option<RetryPolicy>) -> RetryPolicy {
        policy.unwrap_or_else(move || self.config.write.clone())
    }

    // =========================================================================
    // Single attempts
    // =========================================================================

    async fn add_vm_once(&self, body: &VmObject) -> Result<VmData> {
        let object = self
            .transport
            .add_vm(body)
            .await?
            .ok_or_else(|| ClientError::field_missing("VM create response", "vm"))?;
        convert_vm(&object).map_err(|e| e.wrap(ErrorCode::Bug, "failed to convert VM"))
    }

    async fn get_vm_once(&self, vm_id: &VmId) -> Result<VmData> {
        let object = self
            .transport
            .get_vm(vm_id.as_str())
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("no VM returned when getting VM {}", vm_id)))?;
        convert_vm(&object)
            .map_err(|e| e.wrap(ErrorCode::Bug, format_args!("failed to convert VM {}", vm_id)))
    }

    async fn list_vms_once(&self) -> Result<Vec<VmData>> {
        let Some(objects) = self.transport.list_vms().await?.vm else {
            return Ok(Vec::new());
        };
        objects
            .iter()
            .enumerate()
            .map(|(i, object)| {
                convert_vm(object).map_err(|e| {
                    e.wrap(ErrorCode::Bug, format_args!("failed to convert VM during listing item #{}", i))
                })
            })
            .collect()
    }

    async fn update_vm_once(&self, vm_id: &VmId, body: &VmObject) -> Result<VmData> {
        let object = self
            .transport
            .update_vm(vm_id.as_str(), body)
            .await?
            .ok_or_else(|| ClientError::field_missing("VM update response", "vm"))?;
        convert_vm(&object)
            .map_err(|e| e.wrap(ErrorCode::Bug, format_args!("failed to convert VM {}", vm_id)))
    }

    async fn remove_vm_once(&self, vm_id: &VmId) -> Result<()> {
        self.transport.remove_vm(vm_id.as_str()).await?;
        Ok(())
    }

    async fn write_cdrom_once(
        &self,
        vm_id: &VmId,
        cdrom_id: Option<&CdromId>,
        body: &CdromObject,
    ) -> Result<CdromData> {
        let response = match cdrom_id {
            Some(cdrom_id) => {
                self.transport
                    .update_cdrom(vm_id.as_str(), cdrom_id.as_str(), body)
                    .await?
            }
            None => self.transport.add_cdrom(vm_id.as_str(), body).await?,
        };
        let object = response.ok_or_else(|| ClientError::field_missing("CD-ROM response", "cdrom"))?;
        convert_cdrom(&object, vm_id)
            .map_err(|e| e.wrap(ErrorCode::Bug, format_args!("failed to convert CD-ROM on VM {}", vm_id)))
    }

    async fn get_cdrom_once(&self, vm_id: &VmId, cdrom_id: &CdromId) -> Result<CdromData> {
        let object = self
            .transport
            .get_cdrom(vm_id.as_str(), cdrom_id.as_str())
            .await?
            .ok_or_else(|| {
                ClientError::NotFound(format!(
                    "no CD-ROM returned when getting CD-ROM {} on VM {}",
                    cdrom_id, vm_id
                ))
            })?;
        convert_cdrom(&object, vm_id).map_err(|e| {
            e.wrap(
                ErrorCode::Bug,
                format_args!("failed to convert CD-ROM {} on VM {}", cdrom_id, vm_id),
            )
        })
    }

    async fn list_cdroms_once(&self, vm_id: &VmId) -> Result<Vec<CdromData>> {
        let Some(objects) = self.transport.list_cdroms(vm_id.as_str()).await?.cdrom else {
            return Ok(Vec::new());
        };
        objects
            .iter()
            .enumerate()
            .map(|(i, object)| {
                convert_cdrom(object, vm_id).map_err(|e| {
                    e.wrap(ErrorCode::Bug, format_args!("failed to convert CD-ROM during listing item #{}", i))
                })
            })
            .collect()
    }

    async fn get_storage_domain_once(&self, storage_domain_id: &StorageDomainId) -> Result<StorageDomainData> {
        let object = self
            .transport
            .get_storage_domain(storage_domain_id.as_str())
            .await?
            .ok_or_else(|| {
                ClientError::NotFound(format!(
                    "no storage domain returned when getting storage domain {}",
                    storage_domain_id
                ))
            })?;
        convert_storage_domain(&object).map_err(|e| {
            e.wrap(
                ErrorCode::Bug,
                format_args!("failed to convert storage domain {}", storage_domain_id),
            )
        })
    }

    async fn list_storage_domains_once(&self) -> Result<Vec<StorageDomainData>> {
        let Some(objects) = self.transport.list_storage_domains().await?.storage_domain else {
            return Ok(Vec::new());
        };
        objects
            .iter()
            .enumerate()
            .map(|(i, object)| {
                convert_storage_domain(object).map_err(|e| {
                    e.wrap(
                        ErrorCode::Bug,
                        format_args!("failed to convert storage domain during listing item #{}", i),
                    )
                })
            })
            .collect()
    }

    async fn get_file_once(&self, storage_domain_id: &StorageDomainId, file_id: &FileId) -> Result<FileData> {
        let object = self
            .transport
            .get_file(storage_domain_id.as_str(), file_id.as_str())
            .await?
            .ok_or_else(|| {
                ClientError::NotFound(format!(
                    "no file returned when getting file ID {} from storage domain {}",
                    file_id, storage_domain_id
                ))
            })?;
        convert_file(&object, storage_domain_id).map_err(|e| {
            e.wrap(
                ErrorCode::Bug,
                format_args!("failed to convert file {} from storage domain {}", file_id, storage_domain_id),
            )
        })
    }

    async fn list_files_once(&self, storage_domain_id: &StorageDomainId, refresh: bool) -> Result<Vec<FileData>> {
        let Some(objects) = self
            .transport
            .list_files(storage_domain_id.as_str(), refresh)
            .await?
            .file
        else {
            return Ok(Vec::new());
        };
        objects
            .iter()
            .enumerate()
            .map(|(i, object)| {
                convert_file(object, storage_domain_id).map_err(|e| {
                    e.wrap(
                        ErrorCode::Bug,
                        format_args!(
                            "failed to convert file during listing item #{} in storage domain {}",
                            i, storage_domain_id
                        ),
                    )
                })
            })
            .collect()
    }
}

#[async_trait]
impl<T: Transport> Backend for RemoteBackend<T> {
    fn name(&self) -> &'static str {
        "remote"
    }

    #[instrument(skip(self, params, policy), fields(vm_name = %name, cluster_id = %cluster_id))]
    async fn create_vm(
        &self,
        cluster_id: &ClusterId,
        template_id: &TemplateId,
        name: &str,
        params: &CreateVmParams,
        policy: Option<RetryPolicy>,
    ) -> Result<VmData> {
        if name.is_empty() {
            return Err(ClientError::BadArgument("VM name must not be empty".to_string()));
        }
        let body = &vm_object_for_create(cluster_id, template_id, name, params);
        let policy = self.write_policy(policy);

        let vm = retry(&format!("creating VM {}", name), &policy, move || self.add_vm_once(body)).await?;
        info!(vm_id = %vm.id, "VM created");
        Ok(vm)
    }

    #[instrument(skip(self, policy), fields(vm_id = %vm_id))]
    async fn get_vm(&self, vm_id: &VmId, policy: Option<RetryPolicy>) -> Result<VmData> {
        let policy = self.read_policy(policy);
        retry(&format!("getting VM {}", vm_id), &policy, move || self.get_vm_once(vm_id)).await
    }

    #[instrument(skip(self, policy))]
    async fn list_vms(&self, policy: Option<RetryPolicy>) -> Result<Vec<VmData>> {
        let policy = self.read_policy(policy);
        let vms = retry("listing VMs", &policy, move || self.list_vms_once()).await?;
        debug!(count = vms.len(), "Listed VMs");
        Ok(vms)
    }

    #[instrument(skip(self, params, policy), fields(vm_id = %vm_id))]
    async fn update_vm(
        &self,
        vm_id: &VmId,
        params: &UpdateVmParams,
        policy: Option<RetryPolicy>,
    ) -> Result<VmData> {
        params.validate()?;
        let body = &vm_object_for_update(vm_id, params);
        let policy = self.write_policy(policy);

        let vm = retry(&format!("updating VM {}", vm_id), &policy, move || {
            self.update_vm_once(vm_id, body)
        })
        .await?;
        info!("VM updated");
        Ok(vm)
    }

    #[instrument(skip(self, policy), fields(vm_id = %vm_id))]
    async fn remove_vm(&self, vm_id: &VmId, policy: Option<RetryPolicy>) -> Result<()> {
        let policy = self.write_policy(policy);
        retry(&format!("removing VM {}", vm_id), &policy, move || self.remove_vm_once(vm_id)).await?;
        info!("VM removed");
        Ok(())
    }

    #[instrument(skip(self, policy), fields(vm_id = %vm_id, iso_image_id = %iso_image_id))]
    async fn attach_cdrom(
        &self,
        vm_id: &VmId,
        iso_image_id: &str,
        policy: Option<RetryPolicy>,
    ) -> Result<CdromData> {
        if iso_image_id.is_empty() {
            return Err(ClientError::BadArgument("ISO image ID cannot be empty".to_string()));
        }
        let body = &cdrom_object_with_media(iso_image_id);
        let policy = self.write_policy(policy);

        let cdrom = retry(
            &format!("attaching ISO {} to VM {}", iso_image_id, vm_id),
            &policy,
            move || self.write_cdrom_once(vm_id, None, body),
        )
        .await?;
        info!(cdrom_id = %cdrom.id, "ISO attached");
        Ok(cdrom)
    }

    #[instrument(skip(self, policy), fields(vm_id = %vm_id, cdrom_id = %cdrom_id))]
    async fn get_cdrom(
        &self,
        vm_id: &VmId,
        cdrom_id: &CdromId,
        policy: Option<RetryPolicy>,
    ) -> Result<CdromData> {
        let policy = self.read_policy(policy);
        retry(
            &format!("getting CD-ROM {} for VM {}", cdrom_id, vm_id),
            &policy,
            move || self.get_cdrom_once(vm_id, cdrom_id),
        )
        .await
    }

    #[instrument(skip(self, policy), fields(vm_id = %vm_id))]
    async fn list_cdroms(&self, vm_id: &VmId, policy: Option<RetryPolicy>) -> Result<Vec<CdromData>> {
        let policy = self.read_policy(policy);
        retry(&format!("listing CD-ROMs for VM {}", vm_id), &policy, move || {
            self.list_cdroms_once(vm_id)
        })
        .await
    }

    #[instrument(skip(self, policy), fields(vm_id = %vm_id, cdrom_id = %cdrom_id, iso_image_id = %iso_image_id))]
    async fn change_cdrom(
        &self,
        vm_id: &VmId,
        cdrom_id: &CdromId,
        iso_image_id: &str,
        policy: Option<RetryPolicy>,
    ) -> Result<CdromData> {
        if iso_image_id.is_empty() {
            return Err(ClientError::BadArgument("ISO image ID cannot be empty".to_string()));
        }
        let body = &cdrom_object_with_media(iso_image_id);
        let policy = self.write_policy(policy);

        let cdrom = retry(
            &format!("changing CD-ROM {} to ISO {} for VM {}", cdrom_id, iso_image_id, vm_id),
            &policy,
            move || self.write_cdrom_once(vm_id, Some(cdrom_id), body),
        )
        .await?;
        info!("CD-ROM media changed");
        Ok(cdrom)
    }

    #[instrument(skip(self, policy), fields(vm_id = %vm_id, cdrom_id = %cdrom_id))]
    async fn eject_cdrom(
        &self,
        vm_id: &VmId,
        cdrom_id: &CdromId,
        policy: Option<RetryPolicy>,
    ) -> Result<CdromData> {
        let body = &cdrom_object_ejected();
        let policy = self.write_policy(policy);

        let cdrom = retry(
            &format!("ejecting CD-ROM {} from VM {}", cdrom_id, vm_id),
            &policy,
            move || self.write_cdrom_once(vm_id, Some(cdrom_id), body),
        )
        .await?;
        info!("CD-ROM ejected");
        Ok(cdrom)
    }

    #[instrument(skip(self, policy), fields(storage_domain_id = %storage_domain_id))]
    async fn get_storage_domain(
        &self,
        storage_domain_id: &StorageDomainId,
        policy: Option<RetryPolicy>,
    ) -> Result<StorageDomainData> {
        let policy = self.read_policy(policy);
        retry(
            &format!("getting storage domain {}", storage_domain_id),
            &policy,
            move || self.get_storage_domain_once(storage_domain_id),
        )
        .await
    }

    #[instrument(skip(self, policy))]
    async fn list_storage_domains(&self, policy: Option<RetryPolicy>) -> Result<Vec<StorageDomainData>> {
        let policy = self.read_policy(policy);
        retry("listing storage domains", &policy, move || self.list_storage_domains_once()).await
    }

    #[instrument(skip(self, policy), fields(storage_domain_id = %storage_domain_id, file_id = %file_id))]
    async fn get_storage_domain_file(
        &self,
        storage_domain_id: &StorageDomainId,
        file_id: &FileId,
        policy: Option<RetryPolicy>,
    ) -> Result<FileData> {
        let policy = self.read_policy(policy);
        retry(
            &format!("getting file {} from storage domain {}", file_id, storage_domain_id),
            &policy,
            move || self.get_file_once(storage_domain_id, file_id),
        )
        .await
    }

    #[instrument(skip(self, policy), fields(storage_domain_id = %storage_domain_id))]
    async fn list_storage_domain_files(
        &self,
        storage_domain_id: &StorageDomainId,
        refresh: bool,
        policy: Option<RetryPolicy>,
    ) -> Result<Vec<FileData>> {
        let policy = self.read_policy(policy);
        let files = retry(
            &format!("listing files in storage domain {}", storage_domain_id),
            &policy,
            move || self.list_files_once(storage_domain_id, refresh),
        )
        .await?;
        debug!(count = files.len(), "Listed files");
        Ok(files)
    }
}
