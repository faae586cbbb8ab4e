//! Conversion between transport objects and value records.
//!
//! Identity and name fields are mandatory: their absence is reported as
//! [`ClientError::FieldMissing`]. Every other field falls back to its zero
//! value. The request builders at the bottom go the other way, emitting
//! only the fields a caller actually set.

use crate::error::{ClientError, Result};
use crate::ids::*;
use crate::transport::*;
use crate::types::*;

fn required(value: Option<&String>, resource: &str, field: &str) -> Result<String> {
    value
        .cloned()
        .ok_or_else(|| ClientError::field_missing(resource, field))
}

fn optional(value: Option<&String>) -> String {
    value.cloned().unwrap_or_default()
}

// =============================================================================
// TRANSPORT -> RECORD
// =============================================================================

/// Convert a CD-ROM object belonging to `vm_id`.
///
/// A file reference without an id counts as no media. A reference with an
/// id must also carry a name, so the id/name pair is never half populated.
pub fn convert_cdrom(object: &CdromObject, vm_id: &VmId) -> Result<CdromData> {
    let id = required(object.id.as_ref(), "cdrom", "id")?;

    let (file_id, file_name) = match object.file.as_ref() {
        Some(file) => match file.id.as_ref().filter(|id| !id.is_empty()) {
            Some(file_id) => {
                let name = file.name.as_ref().filter(|name| !name.is_empty());
                (file_id.clone(), required(name, "cdrom file", "name")?)
            }
            None => (String::new(), String::new()),
        },
        None => (String::new(), String::new()),
    };

    Ok(CdromData {
        id: CdromId::new(id),
        vm_id: vm_id.clone(),
        file_id,
        file_name,
    })
}

/// Convert a file object found in `storage_domain_id`.
pub fn convert_file(object: &FileObject, storage_domain_id: &StorageDomainId) -> Result<FileData> {
    let id = required(object.id.as_ref(), "file", "id")?;
    let name = required(object.name.as_ref(), "file", "name")?;

    Ok(FileData {
        id: FileId::new(id),
        name,
        file_type: optional(object.file_type.as_ref()),
        storage_domain_id: storage_domain_id.clone(),
        comment: optional(object.comment.as_ref()),
        description: optional(object.description.as_ref()),
    })
}

pub fn convert_storage_domain(object: &StorageDomainObject) -> Result<StorageDomainData> {
    let id = required(object.id.as_ref(), "storage domain", "id")?;
    let name = required(object.name.as_ref(), "storage domain", "name")?;

    Ok(StorageDomainData {
        id: StorageDomainId::new(id),
        name,
        storage_type: optional(object.storage_type.as_ref()),
    })
}

/// Convert the OS section of a VM. An absent section yields the defaults.
pub fn convert_os(object: Option<&OsObject>) -> Result<VmOs> {
    let Some(os) = object else {
        return Ok(VmOs::default());
    };

    let boot_devices = os
        .boot
        .as_ref()
        .and_then(|boot| boot.devices.as_ref())
        .map(|devices| {
            devices
                .iter()
                .map(|device| {
                    device.parse::<BootDevice>().map_err(|_| {
                        ClientError::Bug(format!("server reported unsupported boot device '{}'", device))
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    Ok(VmOs {
        os_type: os.os_type.clone().unwrap_or_else(|| VmOs::default().os_type),
        boot_devices,
        cmdline: os.cmdline.clone(),
        custom_kernel_cmdline: os.custom_kernel_cmdline.clone(),
        initrd: os.initrd.clone(),
        kernel: os.kernel.clone(),
    })
}

pub fn convert_vm(object: &VmObject) -> Result<VmData> {
    let id = required(object.id.as_ref(), "vm", "id")?;
    let name = required(object.name.as_ref(), "vm", "name")?;
    let cluster_id = required(
        object.cluster.as_ref().and_then(|c| c.id.as_ref()),
        "vm",
        "cluster.id",
    )?;
    let template_id = optional(object.template.as_ref().and_then(|t| t.id.as_ref()));

    Ok(VmData {
        id: VmId::new(id),
        name,
        comment: optional(object.comment.as_ref()),
        description: optional(object.description.as_ref()),
        cluster_id: ClusterId::new(cluster_id),
        template_id: TemplateId::new(template_id),
        os: convert_os(object.os.as_ref())?,
    })
}

// =============================================================================
// REQUEST -> TRANSPORT
// =============================================================================

fn os_object_for_create(params: &VmOsParams) -> OsObject {
    OsObject {
        os_type: params.os_type.clone(),
        boot: boot_object(&params.boot_devices),
        cmdline: params.cmdline.clone(),
        custom_kernel_cmdline: params.custom_kernel_cmdline.clone(),
        initrd: params.initrd.clone(),
        kernel: params.kernel.clone(),
    }
}

fn boot_object(devices: &[BootDevice]) -> Option<BootObject> {
    if devices.is_empty() {
        return None;
    }
    Some(BootObject {
        devices: Some(devices.iter().map(|d| d.as_str().to_string()).collect()),
    })
}

/// Build the body of a VM creation request.
pub fn vm_object_for_create(
    cluster_id: &ClusterId,
    template_id: &TemplateId,
    name: &str,
    params: &CreateVmParams,
) -> VmObject {
    VmObject {
        id: None,
        name: Some(name.to_string()),
        comment: params.comment.clone(),
        description: params.description.clone(),
        cluster: Some(LinkObject::to(cluster_id.as_str())),
        template: Some(LinkObject::to(template_id.as_str())),
        os: params.os.as_ref().map(os_object_for_create),
    }
}

/// Build the body of a VM update request, carrying only the set fields.
pub fn vm_object_for_update(vm_id: &VmId, params: &UpdateVmParams) -> VmObject {
    let os = params.touches_os().then(|| OsObject {
        os_type: None,
        boot: boot_object(&params.boot_devices),
        cmdline: params.cmdline.clone(),
        custom_kernel_cmdline: params.custom_kernel_cmdline.clone(),
        initrd: params.initrd.clone(),
        kernel: params.kernel.clone(),
    });

    VmObject {
        id: Some(vm_id.to_string()),
        name: params.name.clone(),
        comment: params.comment.clone(),
        description: params.description.clone(),
        cluster: None,
        template: None,
        os,
    }
}

/// CD-ROM body that loads the given file.
pub fn cdrom_object_with_media(file_id: &str) -> CdromObject {
    CdromObject {
        id: None,
        file: Some(FileObject {
            id: Some(file_id.to_string()),
            ..Default::default()
        }),
    }
}

/// CD-ROM body with an empty file reference, which ejects the media.
pub fn cdrom_object_ejected() -> CdromObject {
    CdromObject {
        id: None,
        file: Some(FileObject::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn vm_id() -> VmId {
        VmId::new("vm-1")
    }

    #[test]
    fn test_cdrom_requires_id() {
        let err = convert_cdrom(&CdromObject::default(), &vm_id()).unwrap_err();
        assert_eq!(err, ClientError::field_missing("cdrom", "id"));
    }

    #[test]
    fn test_cdrom_without_file_is_empty() {
        let object = CdromObject { id: Some("cd-1".into()), file: None };
        let cdrom = convert_cdrom(&object, &vm_id()).unwrap();
        assert!(cdrom.is_empty());
        assert_eq!(cdrom.vm_id, vm_id());
    }

    #[test]
    fn test_cdrom_file_name_without_id_is_empty() {
        let object = CdromObject {
            id: Some("cd-1".into()),
            file: Some(FileObject { name: Some("stale.iso".into()), ..Default::default() }),
        };
        let cdrom = convert_cdrom(&object, &vm_id()).unwrap();
        assert_eq!(cdrom.file_id, "");
        assert_eq!(cdrom.file_name, "");
    }

    #[test]
    fn test_cdrom_file_id_without_name_is_field_missing() {
        let object = CdromObject {
            id: Some("cd-1".into()),
            file: Some(FileObject { id: Some("iso-1".into()), ..Default::default() }),
        };
        let err = convert_cdrom(&object, &vm_id()).unwrap_err();
        assert_eq!(err, ClientError::field_missing("cdrom file", "name"));

        let empty_name = CdromObject {
            id: Some("cd-1".into()),
            file: Some(FileObject {
                id: Some("iso-1".into()),
                name: Some(String::new()),
                ..Default::default()
            }),
        };
        assert_eq!(convert_cdrom(&empty_name, &vm_id()).unwrap_err().code(), ErrorCode::FieldMissing);
    }

    #[test]
    fn test_cdrom_with_media() {
        let object = CdromObject {
            id: Some("cd-1".into()),
            file: Some(FileObject {
                id: Some("iso-1".into()),
                name: Some("fedora.iso".into()),
                ..Default::default()
            }),
        };
        let cdrom = convert_cdrom(&object, &vm_id()).unwrap();
        assert_eq!(cdrom.file_id, "iso-1");
        assert_eq!(cdrom.file_name, "fedora.iso");
    }

    #[test]
    fn test_file_requires_id_and_name() {
        let sd = StorageDomainId::new("sd-1");
        let no_name = FileObject { id: Some("f1".into()), ..Default::default() };
        assert_eq!(
            convert_file(&no_name, &sd).unwrap_err(),
            ClientError::field_missing("file", "name")
        );

        let no_id = FileObject { name: Some("a.iso".into()), ..Default::default() };
        assert_eq!(convert_file(&no_id, &sd).unwrap_err().code(), ErrorCode::FieldMissing);
    }

    #[test]
    fn test_file_optional_fields_default_to_empty() {
        let sd = StorageDomainId::new("sd-1");
        let object = FileObject {
            id: Some("f1".into()),
            name: Some("a.iso".into()),
            ..Default::default()
        };
        let file = convert_file(&object, &sd).unwrap();
        assert_eq!(file.file_type, "");
        assert_eq!(file.comment, "");
        assert_eq!(file.description, "");
        assert_eq!(file.storage_domain_id, sd);
    }

    #[test]
    fn test_vm_conversion_keeps_boot_order() {
        let object = VmObject {
            id: Some("vm-1".into()),
            name: Some("web".into()),
            cluster: Some(LinkObject::to("cl-1")),
            os: Some(OsObject {
                boot: Some(BootObject {
                    devices: Some(vec!["network".into(), "cdrom".into(), "hd".into()]),
                }),
                cmdline: Some("console=ttyS0".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let vm = convert_vm(&object).unwrap();
        assert_eq!(
            vm.os.boot_devices,
            vec![BootDevice::Network, BootDevice::Cdrom, BootDevice::Hd]
        );
        assert_eq!(vm.os.cmdline.as_deref(), Some("console=ttyS0"));
        assert_eq!(vm.os.kernel, None);
        assert_eq!(vm.template_id.as_str(), "");
    }

    #[test]
    fn test_vm_unknown_boot_device_is_bug() {
        let os = OsObject {
            boot: Some(BootObject { devices: Some(vec!["floppy".into()]) }),
            ..Default::default()
        };
        assert_eq!(convert_os(Some(&os)).unwrap_err().code(), ErrorCode::Bug);
    }

    #[test]
    fn test_vm_requires_cluster() {
        let object = VmObject {
            id: Some("vm-1".into()),
            name: Some("web".into()),
            ..Default::default()
        };
        assert_eq!(
            convert_vm(&object).unwrap_err(),
            ClientError::field_missing("vm", "cluster.id")
        );
    }

    #[test]
    fn test_update_body_carries_only_set_fields() {
        let body = vm_object_for_update(&vm_id(), &UpdateVmParams::new().with_comment("hi"));
        assert_eq!(body.comment.as_deref(), Some("hi"));
        assert!(body.name.is_none());
        assert!(body.os.is_none());

        let body = vm_object_for_update(&vm_id(), &UpdateVmParams::new().with_kernel("/boot/vmlinuz"));
        let os = body.os.unwrap();
        assert_eq!(os.kernel.as_deref(), Some("/boot/vmlinuz"));
        assert!(os.boot.is_none());
    }

    #[test]
    fn test_eject_body_has_empty_file() {
        let body = cdrom_object_ejected();
        assert_eq!(body.file, Some(FileObject::default()));
        assert_eq!(
            cdrom_object_with_media("iso-9").file.unwrap().id.as_deref(),
            Some("iso-9")
        );
    }
}
