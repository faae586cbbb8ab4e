//! Value records and parameter sets.
//!
//! Records are plain snapshots. Backends hand out fresh copies; nothing a
//! caller holds is ever mutated behind its back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;
use crate::ids::*;

// =============================================================================
// BOOT DEVICES
// =============================================================================

/// A device the VM may boot from. Order in a sequence is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootDevice {
    /// Hard disk
    Hd,
    /// PXE network boot
    Network,
    /// Optical drive
    Cdrom,
}

impl BootDevice {
    /// All supported boot devices.
    pub fn values() -> [BootDevice; 3] {
        [BootDevice::Hd, BootDevice::Network, BootDevice::Cdrom]
    }

    /// Wire name of the device.
    pub fn as_str(&self) -> &'static str {
        match self {
            BootDevice::Hd => "hd",
            BootDevice::Network => "network",
            BootDevice::Cdrom => "cdrom",
        }
    }
}

impl fmt::Display for BootDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BootDevice {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hd" => Ok(BootDevice::Hd),
            "network" => Ok(BootDevice::Network),
            "cdrom" => Ok(BootDevice::Cdrom),
            other => Err(ClientError::BadArgument(format!(
                "invalid boot device '{}', expected one of: hd, network, cdrom",
                other
            ))),
        }
    }
}

// =============================================================================
// VIRTUAL MACHINES
// =============================================================================

/// Operating system and boot configuration of a VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmOs {
    /// Guest OS type (e.g. "rhel_8x64")
    pub os_type: String,
    /// Boot sequence, first entry is the primary boot source
    pub boot_devices: Vec<BootDevice>,
    /// Kernel command line
    pub cmdline: Option<String>,
    /// Extra kernel command line fragment appended by the host
    pub custom_kernel_cmdline: Option<String>,
    /// Path to the initrd image
    pub initrd: Option<String>,
    /// Path to the kernel image
    pub kernel: Option<String>,
}

impl Default for VmOs {
    fn default() -> Self {
        Self {
            os_type: "other".to_string(),
            boot_devices: Vec::new(),
            cmdline: None,
            custom_kernel_cmdline: None,
            initrd: None,
            kernel: None,
        }
    }
}

impl VmOs {
    /// Build the initial OS configuration for a new VM.
    pub fn from_params(params: &VmOsParams) -> Self {
        let defaults = VmOs::default();
        Self {
            os_type: params.os_type.clone().unwrap_or(defaults.os_type),
            boot_devices: params.boot_devices.clone(),
            cmdline: params.cmdline.clone(),
            custom_kernel_cmdline: params.custom_kernel_cmdline.clone(),
            initrd: params.initrd.clone(),
            kernel: params.kernel.clone(),
        }
    }

    /// Apply the OS fields of an update, leaving absent ones untouched.
    ///
    /// An empty boot device list keeps the current sequence; there is no
    /// way to clear it through an update.
    pub fn merged(&self, params: &UpdateVmParams) -> Self {
        let mut os = self.clone();
        if !params.boot_devices.is_empty() {
            os.boot_devices = params.boot_devices.clone();
        }
        if let Some(cmdline) = &params.cmdline {
            os.cmdline = Some(cmdline.clone());
        }
        if let Some(custom) = &params.custom_kernel_cmdline {
            os.custom_kernel_cmdline = Some(custom.clone());
        }
        if let Some(initrd) = &params.initrd {
            os.initrd = Some(initrd.clone());
        }
        if let Some(kernel) = &params.kernel {
            os.kernel = Some(kernel.clone());
        }
        os
    }
}

/// Snapshot of a virtual machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmData {
    pub id: VmId,
    pub name: String,
    pub comment: String,
    pub description: String,
    pub cluster_id: ClusterId,
    pub template_id: TemplateId,
    pub os: VmOs,
}

impl VmData {
    /// Apply an update, leaving every absent field untouched.
    ///
    /// Name validation and uniqueness are the caller's job.
    pub fn merged(&self, params: &UpdateVmParams) -> Self {
        let mut vm = self.clone();
        if let Some(name) = &params.name {
            vm.name = name.clone();
        }
        if let Some(comment) = &params.comment {
            vm.comment = comment.clone();
        }
        if let Some(description) = &params.description {
            vm.description = description.clone();
        }
        vm.os = self.os.merged(params);
        vm
    }
}

// =============================================================================
// CD-ROM ATTACHMENTS
// =============================================================================

/// Media state of a CD-ROM attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdromMedia<'a> {
    /// No media loaded
    Empty,
    /// An ISO is loaded
    Loaded { file_id: &'a str, file_name: &'a str },
}

/// Snapshot of a CD-ROM attachment.
///
/// `file_id` and `file_name` are both empty when no media is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdromData {
    pub id: CdromId,
    pub vm_id: VmId,
    pub file_id: String,
    pub file_name: String,
}

impl CdromData {
    pub fn media(&self) -> CdromMedia<'_> {
        if self.file_id.is_empty() {
            CdromMedia::Empty
        } else {
            CdromMedia::Loaded {
                file_id: &self.file_id,
                file_name: &self.file_name,
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.media(), CdromMedia::Empty)
    }
}

// =============================================================================
// STORAGE
// =============================================================================

/// Snapshot of a storage domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDomainData {
    pub id: StorageDomainId,
    pub name: String,
    /// Storage type (e.g. "nfs", "iscsi"); empty when not reported
    pub storage_type: String,
}

/// Snapshot of a file (ISO image or floppy) in a storage domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileData {
    pub id: FileId,
    pub name: String,
    /// File type (e.g. "iso"); empty when not reported
    pub file_type: String,
    pub storage_domain_id: StorageDomainId,
    pub comment: String,
    pub description: String,
}

// =============================================================================
// PARAMETERS
// =============================================================================

/// OS settings for VM creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmOsParams {
    pub os_type: Option<String>,
    pub boot_devices: Vec<BootDevice>,
    pub cmdline: Option<String>,
    pub custom_kernel_cmdline: Option<String>,
    pub initrd: Option<String>,
    pub kernel: Option<String>,
}

impl VmOsParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, os_type: impl Into<String>) -> Self {
        self.os_type = Some(os_type.into());
        self
    }

    /// Set the boot sequence; order is kept as given.
    pub fn with_boot_devices(mut self, devices: impl Into<Vec<BootDevice>>) -> Self {
        self.boot_devices = devices.into();
        self
    }

    pub fn with_cmdline(mut self, cmdline: impl Into<String>) -> Self {
        self.cmdline = Some(cmdline.into());
        self
    }

    pub fn with_custom_kernel_cmdline(mut self, cmdline: impl Into<String>) -> Self {
        self.custom_kernel_cmdline = Some(cmdline.into());
        self
    }

    pub fn with_initrd(mut self, initrd: impl Into<String>) -> Self {
        self.initrd = Some(initrd.into());
        self
    }

    pub fn with_kernel(mut self, kernel: impl Into<String>) -> Self {
        self.kernel = Some(kernel.into());
        self
    }
}

/// Optional settings for VM creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateVmParams {
    pub comment: Option<String>,
    pub description: Option<String>,
    pub os: Option<VmOsParams>,
}

impl CreateVmParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_os(mut self, os: VmOsParams) -> Self {
        self.os = Some(os);
        self
    }
}

/// Field-level VM update. `None` (or an empty boot list) leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateVmParams {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub boot_devices: Vec<BootDevice>,
    pub cmdline: Option<String>,
    pub custom_kernel_cmdline: Option<String>,
    pub initrd: Option<String>,
    pub kernel: Option<String>,
}

impl UpdateVmParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_boot_devices(mut self, devices: impl Into<Vec<BootDevice>>) -> Self {
        self.boot_devices = devices.into();
        self
    }

    pub fn with_cmdline(mut self, cmdline: impl Into<String>) -> Self {
        self.cmdline = Some(cmdline.into());
        self
    }

    pub fn with_custom_kernel_cmdline(mut self, cmdline: impl Into<String>) -> Self {
        self.custom_kernel_cmdline = Some(cmdline.into());
        self
    }

    pub fn with_initrd(mut self, initrd: impl Into<String>) -> Self {
        self.initrd = Some(initrd.into());
        self
    }

    pub fn with_kernel(mut self, kernel: impl Into<String>) -> Self {
        self.kernel = Some(kernel.into());
        self
    }

    /// Reject values that may never be stored.
    pub fn validate(&self) -> crate::error::Result<()> {
        if matches!(self.name.as_deref(), Some("")) {
            return Err(ClientError::BadArgument(
                "name must not be empty for VM update".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether any OS or kernel field is being changed.
    pub fn touches_os(&self) -> bool {
        !self.boot_devices.is_empty()
            || self.cmdline.is_some()
            || self.custom_kernel_cmdline.is_some()
            || self.initrd.is_some()
            || self.kernel.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn sample_os() -> VmOs {
        VmOs {
            os_type: "rhel_8x64".to_string(),
            boot_devices: vec![BootDevice::Network, BootDevice::Cdrom],
            cmdline: Some("console=ttyS0".to_string()),
            custom_kernel_cmdline: Some("quiet splash".to_string()),
            initrd: Some("/boot/initrd.img".to_string()),
            kernel: Some("/boot/vmlinuz".to_string()),
        }
    }

    #[test]
    fn test_boot_device_parsing() {
        for device in BootDevice::values() {
            assert_eq!(device.as_str().parse::<BootDevice>().unwrap(), device);
        }
        let err = "invalid".parse::<BootDevice>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadArgument);
    }

    #[test]
    fn test_boot_device_serde_names() {
        let json = serde_json::to_string(&vec![BootDevice::Hd, BootDevice::Cdrom]).unwrap();
        assert_eq!(json, r#"["hd","cdrom"]"#);
    }

    #[test]
    fn test_cmdline_only_update_keeps_other_fields() {
        let os = sample_os();
        let merged = os.merged(&UpdateVmParams::new().with_cmdline("console=tty1"));

        assert_eq!(merged.cmdline.as_deref(), Some("console=tty1"));
        assert_eq!(merged.kernel, os.kernel);
        assert_eq!(merged.initrd, os.initrd);
        assert_eq!(merged.custom_kernel_cmdline, os.custom_kernel_cmdline);
        assert_eq!(merged.boot_devices, os.boot_devices);
    }

    #[test]
    fn test_empty_boot_devices_keep_sequence() {
        let os = sample_os();
        let merged = os.merged(&UpdateVmParams::new().with_boot_devices(Vec::new()));
        assert_eq!(merged.boot_devices, vec![BootDevice::Network, BootDevice::Cdrom]);

        let merged = os.merged(&UpdateVmParams::new().with_boot_devices(vec![BootDevice::Hd]));
        assert_eq!(merged.boot_devices, vec![BootDevice::Hd]);
    }

    #[test]
    fn test_update_validation() {
        assert!(UpdateVmParams::new().validate().is_ok());
        assert!(UpdateVmParams::new().with_name("web-01").validate().is_ok());
        let err = UpdateVmParams::new().with_name("").validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadArgument);
    }

    #[test]
    fn test_touches_os() {
        assert!(!UpdateVmParams::new().with_name("x").touches_os());
        assert!(UpdateVmParams::new().with_initrd("/boot/initrd").touches_os());
        assert!(UpdateVmParams::new().with_boot_devices(vec![BootDevice::Hd]).touches_os());
    }

    #[test]
    fn test_cdrom_media_state() {
        let mut cdrom = CdromData {
            id: CdromId::new("cd-1"),
            vm_id: VmId::new("vm-1"),
            file_id: "iso-1".to_string(),
            file_name: "iso-iso-1.iso".to_string(),
        };
        assert_eq!(
            cdrom.media(),
            CdromMedia::Loaded { file_id: "iso-1", file_name: "iso-iso-1.iso" }
        );

        cdrom.file_id.clear();
        cdrom.file_name.clear();
        assert!(cdrom.is_empty());
    }
}
