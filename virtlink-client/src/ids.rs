//! Opaque identifiers, one type per resource kind.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

resource_id!(
    /// Identifier of a virtual machine.
    VmId
);
resource_id!(
    /// Identifier of a CD-ROM attachment on a VM.
    CdromId
);
resource_id!(
    /// Identifier of a file (ISO image or floppy) in a storage domain.
    FileId
);
resource_id!(
    /// Identifier of a storage domain.
    StorageDomainId
);
resource_id!(
    /// Identifier of a cluster.
    ClusterId
);
resource_id!(
    /// Identifier of a VM template.
    TemplateId
);

/// The template every installation ships with.
pub const BLANK_TEMPLATE_ID: &str = "00000000-0000-0000-0000-000000000000";
