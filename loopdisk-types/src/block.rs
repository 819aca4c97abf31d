// SPDX-License-Identifier: GPL-3.0-only

//! Block device records decoded from `lsblk --json`.

use serde::{Deserialize, Serialize};

use crate::de;

/// One row of `lsblk --paths --json` output: a disk or one of its partitions.
///
/// Only the `path` column is always requested; every other field is present
/// only when the caller selected its column, so all of them are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockDevice {
    /// Device path (e.g., "/dev/loop0" or "/dev/loop0p1")
    pub path: String,

    /// Filesystem UUID
    #[serde(default)]
    pub uuid: Option<String>,

    /// Device type ("disk", "part", "loop", ...)
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    /// Filesystem type ("ext4", "vfat", ...)
    #[serde(default)]
    pub fstype: Option<String>,

    /// Device size in bytes
    #[serde(default, deserialize_with = "de::opt_u64")]
    pub size: Option<u64>,

    /// Filesystem size in bytes
    #[serde(default, deserialize_with = "de::opt_u64")]
    pub fssize: Option<u64>,

    /// Current mountpoint, when mounted
    #[serde(default)]
    pub mountpoint: Option<String>,

    /// Vendor/manufacturer name
    #[serde(default)]
    pub vendor: Option<String>,

    /// Device model name
    #[serde(default)]
    pub model: Option<String>,

    /// Serial number
    #[serde(default)]
    pub serial: Option<String>,

    /// Firmware revision
    #[serde(default)]
    pub rev: Option<String>,
}

impl BlockDevice {
    /// Whether the device currently reports a non-empty mountpoint.
    pub fn is_mounted(&self) -> bool {
        self.mountpoint
            .as_deref()
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::BlockDevice;

    #[test]
    fn decodes_minimal_row() {
        let device: BlockDevice = serde_json::from_str(r#"{"path": "/dev/loop0"}"#).unwrap();
        assert_eq!(device.path, "/dev/loop0");
        assert_eq!(device.uuid, None);
        assert!(!device.is_mounted());
    }

    #[test]
    fn decodes_size_as_number_or_string() {
        let numeric: BlockDevice =
            serde_json::from_str(r#"{"path": "/dev/loop0p1", "size": 1048576}"#).unwrap();
        assert_eq!(numeric.size, Some(1_048_576));

        let text: BlockDevice =
            serde_json::from_str(r#"{"path": "/dev/loop0p1", "size": "1048576"}"#).unwrap();
        assert_eq!(text.size, Some(1_048_576));
    }

    #[test]
    fn null_columns_become_none() {
        let device: BlockDevice = serde_json::from_str(
            r#"{"path": "/dev/loop0p1", "uuid": null, "mountpoint": null, "fssize": null}"#,
        )
        .unwrap();
        assert_eq!(device.uuid, None);
        assert_eq!(device.fssize, None);
        assert!(!device.is_mounted());
    }

    #[test]
    fn mounted_requires_non_blank_mountpoint() {
        let device: BlockDevice =
            serde_json::from_str(r#"{"path": "/dev/loop0p1", "mountpoint": "/mnt/data"}"#).unwrap();
        assert!(device.is_mounted());

        let blank: BlockDevice =
            serde_json::from_str(r#"{"path": "/dev/loop0p1", "mountpoint": "  "}"#).unwrap();
        assert!(!blank.is_mounted());
    }
}
