// SPDX-License-Identifier: GPL-3.0-only

//! Loop device records decoded from `losetup --list --json`.

use serde::{Deserialize, Serialize};

use crate::de;

/// One row of `losetup --list --json` output.
///
/// Loop devices are transient kernel objects: created by attach, destroyed by
/// detach, never persisted by this program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoopDevice {
    /// Device path (e.g., "/dev/loop3")
    pub name: String,

    /// Backing file for the loop device
    #[serde(default, rename = "back-file")]
    pub backing_file: Option<String>,

    /// Size limit in bytes, when one was set at attach time
    #[serde(default, deserialize_with = "de::opt_u64")]
    pub sizelimit: Option<u64>,

    /// Offset into the backing file in bytes
    #[serde(default, deserialize_with = "de::opt_u64")]
    pub offset: Option<u64>,

    /// Whether the device was attached read-only
    #[serde(default, deserialize_with = "de::flag")]
    pub ro: bool,
}
