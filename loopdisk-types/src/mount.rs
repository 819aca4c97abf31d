// SPDX-License-Identifier: GPL-3.0-only

//! Mount table records and mount modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One row of the kernel mount table as reported by
/// `findmnt -J -o SOURCE,FSROOT,TARGET`.
///
/// Several entries may share a source: a device mounted once and then
/// bind-mounted elsewhere produces one entry per mount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MountEntry {
    /// Mount source (device path, or directory for bind mounts)
    pub source: String,

    /// Root of the mount within the source filesystem
    #[serde(default)]
    pub fsroot: Option<String>,

    /// Mountpoint
    pub target: String,
}

/// Access mode passed to mount(8) via `-o`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountMode {
    ReadWrite,
    ReadOnly,
    Auto,
}

impl MountMode {
    pub fn flag(self) -> &'static str {
        match self {
            MountMode::ReadWrite => "rw",
            MountMode::ReadOnly => "ro",
            MountMode::Auto => "auto",
        }
    }
}

impl FromStr for MountMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rw" => Ok(MountMode::ReadWrite),
            "ro" => Ok(MountMode::ReadOnly),
            "auto" => Ok(MountMode::Auto),
            other => Err(format!("unknown mount mode: {other}")),
        }
    }
}

impl fmt::Display for MountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}
