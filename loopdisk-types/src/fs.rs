// SPDX-License-Identifier: GPL-3.0-only

//! Filesystem and partition-table kinds supported by the provisioner.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Filesystems the provisioner can create partitions for and format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsType {
    Ext4,
    Fat32,
    Ntfs,
    Exfat,
}

impl FsType {
    /// Filesystem name as parted(8) expects it in `mkpart`.
    pub fn parted_name(self) -> &'static str {
        match self {
            FsType::Ext4 => "ext4",
            FsType::Fat32 => "fat32",
            FsType::Ntfs => "ntfs",
            FsType::Exfat => "exfat",
        }
    }

    /// Default (start, end) extents used when the caller does not specify
    /// them. fat32 starts at sector 2048 for alignment with its tooling;
    /// everything else starts at 1 MiB.
    pub fn default_extent(self) -> (&'static str, &'static str) {
        match self {
            FsType::Fat32 => ("2048s", "100%"),
            FsType::Ext4 | FsType::Ntfs | FsType::Exfat => ("1MiB", "100%"),
        }
    }
}

impl FromStr for FsType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ext4" => Ok(FsType::Ext4),
            "fat32" | "vfat" => Ok(FsType::Fat32),
            "ntfs" => Ok(FsType::Ntfs),
            "exfat" => Ok(FsType::Exfat),
            other => Err(format!("unsupported filesystem type: {other}")),
        }
    }
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.parted_name())
    }
}

/// Partition table kinds writable by `parted mklabel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Mbr,
    Gpt,
}

impl TableKind {
    /// Label name as parted(8) expects it.
    pub fn parted_label(self) -> &'static str {
        match self {
            TableKind::Mbr => "msdos",
            TableKind::Gpt => "gpt",
        }
    }
}

impl FromStr for TableKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mbr" | "msdos" | "dos" => Ok(TableKind::Mbr),
            "gpt" => Ok(TableKind::Gpt),
            other => Err(format!("unsupported partition table kind: {other}")),
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.parted_label())
    }
}

#[cfg(test)]
mod tests {
    use super::{FsType, TableKind};

    #[test]
    fn ext4_defaults_to_one_mib_alignment() {
        assert_eq!(FsType::Ext4.default_extent(), ("1MiB", "100%"));
    }

    #[test]
    fn fat32_defaults_to_sector_2048() {
        assert_eq!(FsType::Fat32.default_extent(), ("2048s", "100%"));
    }

    #[test]
    fn parses_common_spellings() {
        assert_eq!("vfat".parse::<FsType>().unwrap(), FsType::Fat32);
        assert_eq!("EXT4".parse::<FsType>().unwrap(), FsType::Ext4);
        assert_eq!("dos".parse::<TableKind>().unwrap(), TableKind::Mbr);
        assert_eq!(TableKind::Mbr.parted_label(), "msdos");
        assert!("zfs".parse::<FsType>().is_err());
    }
}
