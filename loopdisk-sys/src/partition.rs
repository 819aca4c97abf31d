// SPDX-License-Identifier: GPL-3.0-only

//! Partition table setup, partition creation and formatting.
//!
//! `parted` prints no machine-readable handle for a partition it just
//! created, so discovery is diff-based: snapshot the device's partitions,
//! create, snapshot again, and require the delta to be exactly one new path.

use std::collections::HashSet;

use loopdisk_types::{normalize_label, BlockDevice, FsType, TableKind};

use crate::cmd::run_checked;
use crate::error::{DiskError, Result};
use crate::inventory::{self, BlockColumns};

/// Write a fresh partition table, destroying any existing one.
pub fn init_table(device: &str, kind: TableKind) -> Result<()> {
    let args = vec![
        "-s".to_string(),
        device.to_string(),
        "mklabel".to_string(),
        kind.parted_label().to_string(),
    ];
    run_checked("parted", &args)
}

/// Create one primary partition spanning `start..end`.
///
/// When either bound is omitted the filesystem's default extent is used,
/// so a bare call claims the whole device with correct alignment.
pub fn create_partition(
    device: &str,
    fs: FsType,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<()> {
    let (default_start, default_end) = fs.default_extent();
    let args = vec![
        "-s".to_string(),
        device.to_string(),
        "mkpart".to_string(),
        "primary".to_string(),
        fs.parted_name().to_string(),
        start.unwrap_or(default_start).to_string(),
        end.unwrap_or(default_end).to_string(),
    ];
    run_checked("parted", &args)
}

/// Formatter command line for a partition, as `(program, args)`.
///
/// Labels are normalized before use; an empty label is dropped entirely.
pub fn format_command(partition: &str, fs: FsType, label: Option<&str>) -> (String, Vec<String>) {
    let label = label.and_then(normalize_label);

    match fs {
        FsType::Ext4 => {
            let mut args = vec!["-F".to_string()];
            if let Some(label) = label {
                args.push("-L".to_string());
                args.push(label);
            }
            args.push(partition.to_string());
            ("mkfs.ext4".to_string(), args)
        }
        FsType::Fat32 => {
            let mut args = vec!["-v".to_string(), "-F".to_string(), "32".to_string()];
            if let Some(label) = label {
                args.push("-n".to_string());
                args.push(label);
            }
            args.push(partition.to_string());
            ("mkfs.fat".to_string(), args)
        }
        FsType::Ntfs => {
            let mut args = vec!["-f".to_string()];
            if let Some(label) = label {
                args.push("-L".to_string());
                args.push(label);
            }
            args.push(partition.to_string());
            ("mkfs.ntfs".to_string(), args)
        }
        FsType::Exfat => {
            let mut args = Vec::new();
            if let Some(label) = label {
                args.push("-L".to_string());
                args.push(label);
            }
            args.push(partition.to_string());
            ("mkfs.exfat".to_string(), args)
        }
    }
}

/// Format a partition with the named filesystem.
pub fn format(partition: &str, fs: FsType, label: Option<&str>) -> Result<()> {
    let (program, args) = format_command(partition, fs, label);
    run_checked(&program, &args)
}

/// Identify the single partition present after creation but not before.
///
/// Anything other than "one more entry, exactly one fresh path" means the
/// device changed underneath us and the new partition cannot be named with
/// confidence.
pub fn new_partition_path(
    device: &str,
    before: &[BlockDevice],
    after: &[BlockDevice],
) -> Result<String> {
    let delta = || DiskError::PartitionDelta {
        device: device.to_string(),
        before: before.len(),
        after: after.len(),
    };

    if after.len() != before.len() + 1 {
        return Err(delta());
    }

    let known: HashSet<&str> = before.iter().map(|device| device.path.as_str()).collect();
    let mut fresh = after
        .iter()
        .filter(|device| !known.contains(device.path.as_str()))
        .map(|device| device.path.clone());

    match (fresh.next(), fresh.next()) {
        (Some(path), None) => Ok(path),
        _ => Err(delta()),
    }
}

/// Create one partition and format it, returning the new partition's path.
///
/// The before/after snapshots are not atomic with the creation; a concurrent
/// mutator altering the device's partitions in that window is detected as a
/// bad delta and the format is never issued.
pub fn create_and_format(
    device: &str,
    fs: FsType,
    label: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<String> {
    let before = inventory::sub_devices_of(device, BlockColumns::default(), true);
    create_partition(device, fs, start, end)?;
    let after = inventory::sub_devices_of(device, BlockColumns::default(), true);

    let partition = new_partition_path(device, &before, &after)?;
    tracing::info!("created partition {partition} on {device}");
    format(&partition, fs, label)?;
    Ok(partition)
}

#[cfg(test)]
mod tests {
    use loopdisk_types::{BlockDevice, FsType, TableKind};

    use super::{format_command, init_table, new_partition_path};
    use crate::error::DiskError;

    fn device(path: &str) -> BlockDevice {
        BlockDevice {
            path: path.to_string(),
            ..BlockDevice::default()
        }
    }

    #[test]
    fn ext4_formatter_forces_and_labels() {
        let (program, args) = format_command("/dev/loop0p1", FsType::Ext4, Some("Data"));
        assert_eq!(program, "mkfs.ext4");
        assert_eq!(args, vec!["-F", "-L", "data", "/dev/loop0p1"]);
    }

    #[test]
    fn fat32_formatter_pins_fat_width() {
        let (program, args) = format_command("/dev/loop0p1", FsType::Fat32, None);
        assert_eq!(program, "mkfs.fat");
        assert_eq!(args, vec!["-v", "-F", "32", "/dev/loop0p1"]);
    }

    #[test]
    fn ntfs_formatter_uses_fast_format() {
        let (program, args) = format_command("/dev/loop0p1", FsType::Ntfs, Some("scratch"));
        assert_eq!(program, "mkfs.ntfs");
        assert_eq!(args, vec!["-f", "-L", "scratch", "/dev/loop0p1"]);
    }

    #[test]
    fn exfat_formatter_is_minimal() {
        let (program, args) = format_command("/dev/loop0p1", FsType::Exfat, None);
        assert_eq!(program, "mkfs.exfat");
        assert_eq!(args, vec!["/dev/loop0p1"]);
    }

    #[test]
    fn blank_labels_are_dropped() {
        let (_, args) = format_command("/dev/loop0p1", FsType::Ext4, Some("   "));
        assert_eq!(args, vec!["-F", "/dev/loop0p1"]);
    }

    #[test]
    fn table_creation_failure_names_its_command() {
        let error = init_table("/definitely/not/a/device", TableKind::Mbr).unwrap_err();
        match error {
            DiskError::Execution { command, .. } => {
                assert!(command.contains("mklabel msdos"), "command was: {command}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn identifies_the_single_new_partition() {
        let before = vec![device("/dev/loop0p1")];
        let after = vec![device("/dev/loop0p1"), device("/dev/loop0p2")];
        let path = new_partition_path("/dev/loop0", &before, &after).unwrap();
        assert_eq!(path, "/dev/loop0p2");
    }

    #[test]
    fn rejects_two_new_partitions() {
        let before = vec![device("/dev/loop0p1")];
        let after = vec![
            device("/dev/loop0p1"),
            device("/dev/loop0p2"),
            device("/dev/loop0p3"),
        ];
        let error = new_partition_path("/dev/loop0", &before, &after).unwrap_err();
        assert!(matches!(
            error,
            DiskError::PartitionDelta {
                before: 1,
                after: 3,
                ..
            }
        ));
    }

    #[test]
    fn rejects_no_new_partition() {
        let before = vec![device("/dev/loop0p1")];
        let after = vec![device("/dev/loop0p1")];
        assert!(new_partition_path("/dev/loop0", &before, &after).is_err());
    }

    #[test]
    fn rejects_a_replaced_partition() {
        // Count grew by one but two paths are fresh: p1 vanished, p2 and
        // p3 appeared. That is not a single creation.
        let before = vec![device("/dev/loop0p1")];
        let after = vec![device("/dev/loop0p2"), device("/dev/loop0p3")];
        assert!(new_partition_path("/dev/loop0", &before, &after).is_err());
    }
}
