// SPDX-License-Identifier: GPL-3.0-only

//! Read-only queries of block-device, loop-device and mount-table topology.
//!
//! Every query here fails soft: a tool failure or malformed JSON is logged
//! and surfaced as an empty collection (for lists) or as
//! [`DeviceCount::Unknown`] (for counts). Inventory problems never halt a
//! caller; provisioning code decides what an empty answer means.

use serde::Deserialize;

use loopdisk_types::{non_empty_trimmed, BlockDevice, DeviceCount, LoopDevice, MountEntry};

use crate::cmd;

/// Column selection for `lsblk`. `PATH` is always requested.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockColumns {
    pub uuid: bool,
    pub mountpoint: bool,
    pub kind: bool,
    pub sizes: bool,
    pub vendor: bool,
}

impl BlockColumns {
    pub fn with_mountpoint() -> Self {
        Self {
            mountpoint: true,
            ..Self::default()
        }
    }

    fn render(self) -> String {
        let mut columns = String::from("PATH");
        if self.uuid {
            columns.push_str(",UUID");
        }
        if self.mountpoint {
            columns.push_str(",MOUNTPOINT");
        }
        if self.kind {
            columns.push_str(",TYPE,FSTYPE");
        }
        if self.sizes {
            columns.push_str(",SIZE,FSSIZE");
        }
        if self.vendor {
            columns.push_str(",VENDOR,MODEL,SERIAL,REV");
        }
        columns
    }
}

/// Column selection for `losetup`. `NAME` is always requested.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopColumns {
    pub backing_file: bool,
    pub read_only: bool,
    pub geometry: bool,
}

impl LoopColumns {
    fn render(self) -> String {
        let mut columns = String::from("NAME");
        if self.backing_file {
            columns.push_str(",BACK-FILE");
        }
        if self.read_only {
            columns.push_str(",RO");
        }
        if self.geometry {
            columns.push_str(",SIZELIMIT,OFFSET");
        }
        columns
    }
}

#[derive(Debug, Deserialize)]
struct LsblkReport {
    blockdevices: Vec<BlockDevice>,
}

#[derive(Debug, Deserialize)]
struct LosetupReport {
    loopdevices: Vec<LoopDevice>,
}

#[derive(Debug, Deserialize)]
struct FindmntReport {
    filesystems: Vec<MountEntry>,
}

fn decode_blockdevices(raw: &str) -> Option<Vec<BlockDevice>> {
    match serde_json::from_str::<LsblkReport>(raw) {
        Ok(report) => Some(report.blockdevices),
        Err(error) => {
            tracing::warn!("unreadable lsblk output: {error}");
            None
        }
    }
}

fn decode_loopdevices(raw: &str) -> Option<Vec<LoopDevice>> {
    match serde_json::from_str::<LosetupReport>(raw) {
        Ok(report) => Some(report.loopdevices),
        Err(error) => {
            tracing::warn!("unreadable losetup output: {error}");
            None
        }
    }
}

fn decode_filesystems(raw: &str) -> Option<Vec<MountEntry>> {
    match serde_json::from_str::<FindmntReport>(raw) {
        Ok(report) => Some(report.filesystems),
        Err(error) => {
            tracing::warn!("unreadable findmnt output: {error}");
            None
        }
    }
}

/// `None` means the query itself failed; `Some(vec![])` means it succeeded
/// with nothing to report. The distinction feeds the count sentinel.
fn query_blockdevices(path: &str, columns: BlockColumns) -> Option<Vec<BlockDevice>> {
    let mut args = vec![path.to_string(), "--paths".to_string(), "--json".to_string()];
    if columns.sizes {
        args.push("-b".to_string());
    }
    args.push("--output".to_string());
    args.push(columns.render());

    let outcome = cmd::run("lsblk", &args);
    if !outcome.success() {
        return None;
    }
    match outcome.stdout {
        Some(raw) => decode_blockdevices(&raw),
        None => Some(Vec::new()),
    }
}

fn query_loopdevices(file: &str, columns: LoopColumns) -> Option<Vec<LoopDevice>> {
    let args = vec![
        "--list".to_string(),
        "--json".to_string(),
        "--associated".to_string(),
        file.to_string(),
        "--output".to_string(),
        columns.render(),
    ];

    let outcome = cmd::run("losetup", &args);
    if !outcome.success() {
        return None;
    }
    match outcome.stdout {
        // losetup prints nothing at all when no device is associated.
        Some(raw) => decode_loopdevices(&raw),
        None => Some(Vec::new()),
    }
}

fn retain_other_devices(devices: Vec<BlockDevice>, path: &str, exclude_self: bool) -> Vec<BlockDevice> {
    if !exclude_self {
        return devices;
    }
    devices
        .into_iter()
        .filter(|device| device.path != path)
        .collect()
}

/// Ordered mount-table entries for a device, or for the device behind a
/// directory.
pub fn mounts_of(path: &str, exclude_self: bool) -> Vec<MountEntry> {
    let args = vec![
        "-J".to_string(),
        "-o".to_string(),
        "SOURCE,FSROOT,TARGET".to_string(),
        path.to_string(),
    ];

    let outcome = cmd::run("findmnt", &args);
    if !outcome.success() {
        return Vec::new();
    }
    let raw = match outcome.stdout {
        Some(raw) => raw,
        None => return Vec::new(),
    };

    let entries = decode_filesystems(&raw).unwrap_or_default();
    if exclude_self {
        entries
            .into_iter()
            .filter(|entry| entry.source != path)
            .collect()
    } else {
        entries
    }
}

/// Block devices related to `path` (the device itself plus its partitions).
pub fn sub_devices_of(path: &str, columns: BlockColumns, exclude_self: bool) -> Vec<BlockDevice> {
    query_blockdevices(path, columns)
        .map(|devices| retain_other_devices(devices, path, exclude_self))
        .unwrap_or_default()
}

/// Count variant of [`sub_devices_of`] preserving the failed/empty split.
pub fn sub_device_count(path: &str, exclude_self: bool) -> DeviceCount {
    match query_blockdevices(path, BlockColumns::default()) {
        Some(devices) => DeviceCount::Known(retain_other_devices(devices, path, exclude_self).len()),
        None => DeviceCount::Unknown,
    }
}

/// Loop devices currently associated with a backing file.
pub fn loop_devices_of(file: &str, columns: LoopColumns) -> Vec<LoopDevice> {
    query_loopdevices(file, columns).unwrap_or_default()
}

/// Count variant of [`loop_devices_of`] preserving the failed/empty split.
pub fn loop_device_count(file: &str) -> DeviceCount {
    match query_loopdevices(file, LoopColumns::default()) {
        Some(devices) => DeviceCount::Known(devices.len()),
        None => DeviceCount::Unknown,
    }
}

fn size_column(path: &str, column: &str) -> Option<u64> {
    let args = vec![
        path.to_string(),
        "-n".to_string(),
        "-b".to_string(),
        "-o".to_string(),
        column.to_string(),
    ];

    let raw = cmd::run_stdout("lsblk", &args)?;
    let raw = non_empty_trimmed(&raw)?;
    if !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        tracing::warn!("{column} for {path} is not a byte count: {raw}");
        return None;
    }
    raw.parse().ok()
}

/// Device size in bytes, or `None` if it could not be determined.
pub fn device_size(path: &str) -> Option<u64> {
    size_column(path, "SIZE")
}

/// Filesystem size in bytes, or `None` if it could not be determined.
pub fn filesystem_size(path: &str) -> Option<u64> {
    size_column(path, "FSSIZE")
}

#[cfg(test)]
mod tests {
    use super::{
        decode_blockdevices, decode_filesystems, decode_loopdevices, device_size,
        filesystem_size, retain_other_devices, BlockColumns, LoopColumns,
    };

    #[test]
    fn renders_selected_block_columns_onto_path() {
        assert_eq!(BlockColumns::default().render(), "PATH");
        assert_eq!(
            BlockColumns::with_mountpoint().render(),
            "PATH,MOUNTPOINT"
        );

        let all = BlockColumns {
            uuid: true,
            mountpoint: true,
            kind: true,
            sizes: true,
            vendor: true,
        };
        assert_eq!(
            all.render(),
            "PATH,UUID,MOUNTPOINT,TYPE,FSTYPE,SIZE,FSSIZE,VENDOR,MODEL,SERIAL,REV"
        );
    }

    #[test]
    fn renders_selected_loop_columns_onto_name() {
        assert_eq!(LoopColumns::default().render(), "NAME");
        let all = LoopColumns {
            backing_file: true,
            read_only: true,
            geometry: true,
        };
        assert_eq!(all.render(), "NAME,BACK-FILE,RO,SIZELIMIT,OFFSET");
    }

    #[test]
    fn decodes_lsblk_report() {
        let raw = r#"{"blockdevices": [
            {"path": "/dev/loop0", "mountpoint": null},
            {"path": "/dev/loop0p1", "mountpoint": "/mnt/loopdisk"}
        ]}"#;
        let devices = decode_blockdevices(raw).unwrap();
        assert_eq!(devices.len(), 2);
        assert!(devices[1].is_mounted());
    }

    #[test]
    fn malformed_reports_decode_to_none() {
        assert!(decode_blockdevices("not json").is_none());
        assert!(decode_blockdevices(r#"{"wrong_key": []}"#).is_none());
        assert!(decode_loopdevices("{").is_none());
        assert!(decode_filesystems(r#"{"filesystems": "oops"}"#).is_none());
    }

    #[test]
    fn decodes_losetup_report() {
        let raw = r#"{"loopdevices": [
            {"name": "/dev/loop3", "back-file": "/srv/disk.img", "ro": "0"}
        ]}"#;
        let devices = decode_loopdevices(raw).unwrap();
        assert_eq!(devices[0].name, "/dev/loop3");
        assert!(!devices[0].ro);
    }

    #[test]
    fn decodes_findmnt_report() {
        let raw = r#"{"filesystems": [
            {"source": "/dev/loop0p1", "fsroot": "/", "target": "/mnt/loopdisk"},
            {"source": "/dev/loop0p1", "fsroot": "/data", "target": "/var/lib/svc"}
        ]}"#;
        let entries = decode_filesystems(raw).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].target, "/var/lib/svc");
    }

    #[test]
    fn size_queries_fail_soft_to_none() {
        assert_eq!(device_size("/definitely/not/a/device"), None);
        assert_eq!(filesystem_size("/definitely/not/a/device"), None);
    }

    #[test]
    fn self_exclusion_filters_exact_path_only() {
        let raw = r#"{"blockdevices": [
            {"path": "/dev/loop0"},
            {"path": "/dev/loop0p1"}
        ]}"#;
        let devices = decode_blockdevices(raw).unwrap();
        let kept = retain_other_devices(devices.clone(), "/dev/loop0", true);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path, "/dev/loop0p1");

        let kept_all = retain_other_devices(devices, "/dev/loop0", false);
        assert_eq!(kept_all.len(), 2);
    }
}
