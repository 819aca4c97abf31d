// SPDX-License-Identifier: GPL-3.0-only

//! Mount lifecycle: idempotent mounts, plain and recursive unmounts, and
//! root-last teardown of a mount stack layered over one source device.

use std::fs;
use std::path::Path;

use loopdisk_types::{MountEntry, MountMode};

use crate::cmd::{self, run_checked};
use crate::error::{DiskError, Result};
use crate::inventory::{self, BlockColumns};

/// Whether a directory currently reports as a mountpoint, per mountpoint(1).
pub fn is_mountpoint(dir: &Path) -> bool {
    cmd::run("mountpoint", &[dir.display().to_string()]).success()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MountOptions {
    /// Access mode passed via `-o`; omitted when `None`.
    pub mode: Option<MountMode>,
    /// Create the destination directory tree before mounting.
    pub ensure_destination: bool,
}

impl MountOptions {
    pub fn read_write() -> Self {
        Self {
            mode: Some(MountMode::ReadWrite),
            ensure_destination: false,
        }
    }

    pub fn read_write_ensured() -> Self {
        Self {
            mode: Some(MountMode::ReadWrite),
            ensure_destination: true,
        }
    }
}

fn ensure_destination(destination: &Path) -> Result<()> {
    fs::create_dir_all(destination).map_err(|error| {
        DiskError::Precondition(format!(
            "destination {} could not be created: {error}",
            destination.display()
        ))
    })
}

/// Mount `source` on `destination`.
///
/// A directory source becomes a bind mount (`-B`); anything else is mounted
/// as a filesystem.
pub fn mount(source: &Path, destination: &Path, options: MountOptions) -> Result<()> {
    if options.ensure_destination {
        ensure_destination(destination)?;
    }

    let mut args = Vec::new();
    if source.is_dir() {
        args.push("-B".to_string());
    }
    if let Some(mode) = options.mode {
        args.push("-o".to_string());
        args.push(mode.flag().to_string());
    }
    args.push(source.display().to_string());
    args.push(destination.display().to_string());

    run_checked("mount", &args)
}

/// Mount a volume with a known filesystem UUID.
pub fn mount_by_uuid(uuid: &str, destination: &Path, options: MountOptions) -> Result<()> {
    if options.ensure_destination {
        ensure_destination(destination)?;
    }

    let mut args = Vec::new();
    if let Some(mode) = options.mode {
        args.push("-o".to_string());
        args.push(mode.flag().to_string());
    }
    args.push("--uuid".to_string());
    args.push(uuid.to_string());
    args.push(destination.display().to_string());

    run_checked("mount", &args)
}

/// Idempotent mount: succeed without issuing a mount when the destination
/// already reports as a mountpoint.
pub fn ensure_mounted(source: &Path, destination: &Path, options: MountOptions) -> Result<()> {
    if destination.exists() && is_mountpoint(destination) {
        tracing::info!("{} is already a mountpoint", destination.display());
        return Ok(());
    }
    mount(source, destination, options)
}

/// Unmount whatever is mounted on `target`, optionally recursively (`-R`).
pub fn unmount(target: &Path, recursive: bool) -> Result<()> {
    if !target.is_dir() {
        return Err(DiskError::Precondition(format!(
            "unmount target {} is not a directory",
            target.display()
        )));
    }

    let mut args = Vec::new();
    if recursive {
        args.push("-R".to_string());
    }
    args.push(target.display().to_string());

    run_checked("umount", &args)
}

/// Teardown order for the mount stack over one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmountPlan {
    /// Targets of bind mounts layered above the root, in query order.
    pub layered: Vec<String>,
    /// Target of the root mount, unmounted last.
    pub root: Option<String>,
}

impl UnmountPlan {
    pub fn total(&self) -> usize {
        self.layered.len() + usize::from(self.root.is_some())
    }
}

/// Split mount entries into layered targets plus the root mount.
///
/// The root is the first entry whose source equals `device` exactly; every
/// other entry was built over the root's target and must be unwound before
/// it. If the inventory query returns entries in an unexpected order, the
/// first match still wins; root identity is not re-verified.
pub fn unmount_plan(device: &str, entries: &[MountEntry]) -> UnmountPlan {
    let mut layered = Vec::new();
    let mut root = None;

    for entry in entries {
        if root.is_none() && entry.source == device {
            root = Some(entry.target.clone());
            continue;
        }
        layered.push(entry.target.clone());
    }

    UnmountPlan { layered, root }
}

/// Unmount everything traceable to `device`, root mount last.
///
/// Issues one unmount per identified entry; failures are logged and counted,
/// and anything short of a full unwind is reported as a partial failure.
pub fn recursive_unmount_by_source(device: &str) -> Result<()> {
    let entries = inventory::mounts_of(device, false);
    let plan = unmount_plan(device, &entries);
    let total = plan.total();
    let mut done = 0;

    for target in &plan.layered {
        match unmount(Path::new(target), false) {
            Ok(()) => done += 1,
            Err(error) => tracing::warn!("failed to unmount {target}: {error}"),
        }
    }
    if let Some(root) = &plan.root {
        match unmount(Path::new(root), false) {
            Ok(()) => done += 1,
            Err(error) => tracing::warn!("failed to unmount root {root}: {error}"),
        }
    }

    if done == total {
        Ok(())
    } else {
        Err(DiskError::PartialUnmount {
            device: device.to_string(),
            done,
            total,
        })
    }
}

/// Unmount every mounted partition of a block device.
///
/// The device itself is included in the enumeration, so a filesystem written
/// directly to it (no partition table) is unwound too. Execution is
/// best-effort: one partition's failure does not stop the rest, but the
/// aggregate is reported all-or-nothing.
pub fn unmount_all_partitions(device: &str) -> Result<()> {
    let devices = inventory::sub_devices_of(device, BlockColumns::with_mountpoint(), false);
    let mut total = 0;
    let mut done = 0;

    for block in devices {
        if !block.is_mounted() {
            continue;
        }
        total += 1;
        tracing::info!("unmounting everything on {}", block.path);
        match recursive_unmount_by_source(&block.path) {
            Ok(()) => done += 1,
            Err(error) => tracing::warn!("{error}"),
        }
    }

    if done == total {
        Ok(())
    } else {
        Err(DiskError::PartialUnmount {
            device: device.to_string(),
            done,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use loopdisk_types::MountEntry;

    use super::{mount_by_uuid, unmount, unmount_plan, MountOptions};
    use crate::error::DiskError;

    fn entry(source: &str, target: &str) -> MountEntry {
        MountEntry {
            source: source.to_string(),
            fsroot: Some("/".to_string()),
            target: target.to_string(),
        }
    }

    #[test]
    fn root_is_planned_last_with_k_plus_one_targets() {
        let entries = vec![
            entry("/dev/loop0p1", "/mnt/loopdisk"),
            entry("/mnt/loopdisk/data", "/var/lib/svc"),
            entry("/mnt/loopdisk/logs", "/var/log/svc"),
        ];
        let plan = unmount_plan("/dev/loop0p1", &entries);
        assert_eq!(plan.total(), 3);
        assert_eq!(plan.layered, vec!["/var/lib/svc", "/var/log/svc"]);
        assert_eq!(plan.root.as_deref(), Some("/mnt/loopdisk"));
    }

    #[test]
    fn only_the_first_source_match_is_the_root() {
        let entries = vec![
            entry("/dev/loop0p1", "/mnt/a"),
            entry("/dev/loop0p1", "/mnt/b"),
        ];
        let plan = unmount_plan("/dev/loop0p1", &entries);
        assert_eq!(plan.root.as_deref(), Some("/mnt/a"));
        assert_eq!(plan.layered, vec!["/mnt/b"]);
    }

    #[test]
    fn stack_without_a_root_is_all_layered() {
        let entries = vec![entry("/mnt/elsewhere", "/srv/bind")];
        let plan = unmount_plan("/dev/loop0p1", &entries);
        assert_eq!(plan.root, None);
        assert_eq!(plan.total(), 1);
    }

    #[test]
    fn empty_stack_plans_nothing() {
        let plan = unmount_plan("/dev/loop0p1", &[]);
        assert_eq!(plan.total(), 0);
    }

    #[test]
    fn uuid_mount_failure_names_the_uuid_flag() {
        let dir = tempfile::tempdir().unwrap();
        let error =
            mount_by_uuid("no-such-uuid", dir.path(), MountOptions::default()).unwrap_err();
        match error {
            DiskError::Execution { command, .. } => {
                assert!(command.contains("--uuid no-such-uuid"), "command was: {command}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unmounting_a_non_directory_is_a_precondition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let error = unmount(&missing, false).unwrap_err();
        assert!(matches!(error, DiskError::Precondition(_)));

        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        assert!(unmount(Path::new(&file), false).is_err());
    }
}
