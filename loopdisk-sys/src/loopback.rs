// SPDX-License-Identifier: GPL-3.0-only

//! Loop device attachment, detachment and whole-file reclamation.

use crate::cmd::{self, run_checked};
use crate::error::{DiskError, Result};
use crate::inventory::{self, LoopColumns};
use crate::mount;

/// Attach a backing file to a free loop device and return the device path.
///
/// With `partscan` the kernel probes the file's partition table on attach,
/// so `/dev/loopNpM` nodes appear immediately.
pub fn attach(file: &str, partscan: bool) -> Result<String> {
    let mut args = Vec::new();
    if partscan {
        args.push("--partscan".to_string());
    }
    args.push("--find".to_string());
    args.push(file.to_string());
    args.push("--show".to_string());

    let outcome = cmd::run("losetup", &args);
    if !outcome.success() {
        return Err(DiskError::Execution {
            command: outcome.command,
            code: outcome.code,
        });
    }
    outcome.stdout.ok_or_else(|| DiskError::Parse {
        tool: "losetup".to_string(),
        reason: format!("no device path reported for {file}"),
    })
}

/// Detach one loop device.
pub fn detach(device: &str) -> Result<()> {
    run_checked("losetup", &["--detach".to_string(), device.to_string()])
}

/// Detach every loop device on the system.
pub fn detach_all() -> Result<()> {
    run_checked("losetup", &["--detach-all".to_string()])
}

/// Reclaim everything built on a backing file: unmount all partitions of
/// every associated loop device, then detach each device.
///
/// A file with no associated devices is already reclaimed and succeeds
/// trivially. Per-device failures are logged and the remaining devices are
/// still processed; any shortfall is reported as a partial failure.
pub fn deep_detach(file: &str) -> Result<()> {
    let devices = inventory::loop_devices_of(file, LoopColumns::default());
    if devices.is_empty() {
        tracing::info!("no loop devices associated with {file}");
        return Ok(());
    }

    let total = devices.len();
    let mut done = 0;
    for device in devices {
        tracing::info!("reclaiming {} backed by {file}", device.name);
        if let Err(error) = mount::unmount_all_partitions(&device.name) {
            tracing::warn!("{error}");
            continue;
        }
        match detach(&device.name) {
            Ok(()) => done += 1,
            Err(error) => tracing::warn!("failed to detach {}: {error}", device.name),
        }
    }

    if done == total {
        Ok(())
    } else {
        Err(DiskError::PartialDetach {
            file: file.to_string(),
            done,
            total,
        })
    }
}
