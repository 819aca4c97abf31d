// SPDX-License-Identifier: GPL-3.0-only

//! PATH checks for the external utilities every flow depends on.

use anyhow::{bail, Result};

/// Utilities no flow can run without.
const REQUIRED: &[&str] = &[
    "losetup",
    "lsblk",
    "findmnt",
    "mountpoint",
    "mount",
    "umount",
    "parted",
    "truncate",
    "chown",
    "mkfs.ext4",
];

/// Formatters for optional filesystems; their absence only narrows `--fs`.
const OPTIONAL: &[&str] = &["mkfs.fat", "mkfs.ntfs", "mkfs.exfat"];

/// Verify the required utility set, reporting every missing tool at once.
pub fn check() -> Result<()> {
    let mut missing = Vec::new();
    for tool in REQUIRED {
        match which::which(tool) {
            Ok(path) => tracing::debug!("{tool}: {}", path.display()),
            Err(_) => missing.push(*tool),
        }
    }

    for tool in OPTIONAL {
        if which::which(tool).is_err() {
            tracing::warn!("{tool} not found; that filesystem type is unavailable");
        }
    }

    if missing.is_empty() {
        tracing::info!("all required utilities present");
        Ok(())
    } else {
        bail!("missing required utilities: {}", missing.join(", "));
    }
}
