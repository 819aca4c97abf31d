// SPDX-License-Identifier: GPL-3.0-only

//! Provisioning flows composed from the core device operations.
//!
//! Each flow takes one immutable request struct built at parse time and runs
//! its stages in order. The first failing stage aborts the flow with context;
//! side effects of earlier stages are left in place.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use loopdisk_sys::{inventory, loopback, mount, partition};
use loopdisk_sys::inventory::{BlockColumns, LoopColumns};
use loopdisk_sys::mount::MountOptions;
use loopdisk_types::{DeviceCount, FsType, TableKind};

#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub file: PathBuf,
    pub size: String,
    pub target: PathBuf,
    pub label: String,
    pub fs: FsType,
    pub owner: Option<String>,
    pub service_dirs: Option<ServiceDirs>,
    pub and_clean: bool,
}

#[derive(Debug, Clone)]
pub struct MountRequest {
    pub file: PathBuf,
    pub target: PathBuf,
    pub service_dirs: Option<ServiceDirs>,
}

#[derive(Debug, Clone)]
pub struct SetupRequest {
    pub file: PathBuf,
    pub target: PathBuf,
    pub dirs: ServiceDirs,
}

#[derive(Debug, Clone)]
pub struct CleanRequest {
    pub file: PathBuf,
    pub destroy: bool,
}

/// Where the dependent service expects its data and logs to live.
#[derive(Debug, Clone)]
pub struct ServiceDirs {
    pub data: PathBuf,
    pub logs: PathBuf,
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

/// Create the backing file if absent and refuse anything that is not a
/// regular file at that path.
fn ensure_backing_file(file: &Path, size: &str) -> Result<()> {
    if let Some(parent) = file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent of {}", file.display()))?;
        }
    }

    if file.exists() {
        if !file.is_file() {
            bail!("{} exists but is not a regular file", file.display());
        }
        tracing::info!("reusing existing image {}", file.display());
        return Ok(());
    }

    let args = vec!["-s".to_string(), size.to_string(), path_str(file)];
    let code = loopdisk_sys::cmd::run_status("truncate", &args);
    if code != 0 {
        bail!("truncate -s {size} {} failed (exit code {code})", file.display());
    }
    Ok(())
}

/// Attach the file to a fresh loop device, insisting it is not attached yet.
fn attach_fresh(file: &Path) -> Result<String> {
    let file = path_str(file);
    match inventory::loop_device_count(&file) {
        DeviceCount::Known(0) => {}
        DeviceCount::Known(n) => {
            bail!("{file} is already attached to {n} loop device(s); clean it first")
        }
        DeviceCount::Unknown => bail!("could not inspect loop devices for {file}"),
    }
    loopback::attach(&file, true).context("attach loop device")
}

/// First partition of a loop device, requesting the mountpoint column.
fn first_partition(device: &str) -> Result<loopdisk_types::BlockDevice> {
    let partitions = inventory::sub_devices_of(device, BlockColumns::with_mountpoint(), true);
    partitions
        .into_iter()
        .next()
        .with_context(|| format!("{device} has no partitions"))
}

/// Bind the image's data/ and logs/ subtrees onto the service directories.
fn bind_service_dirs(mountpoint: &Path, dirs: &ServiceDirs) -> Result<()> {
    for (subtree, destination) in [("data", &dirs.data), ("logs", &dirs.logs)] {
        let source = mountpoint.join(subtree);
        fs::create_dir_all(&source)
            .with_context(|| format!("create {}", source.display()))?;
        mount::ensure_mounted(
            &source,
            destination,
            MountOptions {
                mode: None,
                ensure_destination: true,
            },
        )
        .with_context(|| format!("bind {} onto {}", source.display(), destination.display()))?;
    }
    Ok(())
}

/// Full provisioning: image file, loop device, partition table, filesystem,
/// mount, service directories, ownership.
pub fn create(request: &CreateRequest) -> Result<()> {
    ensure_backing_file(&request.file, &request.size)?;

    let device = attach_fresh(&request.file)?;
    tracing::info!("attached {} as {device}", request.file.display());

    partition::init_table(&device, TableKind::Mbr).context("write partition table")?;
    let part =
        partition::create_and_format(&device, request.fs, Some(&request.label), None, None)
            .context("create and format partition")?;

    mount::ensure_mounted(
        Path::new(&part),
        &request.target,
        MountOptions::read_write_ensured(),
    )
    .with_context(|| format!("mount {part} at {}", request.target.display()))?;

    for subtree in ["data", "logs"] {
        let dir = request.target.join(subtree);
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    }

    if let Some(owner) = &request.owner {
        let args = vec![
            "-R".to_string(),
            owner.clone(),
            path_str(&request.target),
        ];
        let code = loopdisk_sys::cmd::run_status("chown", &args);
        if code != 0 {
            bail!("chown -R {owner} {} failed (exit code {code})", request.target.display());
        }
    }

    if let Some(dirs) = &request.service_dirs {
        bind_service_dirs(&request.target, dirs)?;
    }

    if request.and_clean {
        clean(&CleanRequest {
            file: request.file.clone(),
            destroy: false,
        })?;
    }

    Ok(())
}

/// Mount an existing image, attaching it first when nothing is attached.
pub fn mount_image(request: &MountRequest) -> Result<()> {
    let file = path_str(&request.file);
    let device = match inventory::loop_device_count(&file) {
        DeviceCount::Known(0) => loopback::attach(&file, true).context("attach loop device")?,
        DeviceCount::Known(1) => {
            let devices = inventory::loop_devices_of(&file, LoopColumns::default());
            match devices.into_iter().next() {
                Some(device) => device.name,
                None => bail!("loop device for {file} disappeared between queries"),
            }
        }
        DeviceCount::Known(n) => {
            bail!("{file} is attached to {n} loop devices; expected at most one")
        }
        DeviceCount::Unknown => bail!("could not inspect loop devices for {file}"),
    };

    let part = first_partition(&device)?;
    mount::ensure_mounted(
        Path::new(&part.path),
        &request.target,
        MountOptions::read_write_ensured(),
    )
    .with_context(|| format!("mount {} at {}", part.path, request.target.display()))?;

    if let Some(dirs) = &request.service_dirs {
        bind_service_dirs(&request.target, dirs)?;
    }

    Ok(())
}

/// Bind an attached image's data/ and logs/ onto the service directories,
/// mounting the partition first when it is not mounted anywhere.
pub fn setup(request: &SetupRequest) -> Result<()> {
    let file = path_str(&request.file);
    match inventory::loop_device_count(&file) {
        DeviceCount::Known(1) => {}
        DeviceCount::Known(n) => {
            bail!("{file} is attached to {n} loop devices; setup needs exactly one")
        }
        DeviceCount::Unknown => bail!("could not inspect loop devices for {file}"),
    }

    let devices = inventory::loop_devices_of(&file, LoopColumns::default());
    let device = match devices.into_iter().next() {
        Some(device) => device.name,
        None => bail!("loop device for {file} disappeared between queries"),
    };

    let part = first_partition(&device)?;
    let mountpoint = match &part.mountpoint {
        Some(mountpoint) if !mountpoint.trim().is_empty() => PathBuf::from(mountpoint),
        _ => {
            mount::ensure_mounted(
                Path::new(&part.path),
                &request.target,
                MountOptions::read_write_ensured(),
            )
            .with_context(|| {
                format!("mount {} at {}", part.path, request.target.display())
            })?;
            request.target.clone()
        }
    };

    bind_service_dirs(&mountpoint, &request.dirs)
}

/// Unwind everything built on the image; optionally delete the file.
pub fn clean(request: &CleanRequest) -> Result<()> {
    let file = path_str(&request.file);
    loopback::deep_detach(&file).with_context(|| format!("reclaim {file}"))?;

    if request.destroy {
        if request.file.exists() {
            fs::remove_file(&request.file)
                .with_context(|| format!("delete {file}"))?;
            tracing::info!("deleted {file}");
        } else {
            tracing::info!("{file} already absent");
        }
    }
    Ok(())
}
