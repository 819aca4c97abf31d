// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use loopdisk_types::FsType;

pub const DEFAULT_TARGET: &str = "/mnt/loopdisk";
pub const DEFAULT_LABEL: &str = "loopdisk";

#[derive(Debug, Parser)]
#[command(name = "loopdisk")]
#[command(about = "Provision loop-backed disk images and manage their mount stacks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a disk image, attach it, partition, format and mount it.
    New {
        /// Backing image file to create.
        file: PathBuf,
        /// Image size, as understood by truncate(1) (e.g. 10G).
        #[arg(long, default_value = "10G")]
        size: String,
        /// Mountpoint for the image's filesystem.
        #[arg(long, default_value = DEFAULT_TARGET)]
        target: PathBuf,
        /// Volume label for the new filesystem.
        #[arg(long, default_value = DEFAULT_LABEL)]
        label: String,
        /// Filesystem to create.
        #[arg(long, default_value = "ext4")]
        fs: FsType,
        /// Recursively chown the mounted filesystem to this owner (user or user:group).
        #[arg(long)]
        owner: Option<String>,
        /// Service data directory to bind the image's data/ onto.
        #[arg(long, requires = "logs")]
        data: Option<PathBuf>,
        /// Service log directory to bind the image's logs/ onto.
        #[arg(long, requires = "data")]
        logs: Option<PathBuf>,
        /// Tear everything back down once provisioning succeeds.
        #[arg(long)]
        and_clean: bool,
    },

    /// Attach an existing image (if needed) and mount its first partition.
    Mount {
        /// Backing image file.
        file: PathBuf,
        /// Mountpoint for the image's filesystem.
        #[arg(long, default_value = DEFAULT_TARGET)]
        target: PathBuf,
        /// Service data directory to bind the image's data/ onto.
        #[arg(long, requires = "logs")]
        data: Option<PathBuf>,
        /// Service log directory to bind the image's logs/ onto.
        #[arg(long, requires = "data")]
        logs: Option<PathBuf>,
    },

    /// Bind an already-attached image's data/ and logs/ onto service directories.
    Setup {
        /// Backing image file.
        file: PathBuf,
        /// Service data directory.
        #[arg(long)]
        data: PathBuf,
        /// Service log directory.
        #[arg(long)]
        logs: PathBuf,
        /// Mountpoint to use when the partition is not mounted yet.
        #[arg(long, default_value = DEFAULT_TARGET)]
        target: PathBuf,
    },

    /// Unwind every mount and loop device built on an image.
    Clean {
        /// Backing image file.
        file: PathBuf,
        /// Also delete the backing file afterwards.
        #[arg(long)]
        destroy: bool,
    },

    /// Check that the required external utilities are installed.
    Preflight,
}
