// SPDX-License-Identifier: GPL-3.0-only

//! Device-lifecycle operations for loop-backed disk images
//!
//! This crate coordinates transient, externally-mutable kernel state (loop
//! devices, partitions, the mount table) with no persisted bookkeeping:
//! - attaching and detaching loop devices,
//! - diff-based discovery of freshly created partitions,
//! - recursive teardown of mount stacks,
//! - the "deep detach" reclamation of everything built on a backing file.
//!
//! Every device operation is mediated by an external utility (parted, mkfs,
//! mount, umount, lsblk, losetup, findmnt) invoked as an isolated,
//! synchronous command. There is no async runtime, no locking and no retry:
//! the design assumes a single mutator and each step only proceeds once the
//! previous step's result is known.

pub mod cmd;
pub mod error;
pub mod inventory;
pub mod loopback;
pub mod mount;
pub mod partition;

pub use error::{DiskError, Result};
