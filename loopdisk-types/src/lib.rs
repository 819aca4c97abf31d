// SPDX-License-Identifier: GPL-3.0-only

//! Shared data models for loopdisk
//!
//! These types are the canonical records decoded from the JSON output of the
//! external device-management utilities (lsblk, losetup, findmnt). They are
//! queried fresh on every call and never cached; nothing here owns kernel
//! state.

pub mod block;
pub mod common;
pub mod count;
pub mod fs;
pub mod loopdev;
pub mod mount;

mod de;

pub use block::BlockDevice;
pub use common::{non_empty_trimmed, normalize_label};
pub use count::DeviceCount;
pub use fs::{FsType, TableKind};
pub use loopdev::LoopDevice;
pub use mount::{MountEntry, MountMode};
