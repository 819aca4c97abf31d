// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Failure taxonomy for device-lifecycle operations.
#[derive(Debug, Error)]
pub enum DiskError {
    /// An external utility exited non-zero.
    #[error("command failed: {command} (exit code {code})")]
    Execution { command: String, code: i32 },

    /// Structured tool output was missing or failed to decode.
    #[error("unreadable {tool} output: {reason}")]
    Parse { tool: String, reason: String },

    /// The partition delta after a single creation was not exactly one.
    #[error(
        "expected exactly one new partition on {device}: {before} before, {after} after creation"
    )]
    PartitionDelta {
        device: String,
        before: usize,
        after: usize,
    },

    /// An expected unique resource was absent, multiply present, or occupied.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Some, but not all, mounts traced to a device could be unwound.
    #[error("unmounted {done} of {total} mounts traced to {device}")]
    PartialUnmount {
        device: String,
        done: usize,
        total: usize,
    },

    /// Some, but not all, loop devices backed by a file could be reclaimed.
    #[error("detached {done} of {total} loop devices backed by {file}")]
    PartialDetach {
        file: String,
        done: usize,
        total: usize,
    },
}

/// Result type alias for device-lifecycle operations.
pub type Result<T> = std::result::Result<T, DiskError>;
