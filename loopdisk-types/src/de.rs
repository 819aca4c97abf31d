// SPDX-License-Identifier: GPL-3.0-only

//! Lenient scalar deserializers for util-linux JSON output.
//!
//! Depending on the util-linux version, lsblk and losetup emit sizes either
//! as JSON numbers or as digit strings, and flags either as booleans or as
//! "0"/"1" strings. Absent and malformed values both become `None` so that
//! missing columns are explicit rather than silent.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Number(u64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Number(u64),
    Text(String),
}

pub(crate) fn opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawScalar>::deserialize(deserializer)?;
    Ok(match raw {
        None => None,
        Some(RawScalar::Number(value)) => Some(value),
        Some(RawScalar::Text(value)) => value.trim().parse().ok(),
    })
}

pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawFlag>::deserialize(deserializer)?;
    Ok(match raw {
        None => false,
        Some(RawFlag::Bool(value)) => value,
        Some(RawFlag::Number(value)) => value != 0,
        Some(RawFlag::Text(value)) => {
            let value = value.trim();
            value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes")
        }
    })
}
