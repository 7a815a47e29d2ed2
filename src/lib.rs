//! A library for computing a stable load order for game plugin files from
//! masterlist/userlist metadata.
//!
//! Given the plugins installed for a supported game and the metadata
//! describing how they interact, this crate derives a load order that
//! respects master/non-master partitioning, declared dependencies, explicit
//! priorities and record-level conflicts, falling back to a deterministic
//! tie-break so that the result is a total order.

// Allow some lints that are denied at the workspace level.
#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::wildcard_enum_match_arm
)]
#![cfg_attr(
    test,
    allow(
        clippy::assertions_on_result_states,
        clippy::indexing_slicing,
        clippy::missing_asserts_for_indexing,
        clippy::panic,
        clippy::unwrap_used,
    )
)]

mod archive;
mod database;
pub mod error;
mod game;
mod logging;
pub mod metadata;
mod plugin;
mod sorting;
#[cfg(test)]
mod tests;
mod version;

use std::{path::Path, slice::EscapeAscii};

pub use database::{Database, WriteMode};
pub use game::{Game, GameType};
pub use logging::{LogLevel, set_log_level, set_logging_callback};
pub use plugin::Plugin;
pub use sorting::vertex::{EdgeType, Vertex};
pub use version::{VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH, build_revision, crate_version, is_compatible};

/// Compile a `fancy_regex::Regex`, boxing the error so that callers that
/// only care about classifying failures don't need to depend on the size of
/// `fancy_regex`'s own error type.
fn regex(value: &str) -> Result<fancy_regex::Regex, Box<fancy_regex::Error>> {
    fancy_regex::Regex::new(value).map_err(Into::into)
}

fn escape_ascii(path: &Path) -> EscapeAscii<'_> {
    path.as_os_str().as_encoded_bytes().escape_ascii()
}
