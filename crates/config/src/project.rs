// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project definitions from the mirrors file.

use serde::{Deserialize, Serialize};

/// One mirrored upstream.
///
/// The short name is the key in the mirrors map; `short` and `id` are
/// filled in during post-processing rather than read from the file. The
/// sync style is inferred from which of the mutually-exclusive `rsync`,
/// `script`, and `static` objects is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(skip)]
    pub short: String,
    /// Dense byte identifier for the compact map protocol.
    #[serde(skip)]
    pub id: u8,

    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub official: bool,
    #[serde(default)]
    pub page: Option<Page>,
    #[serde(default)]
    pub homepage: String,
    #[serde(default, rename = "publicRsync")]
    pub public_rsync: bool,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub alternative: String,

    #[serde(default)]
    pub rsync: Option<Rsync>,
    #[serde(default)]
    pub script: Option<Script>,
    #[serde(default, rename = "static")]
    pub static_: Option<Static>,
}

impl Project {
    /// Which of the three sync styles this project declares.
    ///
    /// Only meaningful after [`validate`](crate::MirrorsFile::validate) has
    /// confirmed the styles are mutually exclusive.
    pub fn sync_style(&self) -> SyncStyle {
        if self.rsync.is_some() {
            SyncStyle::Rsync
        } else if self.static_.is_some() {
            SyncStyle::Static
        } else {
            SyncStyle::Script
        }
    }

    /// How many times per day this project is synced (0 for static).
    pub fn syncs_per_day(&self) -> u32 {
        match (&self.rsync, &self.script) {
            (Some(rsync), _) => rsync.syncs_per_day,
            (None, Some(script)) => script.syncs_per_day,
            (None, None) => 0,
        }
    }
}

/// Page a project is grouped under in the public UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Page {
    Distributions,
    Software,
    Miscellaneous,
}

/// Sync style, inferred from the config shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStyle {
    Rsync,
    Script,
    Static,
}

/// A project synced by invoking rsync, possibly in several stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rsync {
    /// One argument string per stage, run sequentially.
    pub stages: Vec<String>,
    #[serde(default)]
    pub user: String,
    pub host: String,
    pub src: String,
    pub dest: String,
    pub syncs_per_day: u32,
    #[serde(default)]
    pub password_file: String,
}

/// A project synced by running a configured command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub env: std::collections::HashMap<String, String>,
    pub command: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub syncs_per_day: u32,
}

/// A project that is never synced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Static {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
