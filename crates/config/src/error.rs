// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Configuration loading and validation errors.
///
/// All of these are fatal at startup: the daemon refuses to run with a
/// config it cannot fully trust.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid mirrors file: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid tokens file: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("too many projects: {0} (max {max})", max = crate::MAX_PROJECTS)]
    TooManyProjects(usize),

    #[error("duplicate short name: {0}")]
    DuplicateShortName(String),

    #[error("duplicate long name: {0}")]
    DuplicateLongName(String),

    #[error("project {short}: {reason}")]
    InvalidProject { short: String, reason: String },
}
