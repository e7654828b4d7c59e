// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access tokens for the manual-sync endpoint.

use crate::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// Parsed `tokens.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Tokens {
    #[serde(default)]
    pub tokens: Vec<Token>,
}

/// One access credential.
///
/// A token may trigger manual syncs for the projects in its scope; an empty
/// project list means every project.
#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub name: String,
    pub token: String,
    #[serde(default)]
    pub projects: Vec<String>,
}

impl Tokens {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str(&raw)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Find the token entry matching the presented secret.
    pub fn get(&self, secret: &str) -> Option<&Token> {
        self.tokens.iter().find(|t| t.token == secret)
    }
}

impl Token {
    /// Whether this token may trigger a sync for `project`.
    pub fn allows(&self, project: &str) -> bool {
        self.projects.is_empty() || self.projects.iter().any(|p| p == project)
    }

    /// Whether this token's scope covers every project.
    pub fn allows_all(&self) -> bool {
        self.projects.is_empty()
    }
}

#[cfg(test)]
#[path = "tokens_tests.rs"]
mod tests;
