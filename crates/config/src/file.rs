// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The mirrors file: the full project table plus tracked subnets.

use crate::{ConfigError, Page, Project, SyncStyle};
use ipnetwork::IpNetwork;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::warn;

/// Upper bound on the project table: ids must fit in one byte.
pub const MAX_PROJECTS: usize = 256;

/// Parsed `mirrors.json`.
///
/// Unrecognised top-level keys (torrent scrape targets, UI hints) belong to
/// external collaborators and are ignored here.
#[derive(Debug, Deserialize)]
pub struct MirrorsFile {
    #[serde(default, rename = "$schema")]
    pub schema: String,
    /// Named groups of CIDRs whose traffic is measured separately.
    #[serde(default)]
    pub subnets: HashMap<String, Vec<String>>,
    /// Short name -> project. BTreeMap so iteration (and therefore id
    /// assignment) is deterministic in short-name order.
    pub mirrors: BTreeMap<String, Project>,
}

impl MirrorsFile {
    /// Load and validate the mirrors file.
    ///
    /// Any validation failure is fatal: the caller is expected to exit.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str(&raw)
    }

    /// Parse and validate from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(raw: &str) -> Result<Self, ConfigError> {
        let mut file: MirrorsFile = serde_json::from_str(raw)?;
        file.assign_ids()?;
        file.validate()?;
        Ok(file)
    }

    /// Fill in each project's short name and dense byte id.
    fn assign_ids(&mut self) -> Result<(), ConfigError> {
        if self.mirrors.len() > MAX_PROJECTS {
            return Err(ConfigError::TooManyProjects(self.mirrors.len()));
        }
        for (i, (short, project)) in self.mirrors.iter_mut().enumerate() {
            project.short = short.clone();
            project.id = i as u8;
        }
        Ok(())
    }

    /// Check the table invariants.
    ///
    /// - short names unique case-insensitively
    /// - long names unique case-insensitively
    /// - exactly one sync style declared per project
    /// - a positive syncs-per-day only on non-static projects
    /// - rsync projects declare at least one stage
    fn validate(&self) -> Result<(), ConfigError> {
        let mut shorts = HashSet::new();
        let mut longs = HashSet::new();

        for (short, project) in &self.mirrors {
            if !shorts.insert(short.to_lowercase()) {
                return Err(ConfigError::DuplicateShortName(short.clone()));
            }
            if !longs.insert(project.name.to_lowercase()) {
                return Err(ConfigError::DuplicateLongName(project.name.clone()));
            }

            let declared = [
                project.rsync.is_some(),
                project.script.is_some(),
                project.static_.is_some(),
            ]
            .iter()
            .filter(|&&present| present)
            .count();
            if declared != 1 {
                return Err(ConfigError::InvalidProject {
                    short: short.clone(),
                    reason: format!(
                        "expected exactly one of rsync/script/static, found {declared}"
                    ),
                });
            }

            if project.sync_style() == SyncStyle::Static && project.syncs_per_day() > 0 {
                return Err(ConfigError::InvalidProject {
                    short: short.clone(),
                    reason: "static projects cannot have syncs_per_day".to_string(),
                });
            }

            if let Some(rsync) = &project.rsync {
                if rsync.stages.is_empty() {
                    return Err(ConfigError::InvalidProject {
                        short: short.clone(),
                        reason: "rsync project has no stages".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Look up a project by short name, case-insensitively.
    pub fn get(&self, short: &str) -> Option<&Project> {
        self.mirrors.get(short).or_else(|| {
            self.mirrors
                .values()
                .find(|p| p.short.eq_ignore_ascii_case(short))
        })
    }

    /// All projects in short-name order.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.mirrors.values()
    }

    /// Projects grouped under the given page, in short-name order.
    pub fn by_page(&self, page: Page) -> Vec<&Project> {
        self.mirrors
            .values()
            .filter(|p| p.page == Some(page))
            .collect()
    }

    /// Parse the configured subnet groups.
    ///
    /// Invalid CIDRs are skipped with a warning rather than failing startup;
    /// groups left with no valid subnet are dropped entirely.
    pub fn parsed_subnets(&self) -> HashMap<String, Vec<IpNetwork>> {
        let mut out = HashMap::new();
        for (name, cidrs) in &self.subnets {
            let mut networks = Vec::new();
            for cidr in cidrs {
                match cidr.parse::<IpNetwork>() {
                    Ok(network) => networks.push(network),
                    Err(e) => warn!(subnet = %name, %cidr, error = %e, "skipping invalid subnet"),
                }
            }
            if networks.is_empty() {
                warn!(subnet = %name, "no valid subnets in group, dropping");
                continue;
            }
            out.insert(name.clone(), networks);
        }
        out
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
pub(crate) mod tests;
