// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn minimal_rsync_project_deserializes() {
    let raw = r#"{
        "name": "AlmaLinux",
        "rsync": {
            "stages": ["-a --delete"],
            "host": "rsync.repo.almalinux.org",
            "src": "almalinux",
            "dest": "/storage/almalinux",
            "syncs_per_day": 2
        }
    }"#;
    let project: Project = serde_json::from_str(raw).unwrap();
    assert_eq!(project.name, "AlmaLinux");
    assert_eq!(project.sync_style(), SyncStyle::Rsync);
    assert_eq!(project.syncs_per_day(), 2);
    assert!(!project.public_rsync);
    let rsync = project.rsync.unwrap();
    assert_eq!(rsync.user, "");
    assert_eq!(rsync.password_file, "");
}

#[test]
fn script_project_defaults() {
    let raw = r#"{
        "name": "CPAN",
        "script": {"command": "sync-cpan", "syncs_per_day": 1}
    }"#;
    let project: Project = serde_json::from_str(raw).unwrap();
    assert_eq!(project.sync_style(), SyncStyle::Script);
    let script = project.script.unwrap();
    assert!(script.arguments.is_empty());
    assert!(script.env.is_empty());
}

#[yare::parameterized(
    distributions = { "\"Distributions\"", Page::Distributions },
    software = { "\"Software\"", Page::Software },
    miscellaneous = { "\"Miscellaneous\"", Page::Miscellaneous },
)]
fn page_enum_matches_config_spelling(raw: &str, expected: Page) {
    let page: Page = serde_json::from_str(raw).unwrap();
    assert_eq!(page, expected);
}

#[test]
fn unknown_page_is_rejected() {
    assert!(serde_json::from_str::<Page>("\"Games\"").is_err());
}
