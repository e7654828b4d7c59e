// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::file::tests::SAMPLE;

#[test]
fn only_public_projects_get_stanzas() {
    let mirrors = MirrorsFile::from_str(SAMPLE).unwrap();
    let mut out = Vec::new();
    write_rsyncd_conf(&mut out, &mirrors).unwrap();
    let conf = String::from_utf8(out).unwrap();

    assert!(conf.starts_with("# This is a generated file."));
    assert!(conf.contains("[debian]"));
    assert!(conf.contains("\tcomment = Debian"));
    assert!(conf.contains("\tpath = /storage/debian"));
    assert!(!conf.contains("[blender]"));
    assert!(!conf.contains("[templeos]"));
}

#[test]
fn prelude_always_present() {
    let mirrors = MirrorsFile::from_str(r#"{"mirrors": {}}"#).unwrap();
    let mut out = Vec::new();
    write_rsyncd_conf(&mut out, &mirrors).unwrap();
    let conf = String::from_utf8(out).unwrap();
    assert!(conf.contains("refuse options = checksum delete"));
    assert!(!conf.contains('['));
}
