// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generation of the public rsync daemon configuration.

use crate::MirrorsFile;
use std::io::{self, Write};

const PRELUDE: &str = "\
# This is a generated file. Do not edit manually.
uid = nobody
gid = nogroup
use chroot = yes
max connections = 0
pid file = /var/run/rsyncd.pid
motd file = /etc/rsyncd.motd
log file = /var/log/rsyncd.log
log format = %t %o %a %m %f %b
dont compress = *.gz *.tgz *.zip *.z *.Z *.rpm *.deb *.bz2 *.tbz2 *.xz *.txz *.rar
refuse options = checksum delete
";

/// Write an rsyncd.conf with one module stanza per publicly-served project.
pub fn write_rsyncd_conf<W: Write>(w: &mut W, mirrors: &MirrorsFile) -> io::Result<()> {
    w.write_all(PRELUDE.as_bytes())?;

    for project in mirrors.projects().filter(|p| p.public_rsync) {
        writeln!(w)?;
        writeln!(w, "[{}]", project.short)?;
        writeln!(w, "\tcomment = {}", project.name)?;
        writeln!(w, "\tpath = /storage/{}", project.short)?;
        writeln!(w, "\texclude = lost+found/")?;
        writeln!(w, "\tread only = true")?;
        writeln!(w, "\tignore nonreadable = yes")?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "rsyncd_tests.rs"]
mod tests;
