// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Identification of the machine that produced a scan.

use std::ffi::CStr;

/// `uname` fields joined by spaces: system, node, release, version, machine.
pub fn host_computer() -> Option<String> {
    // SAFETY: `utsname` is plain data and `uname` only writes into it.
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } != 0 {
        tracing::debug!("uname failed, no host computer tag");
        return None;
    }

    let fields = [
        &uts.sysname[..],
        &uts.nodename[..],
        &uts.release[..],
        &uts.version[..],
        &uts.machine[..],
    ];
    let parts: Vec<String> = fields
        .iter()
        .map(|field| {
            // SAFETY: uname NUL-terminates every field within its array.
            unsafe { CStr::from_ptr(field.as_ptr()) }
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    Some(parts.join(" "))
}

/// Software tag value.
pub fn software() -> String {
    format!("scanwerk {}", env!("CARGO_PKG_VERSION"))
}
