// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Interrupt handling. The first SIGINT, SIGTERM, SIGHUP or SIGPIPE asks the
// scan to stop; the second one exits at once.

use std::io;
use std::sync::OnceLock;

use scanwerk_core::error::Result;
use scanwerk_scan::CancellationToken;
use tracing::debug;

/// Exit status after a forced stop.
const FORCED_EXIT: libc::c_int = 130;

static TOKEN: OnceLock<CancellationToken> = OnceLock::new();

extern "C" fn on_signal(_signal: libc::c_int) {
    if let Some(token) = TOKEN.get() {
        if token.interrupt() > 1 {
            // SAFETY: _exit is async-signal-safe and skips all cleanup.
            unsafe { libc::_exit(FORCED_EXIT) };
        }
    }
}

/// Route interrupts to `token`. Only the first token installed is used.
pub fn install(token: CancellationToken) -> Result<()> {
    if TOKEN.set(token).is_err() {
        debug!("interrupt handler already installed");
        return Ok(());
    }
    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    for signal in [libc::SIGINT, libc::SIGTERM, libc::SIGHUP, libc::SIGPIPE] {
        // SAFETY: the handler only touches atomics and calls _exit.
        if unsafe { libc::signal(signal, handler) } == libc::SIG_ERR {
            return Err(io::Error::last_os_error().into());
        }
    }
    debug!("interrupt handler installed");
    Ok(())
}
