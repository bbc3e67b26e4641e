// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Startup preconditions and advisory configuration checks.

use std::fs;

use tracing::{debug, warn};

use steckwerk_core::config::ProvisionConfig;
use steckwerk_core::error::{Result, SteckwerkError};
use steckwerk_provision::spooler::file_device_enabled;

/// Provisioning writes under the rules directory and runs
/// `udevadm trigger`, so watch mode needs euid 0.
pub fn require_root(config: &ProvisionConfig) -> Result<()> {
    // SAFETY: geteuid takes no arguments and cannot fail
    let euid = unsafe { libc::geteuid() };
    if euid == 0 {
        return Ok(());
    }
    Err(SteckwerkError::NotRoot {
        rules_dir: config.rules_dir.display().to_string(),
    })
}

/// Printers registered under `file:` URIs silently refuse to print
/// unless CUPS has `FileDevice Yes`. Advisory only, never fatal.
pub fn warn_if_file_device_disabled(config: &ProvisionConfig) {
    if config.use_usb_uri {
        return;
    }
    debug!(
        path = %config.cups_files_conf.display(),
        "checking whether the FileDevice option is enabled"
    );
    match fs::read_to_string(&config.cups_files_conf) {
        Ok(text) if file_device_enabled(&text) => {
            debug!("FileDevice option is enabled");
        }
        Ok(_) => warn!(
            path = %config.cups_files_conf.display(),
            "the FileDevice option is not enabled; printers registered under \
             file: URIs will not print until it is"
        ),
        Err(e) => warn!(
            path = %config.cups_files_conf.display(),
            error = %e,
            "cannot read the CUPS server configuration, so the FileDevice \
             option cannot be verified"
        ),
    }
}
