// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Provisioning configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Daemon settings. Loadable from a JSON file; CLI flags override
/// individual fields afterwards. Missing fields take their defaults,
/// so a config file only needs the fields it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Directory that receives generated udev rule files.
    pub rules_dir: PathBuf,
    /// Subdirectory of `/dev` that receives stable printer symlinks.
    pub dev_subdir: String,
    /// Directory where CUPS keeps the PPD of each registered printer.
    pub ppd_dir: PathBuf,
    /// CUPS server configuration, checked for `FileDevice Yes` when
    /// printers are registered under `file:` URIs.
    pub cups_files_conf: PathBuf,
    /// Command (argv form) that makes CUPS re-read a patched PPD.
    pub cups_reload_command: Vec<String>,
    /// Register printers under their live `usb://` URI instead of the
    /// stable `file:` device path.
    pub use_usb_uri: bool,
    /// Rewrite `*cupsManualCopies: False` to `True` after registration.
    pub fix_manual_copies: bool,
    /// Log every step but write no files and run no commands.
    pub dry_run: bool,
    /// Timeout for ordinary external commands, in seconds.
    pub command_timeout_secs: u64,
    /// Timeout for `lpinfo -m`, in seconds. Listing the full driver
    /// catalog is much slower than any other spooler command.
    pub driver_list_timeout_secs: u64,
}

impl ProvisionConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn driver_list_timeout(&self) -> Duration {
        Duration::from_secs(self.driver_list_timeout_secs)
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from("/etc/udev/rules.d"),
            dev_subdir: "printers".to_string(),
            ppd_dir: PathBuf::from("/etc/cups/ppd"),
            cups_files_conf: PathBuf::from("/etc/cups/cups-files.conf"),
            cups_reload_command: vec!["/etc/init.d/cups".to_string(), "reload".to_string()],
            use_usb_uri: false,
            fix_manual_copies: false,
            dry_run: false,
            command_timeout_secs: 30,
            driver_list_timeout_secs: 120,
        }
    }
}
