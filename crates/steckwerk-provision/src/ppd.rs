// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PPD post-install patching.
//
// Some label printer drivers ship with `*cupsManualCopies: False`,
// which makes CUPS collapse multi-copy jobs into a single label. The
// optional fix rewrites the flag to `True` in the registered printer's
// PPD and tells CUPS to re-read it.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, instrument};

use steckwerk_core::error::Result;

use crate::exec::CommandRunner;

/// The line the patch looks for. `\s*$` also swallows a stray `\r`.
static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\*cupsManualCopies:\s*False\s*$").expect("manual copies pattern")
});

const REPLACEMENT: &str = "*cupsManualCopies: True";

/// Rewrites the manual-copies flag in registered printers' PPDs.
pub struct PpdPatcher {
    ppd_dir: PathBuf,
    reload_command: Vec<String>,
    runner: Arc<dyn CommandRunner>,
    command_timeout: Duration,
    dry_run: bool,
}

impl PpdPatcher {
    pub fn new(
        ppd_dir: PathBuf,
        reload_command: Vec<String>,
        runner: Arc<dyn CommandRunner>,
        command_timeout: Duration,
        dry_run: bool,
    ) -> Self {
        Self {
            ppd_dir,
            reload_command,
            runner,
            command_timeout,
            dry_run,
        }
    }

    /// Patch `<ppd_dir>/<printer_name>.ppd` and reload the spooler.
    ///
    /// Returns whether a rewrite happened. Only the first marker line is
    /// rewritten; a PPD without the marker is left untouched and no
    /// reload runs.
    #[instrument(skip(self))]
    pub async fn fix_manual_copies(&self, printer_name: &str) -> Result<bool> {
        let path = self.ppd_dir.join(format!("{printer_name}.ppd"));

        if self.dry_run {
            info!(path = %path.display(), "dry-run: would patch manual-copies flag");
            return Ok(true);
        }

        let text = fs::read_to_string(&path)?;

        let mut patched = false;
        let lines: Vec<&str> = text
            .lines()
            .map(|line| {
                if !patched && MARKER.is_match(line) {
                    patched = true;
                    REPLACEMENT
                } else {
                    line
                }
            })
            .collect();

        if !patched {
            debug!(path = %path.display(), "no manual-copies marker in PPD");
            return Ok(false);
        }

        let mut output = lines.join("\n");
        if text.ends_with('\n') {
            output.push('\n');
        }
        fs::write(&path, output)?;
        info!(path = %path.display(), "manual-copies flag patched");

        if let Some((program, args)) = self.reload_command.split_first() {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            self.runner
                .run_ok(program, &args, self.command_timeout)
                .await?;
            debug!("spooler reloaded");
        }
        Ok(true)
    }
}
