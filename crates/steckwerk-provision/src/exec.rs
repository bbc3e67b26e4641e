// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External command execution.
//
// Every interaction with udev and CUPS goes through a handful of
// binaries (udevadm, lpstat, lpinfo, lpadmin, cupsenable, cupsaccept).
// This module is the single seam for invoking them: argv-based spawn,
// captured output, bounded timeout. Nothing ever passes through a shell.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use steckwerk_core::error::{Result, SteckwerkError};

/// Captured result of one external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code; -1 when the process was killed by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Seam for invoking external binaries.
///
/// Implementations must bound each invocation with the given timeout
/// and report expiry as `CommandTimeout`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str], timeout: Duration) -> Result<CommandOutput>;

    /// Run and require exit status 0; anything else becomes
    /// `CommandFailed` carrying the captured stderr.
    async fn run_ok(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let output = self.run(program, args, timeout).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(SteckwerkError::CommandFailed {
                program: program.to_string(),
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Runner that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str], timeout: Duration) -> Result<CommandOutput> {
        debug!(program, ?args, "running command");

        let output = tokio::time::timeout(
            timeout,
            Command::new(program)
                .args(args)
                // expiry drops this future; the child must die with it
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| SteckwerkError::CommandTimeout {
            program: program.to_string(),
            secs: timeout.as_secs(),
        })?
        .map_err(|e| SteckwerkError::CommandLaunch {
            program: program.to_string(),
            source: e,
        })?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Reject values containing a double quote before they reach a command
/// argument or a udev rule line, where `"` would close the quoted
/// attribute.
pub fn ensure_no_quotes(field: &'static str, value: &str) -> Result<()> {
    if value.contains('"') {
        return Err(SteckwerkError::UnsafeInput {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
