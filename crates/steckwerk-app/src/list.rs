// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One-shot listing of what is provisioned right now: stable device
// paths under /dev, and spooler printers whose URI is backed by a
// currently connected USB device.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use steckwerk_core::config::ProvisionConfig;
use steckwerk_core::error::Result;
use steckwerk_core::types::PrinterRecord;
use steckwerk_provision::exec::SystemRunner;
use steckwerk_provision::spooler::Spooler;

use crate::cli::ListArgs;

pub async fn run(args: ListArgs) -> Result<()> {
    let config: ProvisionConfig = match &args.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => ProvisionConfig::default(),
    };

    let dev_dir = Path::new("/dev").join(&config.dev_subdir);
    for path in device_paths(&dev_dir)? {
        println!("{}", path.display());
    }

    let spooler = Spooler::new(
        Arc::new(SystemRunner),
        config.command_timeout(),
        config.driver_list_timeout(),
        false,
    );
    let installed = spooler.installed_printers().await?;
    let connected = spooler.connected_usb_uris().await?;
    for record in active_printers(installed, &connected) {
        println!("{}: {}", record.name, record.uri);
    }
    Ok(())
}

/// Stable symlinks currently present. A missing directory just means
/// nothing has been provisioned on this host yet.
fn device_paths(dev_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dev_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut paths = Vec::new();
    for entry in entries {
        paths.push(entry?.path());
    }
    paths.sort();
    Ok(paths)
}

/// Installed printers whose URI exactly equals a connected usb:// URI.
/// Printers registered under file: URIs are covered by the /dev
/// listing instead.
fn active_printers(installed: Vec<PrinterRecord>, connected: &[String]) -> Vec<PrinterRecord> {
    installed
        .into_iter()
        .filter(|record| connected.contains(&record.uri))
        .collect()
}
