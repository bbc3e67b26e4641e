// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watch mode: provision everything already attached, then follow the
// hotplug feed until ctrl-c.

use std::fs;
use std::sync::Arc;

use tracing::{error, info, warn};

use steckwerk_core::catalog::Catalog;
use steckwerk_core::config::ProvisionConfig;
use steckwerk_core::error::{Result, SteckwerkError};
use steckwerk_core::types::DeviceDescriptor;
use steckwerk_hotplug::{connected_devices, HotplugMonitor};
use steckwerk_provision::exec::SystemRunner;
use steckwerk_provision::install::{Installer, Outcome};

use crate::checks;
use crate::cli::WatchArgs;

pub async fn run(args: WatchArgs) -> Result<()> {
    let config = load_config(&args)?;
    let catalog = load_catalog(&args)?;

    checks::warn_if_file_device_disabled(&config);
    if config.dry_run {
        info!("dry-run mode: no files will be written, no commands run");
    } else {
        checks::require_root(&config)?;
    }

    let installer = Installer::new(&config, catalog, Arc::new(SystemRunner));

    // Listen before scanning. A printer plugged in mid-scan then shows
    // up in the snapshot, the feed, or both; provisioning converges on
    // "already installed" either way.
    let mut monitor = HotplugMonitor::spawn().await?;

    info!("checking for already connected printers");
    for desc in connected_devices()? {
        provision_one(&installer, &desc).await;
    }

    info!("waiting for new printers to be plugged in");
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            attached = monitor.recv() => match attached {
                Some(desc) => provision_one(&installer, &desc).await,
                None => {
                    return Err(SteckwerkError::Monitor(
                        "attach event feed ended unexpectedly".into(),
                    ));
                }
            },
        }
    }
    info!("shutting down");
    monitor.stop();
    Ok(())
}

/// One device, one outcome. Failures are logged and the loop moves on;
/// only startup preconditions abort the daemon.
async fn provision_one(installer: &Installer, desc: &DeviceDescriptor) {
    match installer.provision(desc).await {
        Ok(Outcome::Unsupported) => {}
        Ok(Outcome::AlreadyInstalled) => {
            info!(device = %desc.display_name(), "printer was already installed");
        }
        Ok(Outcome::Installed(report)) => {
            info!(
                device = %desc.display_name(),
                name = %report.name,
                destination = %report.destination,
                driver = report.driver.as_deref(),
                dry_run = report.dry_run,
                "printer installed"
            );
        }
        Err(e) if e.is_transient() => {
            warn!(
                device = %desc.display_name(),
                error = %e,
                "cannot provision yet, will retry on the next attach event"
            );
        }
        Err(e) => {
            error!(device = %desc.display_name(), error = %e, "installing printer failed");
        }
    }
}

fn load_config(args: &WatchArgs) -> Result<ProvisionConfig> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => ProvisionConfig::default(),
    };
    if let Some(dir) = &args.rules_dir {
        config.rules_dir = dir.clone();
    }
    if let Some(subdir) = &args.dev_subdir {
        config.dev_subdir = subdir.clone();
    }
    // boolean flags only ever switch a mode on; the config file can
    // still enable it on its own
    config.dry_run |= args.dry_run;
    config.use_usb_uri |= args.use_usb_uri;
    config.fix_manual_copies |= args.fix_manual_copies;
    Ok(config)
}

fn load_catalog(args: &WatchArgs) -> Result<Catalog> {
    let mut catalog = Catalog::builtin();
    if let Some(path) = &args.devices {
        catalog.merge_json(&fs::read_to_string(path)?)?;
        info!(
            path = %path.display(),
            vendors = catalog.vendor_count(),
            "device catalog extended"
        );
    }
    Ok(catalog)
}
