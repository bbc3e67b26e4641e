// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Installation orchestration.
//
// One attach observation runs the whole pipeline: classify the device,
// check what is already provisioned, resolve whatever is missing, and
// install. The installed-state checks gate the writes, so seeing the
// same device twice (initial scan + hotplug, or replug) converges on
// "already installed" instead of stacking duplicates.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use steckwerk_core::catalog::Catalog;
use steckwerk_core::config::ProvisionConfig;
use steckwerk_core::error::{Result, SteckwerkError};
use steckwerk_core::types::{DeviceDescriptor, ProvisioningStrategy};

use crate::driver::find_driver;
use crate::exec::CommandRunner;
use crate::ppd::PpdPatcher;
use crate::rules::RuleStore;
use crate::spooler::Spooler;

/// What provisioning concluded for one attach observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not in the supported-device catalog; nothing was touched.
    Unsupported,
    /// The device's rule or spooler destination already exists.
    AlreadyInstalled,
    /// A fresh installation completed.
    Installed(InstallReport),
}

/// Details of a completed installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Deterministic printer/rule name derived from the descriptor.
    pub name: String,
    /// Where the device ended up: rule file path or registered URI.
    pub destination: String,
    /// Resolved driver identifier, for spooler registrations.
    pub driver: Option<String>,
    pub dry_run: bool,
}

/// Drives descriptors through classification and installation.
pub struct Installer {
    catalog: Catalog,
    rules: RuleStore,
    spooler: Spooler,
    ppd: PpdPatcher,
    use_usb_uri: bool,
    fix_manual_copies: bool,
    dry_run: bool,
}

impl Installer {
    pub fn new(config: &ProvisionConfig, catalog: Catalog, runner: Arc<dyn CommandRunner>) -> Self {
        let rules = RuleStore::new(
            config.rules_dir.clone(),
            config.dev_subdir.clone(),
            config.dry_run,
            Arc::clone(&runner),
            config.command_timeout(),
        );
        let spooler = Spooler::new(
            Arc::clone(&runner),
            config.command_timeout(),
            config.driver_list_timeout(),
            config.dry_run,
        );
        let ppd = PpdPatcher::new(
            config.ppd_dir.clone(),
            config.cups_reload_command.clone(),
            runner,
            config.command_timeout(),
            config.dry_run,
        );
        Self {
            catalog,
            rules,
            spooler,
            ppd,
            use_usb_uri: config.use_usb_uri,
            fix_manual_copies: config.fix_manual_copies,
            dry_run: config.dry_run,
        }
    }

    /// Provision one attached device, end to end.
    #[instrument(skip_all, fields(device = %desc.display_name()))]
    pub async fn provision(&self, desc: &DeviceDescriptor) -> Result<Outcome> {
        let Some(strategy) = self.catalog.classify(desc) else {
            debug!(
                vendor = %desc.vendor_id,
                product = desc.product_id,
                "not a supported printer"
            );
            return Ok(Outcome::Unsupported);
        };
        info!(?strategy, "supported printer attached");

        match strategy {
            ProvisioningStrategy::DeviceFileRule => self.provision_rule(desc).await,
            ProvisioningStrategy::SpoolerRegistration => self.provision_spooler(desc).await,
        }
    }

    /// Device-file path: the rule check gates the write, so a device
    /// seen twice ends up with exactly one rule line.
    async fn provision_rule(&self, desc: &DeviceDescriptor) -> Result<Outcome> {
        if self.rules.is_rule_installed(desc)? {
            info!("udev rule already present");
            return Ok(Outcome::AlreadyInstalled);
        }

        self.rules.install_rule(desc).await?;
        Ok(Outcome::Installed(InstallReport {
            name: desc.slug()?,
            destination: self.rules.rule_path(desc)?.display().to_string(),
            driver: None,
            dry_run: self.dry_run,
        }))
    }

    /// Spooler path: already-registered is decided by the destination
    /// URI, then the driver is resolved before anything is written.
    async fn provision_spooler(&self, desc: &DeviceDescriptor) -> Result<Outcome> {
        let name = desc.slug()?;
        let uri = if self.use_usb_uri {
            let serial = desc.require_serial()?;
            self.spooler
                .resolve_usb_uri(&desc.manufacturer, serial)
                .await?
        } else {
            format!("file:{}", self.rules.device_path(desc)?)
        };

        if self.spooler.is_registered(&uri).await? {
            info!(uri = %uri, "printer already registered");
            return Ok(Outcome::AlreadyInstalled);
        }

        let catalog_text = self.spooler.driver_catalog().await?;
        let Some(driver) = find_driver(&catalog_text, &desc.model) else {
            return Err(SteckwerkError::NoDriverFound {
                model: desc.model.clone(),
            });
        };
        debug!(driver = %driver, "driver resolved");

        // A file: destination points at the stable device node, so the
        // backing udev rule must exist before the queue does.
        if !self.use_usb_uri && !self.rules.is_rule_installed(desc)? {
            self.rules.install_rule(desc).await?;
        }

        self.spooler.register_printer(&name, &uri, &driver).await?;

        if self.fix_manual_copies {
            self.ppd.fix_manual_copies(&name).await?;
        }

        Ok(Outcome::Installed(InstallReport {
            name,
            destination: uri,
            driver: Some(driver),
            dry_run: self.dry_run,
        }))
    }
}
