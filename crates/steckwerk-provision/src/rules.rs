// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// udev rule store.
//
// Brother-class devices are provisioned by writing one udev rule that
// binds a stable /dev/<subdir>/<name> symlink to the device's vendor id
// and serial number. The rules directory itself is the source of truth;
// nothing is cached between attach events.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};

use steckwerk_core::error::Result;
use steckwerk_core::types::{DeviceDescriptor, sanitize};

use crate::exec::{CommandRunner, ensure_no_quotes};

/// Writes and inspects the generated udev rules.
pub struct RuleStore {
    rules_dir: PathBuf,
    dev_subdir: String,
    dry_run: bool,
    runner: Arc<dyn CommandRunner>,
    command_timeout: Duration,
}

impl RuleStore {
    pub fn new(
        rules_dir: PathBuf,
        dev_subdir: String,
        dry_run: bool,
        runner: Arc<dyn CommandRunner>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            rules_dir,
            dev_subdir,
            dry_run,
            runner,
            command_timeout,
        }
    }

    /// The `SYMLINK+=` target, relative to `/dev`.
    pub fn symlink_target(&self, desc: &DeviceDescriptor) -> Result<String> {
        Ok(format!("{}/{}", self.dev_subdir, desc.slug()?))
    }

    /// Absolute stable device path the rule produces.
    pub fn device_path(&self, desc: &DeviceDescriptor) -> Result<String> {
        Ok(format!("/dev/{}", self.symlink_target(desc)?))
    }

    /// The rule file this descriptor lands in.
    pub fn rule_path(&self, desc: &DeviceDescriptor) -> Result<PathBuf> {
        Ok(self.rules_dir.join(format!("{}.rules", desc.slug()?)))
    }

    /// The one-line rule matching this device.
    ///
    /// The serial is embedded verbatim (it has to match udev's view of
    /// the attribute), so it is quote-guarded here before it can reach
    /// the rule text.
    pub fn rule_line(&self, desc: &DeviceDescriptor) -> Result<String> {
        let serial = desc.require_serial()?;
        ensure_no_quotes("serial", serial)?;
        Ok(format!(
            r#"SUBSYSTEM=="usbmisc", ATTRS{{idVendor}}=="{}", ATTRS{{serial}}=="{}", SYMLINK+="{}""#,
            desc.vendor_id.hex(),
            serial,
            self.symlink_target(desc)?
        ))
    }

    /// Whether some rule file already matches this device's vendor id and
    /// serial.
    ///
    /// Scans files named `<sanitized-manufacturer>-*.rules`; within them,
    /// any non-blank line containing both attribute matches counts,
    /// regardless of other attributes or spacing on the line.
    #[instrument(skip_all, fields(device = %desc.display_name()))]
    pub fn is_rule_installed(&self, desc: &DeviceDescriptor) -> Result<bool> {
        let serial = desc.require_serial()?;
        let vendor_needle = format!(r#"ATTRS{{idVendor}}=="{}""#, desc.vendor_id.hex());
        let serial_needle = format!(r#"ATTRS{{serial}}=="{}""#, serial);
        let prefix = format!("{}-", sanitize(&desc.manufacturer));

        for entry in fs::read_dir(&self.rules_dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !matches_rule_file(name, &prefix) {
                continue;
            }
            let text = fs::read_to_string(entry.path())?;
            for line in text.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.contains(&vendor_needle) && line.contains(&serial_needle) {
                    debug!(file = name, "matching rule found");
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Append the rule (preceded by a blank line) to the device's rule
    /// file, then trigger a udev rescan so the symlink appears without
    /// replugging.
    ///
    /// Idempotency lives in the caller: check `is_rule_installed` first.
    #[instrument(skip_all, fields(device = %desc.display_name()))]
    pub async fn install_rule(&self, desc: &DeviceDescriptor) -> Result<()> {
        let line = self.rule_line(desc)?;
        let path = self.rule_path(desc)?;

        if self.dry_run {
            info!(path = %path.display(), rule = %line, "dry-run: would write udev rule");
            return Ok(());
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        write!(file, "\n{line}\n")?;
        info!(path = %path.display(), "udev rule written");

        self.runner
            .run_ok("udevadm", &["trigger"], self.command_timeout)
            .await?;
        debug!("udev rules reloaded");
        Ok(())
    }
}

/// Filename filter for the installed-rule scan:
/// `<prefix><non-empty>.rules`.
fn matches_rule_file(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(".rules"))
        .is_some_and(|middle| !middle.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use steckwerk_core::SteckwerkError;
    use steckwerk_core::types::VendorId;
    use tempfile::TempDir;

    use super::*;
    use crate::exec::testing::ScriptedRunner;

    fn brother(serial: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            manufacturer: "Brother".into(),
            model: "QL-570".into(),
            vendor_id: VendorId(0x04f9),
            product_id: 0x2028,
            serial: Some(serial.into()),
        }
    }

    fn store(dir: &TempDir, runner: Arc<ScriptedRunner>, dry_run: bool) -> RuleStore {
        RuleStore::new(
            dir.path().to_path_buf(),
            "printers".into(),
            dry_run,
            runner,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn rule_line_has_the_expected_shape() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, Arc::new(ScriptedRunner::new()), false);
        let line = store.rule_line(&brother("B3Z595204")).unwrap();
        assert_eq!(
            line,
            r#"SUBSYSTEM=="usbmisc", ATTRS{idVendor}=="04f9", ATTRS{serial}=="B3Z595204", SYMLINK+="printers/Brother-QL-570-B3Z595204""#
        );
    }

    #[test]
    fn quoted_serial_is_rejected_before_any_write() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, Arc::new(ScriptedRunner::new()), false);
        let err = store.rule_line(&brother(r#"B3Z"595204"#)).unwrap_err();
        assert!(matches!(err, SteckwerkError::UnsafeInput { .. }));
    }

    #[test]
    fn detection_tolerates_extra_attributes_and_spacing() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("Brother-old-box.rules"),
            concat!(
                "# provisioned 2026-02-11\n",
                "\n",
                "SUBSYSTEM==\"usbmisc\",   ATTRS{idVendor}==\"04f9\", ATTRS{idProduct}==\"2028\", ",
                "ATTRS{serial}==\"B3Z595204\", MODE=\"0666\", SYMLINK+=\"printers/old\"\n",
            ),
        )
        .unwrap();
        let store = store(&dir, Arc::new(ScriptedRunner::new()), false);

        assert!(store.is_rule_installed(&brother("B3Z595204")).unwrap());
        assert!(!store.is_rule_installed(&brother("OTHER123")).unwrap());
    }

    #[test]
    fn detection_only_scans_this_manufacturers_files() {
        let dir = TempDir::new().unwrap();
        let line = "SUBSYSTEM==\"usbmisc\", ATTRS{idVendor}==\"04f9\", ATTRS{serial}==\"B3Z595204\", SYMLINK+=\"printers/x\"\n";
        // Right content, wrong manufacturer prefix.
        fs::write(dir.path().join("Zebra-thing.rules"), line).unwrap();
        // Prefix with empty middle part is not a generated rule file.
        fs::write(dir.path().join("Brother-.rules"), line).unwrap();
        let store = store(&dir, Arc::new(ScriptedRunner::new()), false);

        assert!(!store.is_rule_installed(&brother("B3Z595204")).unwrap());
    }

    #[tokio::test]
    async fn install_appends_rule_and_triggers_rescan() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(ScriptedRunner::new().on("udevadm", 0, "", ""));
        let store = store(&dir, Arc::clone(&runner), false);
        let desc = brother("B3Z595204");

        store.install_rule(&desc).await.unwrap();

        let text = fs::read_to_string(store.rule_path(&desc).unwrap()).unwrap();
        assert_eq!(text, format!("\n{}\n", store.rule_line(&desc).unwrap()));
        assert_eq!(runner.calls(), vec![("udevadm".to_string(), vec!["trigger".to_string()])]);

        // A rule written through this store is found by the scan.
        assert!(store.is_rule_installed(&desc).unwrap());
    }

    #[tokio::test]
    async fn dry_run_writes_nothing_and_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let store = store(&dir, Arc::clone(&runner), true);

        store.install_rule(&brother("B3Z595204")).await.unwrap();

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn missing_serial_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, Arc::new(ScriptedRunner::new()), false);
        let mut desc = brother("x");
        desc.serial = None;
        assert!(matches!(
            store.is_rule_installed(&desc),
            Err(SteckwerkError::MissingSerial(_))
        ));
    }
}
