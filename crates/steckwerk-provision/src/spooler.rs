// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CUPS spooler inspection and registration.
//
// Dymo-class devices are provisioned as spooler destinations: look up
// what CUPS already knows (`lpstat -v`), what it can currently see on
// USB (`lpinfo -v`), then register (`lpadmin`) and activate
// (`cupsenable` + `cupsaccept`). All state lives in CUPS; every
// question is answered by asking it again.

use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, instrument};

use steckwerk_core::error::{Result, SteckwerkError};
use steckwerk_core::types::PrinterRecord;

use crate::exec::{CommandRunner, ensure_no_quotes};

/// `lpstat -v` destination lines: `device for <name>: <uri>`.
static PRINTER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)device\s+for\s+([^:]+):\s+(\S+)").expect("printer line pattern")
});

/// `usb://...` tokens in `lpinfo -v` output.
static USB_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"usb://\S+").expect("usb uri pattern"));

/// `FileDevice Yes` directive in cups-files.conf. Anchored; the lines
/// it is tested against already have leading whitespace stripped.
static FILE_DEVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^FileDevice\s+Yes").expect("file device pattern"));

/// Asks and instructs the CUPS spooler through its command surface.
pub struct Spooler {
    runner: Arc<dyn CommandRunner>,
    command_timeout: Duration,
    driver_list_timeout: Duration,
    dry_run: bool,
}

impl Spooler {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        command_timeout: Duration,
        driver_list_timeout: Duration,
        dry_run: bool,
    ) -> Self {
        Self {
            runner,
            command_timeout,
            driver_list_timeout,
            dry_run,
        }
    }

    /// Raw `lpstat -v` output. CUPS exits 1 with "No destinations added"
    /// when the spooler is empty; that is an empty list, not a failure.
    async fn lpstat_output(&self) -> Result<String> {
        let out = self
            .runner
            .run("lpstat", &["-v"], self.command_timeout)
            .await?;
        if !out.success() {
            if out.stderr.contains("No destinations") || out.stdout.contains("No destinations") {
                return Ok(String::new());
            }
            return Err(SteckwerkError::CommandFailed {
                program: "lpstat".to_string(),
                status: out.status,
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(out.stdout)
    }

    /// Destinations CUPS currently has configured.
    pub async fn installed_printers(&self) -> Result<Vec<PrinterRecord>> {
        Ok(parse_printers(&self.lpstat_output().await?))
    }

    /// Whether any `lpstat -v` line contains `uri`. A loose substring
    /// test by contract; it works for `file:` and `usb://` URIs alike.
    pub async fn is_registered(&self, uri: &str) -> Result<bool> {
        let text = self.lpstat_output().await?;
        Ok(text.lines().any(|line| line.contains(uri)))
    }

    /// Every USB device URI the spooler backend can currently see.
    pub async fn connected_usb_uris(&self) -> Result<Vec<String>> {
        let out = self
            .runner
            .run_ok("lpinfo", &["-v"], self.command_timeout)
            .await?;
        Ok(extract_usb_uris(&out.stdout))
    }

    /// Find the live `usb://` URI for a manufacturer + serial.
    ///
    /// A freshly attached device takes a moment to show up in the
    /// backend scan; absence is the transient `NotDetected`, not an
    /// installation failure.
    #[instrument(skip(self))]
    pub async fn resolve_usb_uri(&self, manufacturer: &str, serial: &str) -> Result<String> {
        let out = self
            .runner
            .run_ok("lpinfo", &["-v"], self.command_timeout)
            .await?;

        let pattern = format!(
            r"(?i)usb://{}.+serial={}",
            regex::escape(manufacturer),
            regex::escape(serial)
        );
        let re = Regex::new(&pattern)
            .map_err(|e| SteckwerkError::Spooler(format!("uri pattern: {e}")))?;

        for line in out.stdout.lines() {
            if re.is_match(line) {
                if let Some(m) = USB_URI.find(line) {
                    debug!(uri = m.as_str(), "device uri resolved");
                    return Ok(m.as_str().to_string());
                }
            }
        }
        Err(SteckwerkError::NotDetected {
            manufacturer: manufacturer.to_string(),
            serial: serial.to_string(),
        })
    }

    /// Raw `lpinfo -m` output. The spooler assembles its entire driver
    /// catalog for this, which is far slower than any other command
    /// here; it gets its own timeout.
    pub async fn driver_catalog(&self) -> Result<String> {
        let out = self
            .runner
            .run_ok("lpinfo", &["-m"], self.driver_list_timeout)
            .await?;
        Ok(out.stdout)
    }

    /// Register a destination and activate it.
    ///
    /// `driver_stem` is the catalog identifier without the `.ppd`
    /// suffix, as produced by driver resolution.
    #[instrument(skip(self))]
    pub async fn register_printer(&self, name: &str, uri: &str, driver_stem: &str) -> Result<()> {
        ensure_no_quotes("printer name", name)?;
        ensure_no_quotes("uri", uri)?;
        ensure_no_quotes("driver", driver_stem)?;
        let model = format!("{driver_stem}.ppd");

        if self.dry_run {
            info!(name, uri, driver = %model, "dry-run: would register printer");
            return Ok(());
        }

        self.runner
            .run_ok(
                "lpadmin",
                &["-p", name, "-E", "-v", uri, "-m", &model],
                self.command_timeout,
            )
            .await?;
        info!(name, uri, driver = %model, "printer registered");

        self.activate(name).await
    }

    /// Enable the destination and make it accept jobs. Both commands are
    /// always attempted; the first failure is reported after both ran.
    async fn activate(&self, name: &str) -> Result<()> {
        let enable = self
            .runner
            .run_ok("cupsenable", &[name], self.command_timeout)
            .await;
        let accept = self
            .runner
            .run_ok("cupsaccept", &[name], self.command_timeout)
            .await;
        enable.and(accept).map(|_| ())
    }
}

/// Parse `lpstat -v` text into printer records.
pub fn parse_printers(text: &str) -> Vec<PrinterRecord> {
    text.lines()
        .filter_map(|line| {
            let caps = PRINTER_LINE.captures(line)?;
            Some(PrinterRecord {
                name: caps.get(1)?.as_str().trim().to_string(),
                uri: caps.get(2)?.as_str().to_string(),
            })
        })
        .collect()
}

/// Every `usb://...` token in `lpinfo -v` text.
pub fn extract_usb_uris(text: &str) -> Vec<String> {
    USB_URI
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Whether a cups-files.conf document enables `FileDevice`. Lines
/// starting with `#` are comments.
pub fn file_device_enabled(conf: &str) -> bool {
    conf.lines()
        .map(str::trim_start)
        .filter(|line| !line.starts_with('#'))
        .any(|line| FILE_DEVICE.is_match(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedRunner;

    const LPSTAT: &str = "\
device for QL570: usb://Brother/QL-570?serial=B3Z595204
device for Dymo-LabelWriter_450-01010112345600: file:/dev/printers/Dymo-LabelWriter_450-01010112345600
system default destination: QL570
";

    const LPINFO_V: &str = "\
network socket
network ipp
direct usb://DYMO/LabelWriter%20450?serial=01010112345600 \"DYMO LabelWriter 450\"
direct usb://Brother/QL-570?serial=B3Z595204
";

    fn spooler(runner: Arc<ScriptedRunner>) -> Spooler {
        Spooler::new(
            runner,
            Duration::from_secs(5),
            Duration::from_secs(10),
            false,
        )
    }

    #[test]
    fn parse_printers_reads_destination_lines_only() {
        let printers = parse_printers(LPSTAT);
        assert_eq!(printers.len(), 2);
        assert_eq!(printers[0].name, "QL570");
        assert_eq!(printers[0].uri, "usb://Brother/QL-570?serial=B3Z595204");
        assert_eq!(
            printers[1].name,
            "Dymo-LabelWriter_450-01010112345600"
        );
    }

    #[test]
    fn extract_usb_uris_skips_network_backends() {
        let uris = extract_usb_uris(LPINFO_V);
        assert_eq!(
            uris,
            vec![
                "usb://DYMO/LabelWriter%20450?serial=01010112345600",
                "usb://Brother/QL-570?serial=B3Z595204",
            ]
        );
    }

    #[test]
    fn file_device_directive_detection() {
        assert!(file_device_enabled("# comment\nFileDevice Yes\n"));
        assert!(file_device_enabled("  filedevice   yes\n"));
        assert!(!file_device_enabled("#FileDevice Yes\n"));
        assert!(!file_device_enabled("FileDevice No\nPrintcap /etc/printcap\n"));
        // only the directive itself, not a word ending in it
        assert!(!file_device_enabled("XFileDevice Yes\n"));
    }

    #[tokio::test]
    async fn empty_spooler_is_an_empty_list() {
        let runner = Arc::new(ScriptedRunner::new().on(
            "lpstat",
            1,
            "",
            "lpstat: No destinations added.\n",
        ));
        let spooler = spooler(runner);
        assert!(spooler.installed_printers().await.unwrap().is_empty());
        assert!(!spooler.is_registered("usb://Brother").await.unwrap());
    }

    #[tokio::test]
    async fn other_lpstat_failures_propagate() {
        let runner = Arc::new(ScriptedRunner::new().on(
            "lpstat",
            1,
            "",
            "lpstat: Transport endpoint is not connected\n",
        ));
        let spooler = spooler(runner);
        assert!(matches!(
            spooler.installed_printers().await,
            Err(SteckwerkError::CommandFailed { .. })
        ));
    }

    #[tokio::test]
    async fn is_registered_is_a_substring_test() {
        let runner = Arc::new(ScriptedRunner::new().on("lpstat", 0, LPSTAT, ""));
        let spooler = spooler(runner);
        assert!(
            spooler
                .is_registered("file:/dev/printers/Dymo-LabelWriter_450-01010112345600")
                .await
                .unwrap()
        );
        assert!(!spooler.is_registered("file:/dev/printers/other").await.unwrap());
    }

    #[tokio::test]
    async fn resolve_usb_uri_returns_the_full_token() {
        let runner = Arc::new(ScriptedRunner::new().on("lpinfo", 0, LPINFO_V, ""));
        let spooler = spooler(runner);
        let uri = spooler
            .resolve_usb_uri("DYMO", "01010112345600")
            .await
            .unwrap();
        assert_eq!(uri, "usb://DYMO/LabelWriter%20450?serial=01010112345600");
    }

    #[tokio::test]
    async fn unseen_device_is_not_detected() {
        let runner = Arc::new(ScriptedRunner::new().on("lpinfo", 0, LPINFO_V, ""));
        let spooler = spooler(runner);
        let err = spooler
            .resolve_usb_uri("DYMO", "9999999")
            .await
            .unwrap_err();
        assert!(matches!(err, SteckwerkError::NotDetected { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn register_runs_lpadmin_then_activation() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .on("lpadmin", 0, "", "")
                .on("cupsenable", 0, "", "")
                .on("cupsaccept", 0, "", ""),
        );
        let spooler = spooler(Arc::clone(&runner));

        spooler
            .register_printer("LW450", "file:/dev/printers/LW450", "lw450")
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].0, "lpadmin");
        assert_eq!(
            calls[0].1,
            vec!["-p", "LW450", "-E", "-v", "file:/dev/printers/LW450", "-m", "lw450.ppd"]
        );
        assert_eq!(calls[1], ("cupsenable".to_string(), vec!["LW450".to_string()]));
        assert_eq!(calls[2], ("cupsaccept".to_string(), vec!["LW450".to_string()]));
    }

    #[tokio::test]
    async fn failed_enable_still_attempts_accept_and_surfaces() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .on("lpadmin", 0, "", "")
                .on("cupsenable", 1, "", "cupsenable: unknown destination\n")
                .on("cupsaccept", 0, "", ""),
        );
        let spooler = spooler(Arc::clone(&runner));

        let err = spooler
            .register_printer("LW450", "file:/dev/printers/LW450", "lw450")
            .await
            .unwrap_err();
        assert!(matches!(err, SteckwerkError::CommandFailed { ref program, .. } if program == "cupsenable"));
        assert_eq!(runner.call_count("cupsaccept"), 1);
    }

    #[tokio::test]
    async fn quoted_arguments_never_reach_a_command() {
        let runner = Arc::new(ScriptedRunner::new());
        let spooler = spooler(Arc::clone(&runner));

        let err = spooler
            .register_printer("LW\"450", "file:/dev/x", "lw450")
            .await
            .unwrap_err();
        assert!(matches!(err, SteckwerkError::UnsafeInput { .. }));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn dry_run_skips_registration_commands() {
        let runner = Arc::new(ScriptedRunner::new());
        let spooler = Spooler::new(
            Arc::clone(&runner) as Arc<dyn CommandRunner>,
            Duration::from_secs(5),
            Duration::from_secs(10),
            true,
        );

        spooler
            .register_printer("LW450", "file:/dev/printers/LW450", "lw450")
            .await
            .unwrap();
        assert!(runner.calls().is_empty());
    }
}
