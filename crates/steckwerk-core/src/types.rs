// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Steckwerk provisioning daemon.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SteckwerkError};

/// A 16-bit USB vendor identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(pub u16);

impl VendorId {
    /// Render as exactly four lower-case hex digits, zero-padded: the
    /// form udev exposes in `ATTRS{idVendor}` (`0x20` becomes `"0020"`).
    pub fn hex(&self) -> String {
        format!("{:04x}", self.0)
    }

    /// Parse udev's bare-hex attribute form (`"04f9"`).
    pub fn from_hex(s: &str) -> Result<Self> {
        u16::from_str_radix(s.trim(), 16)
            .map(Self)
            .map_err(|_| SteckwerkError::InvalidId(s.to_string()))
    }
}

impl std::str::FromStr for VendorId {
    type Err = SteckwerkError;

    /// Accepts decimal (`"8226"`) or `0x`-prefixed hex (`"0x2022"`).
    fn from_str(s: &str) -> Result<Self> {
        parse_usb_id(s).map(Self)
    }
}

impl std::fmt::Display for VendorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hex())
    }
}

/// Parse a USB id given as decimal or `0x`-prefixed hex.
pub(crate) fn parse_usb_id(s: &str) -> Result<u16> {
    let trimmed = s.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => trimmed.parse::<u16>(),
    };
    parsed.map_err(|_| SteckwerkError::InvalidId(s.to_string()))
}

/// Replace whitespace runs with `_`, then strip everything outside
/// `[A-Za-z0-9_-]`. Applied to every string that becomes part of a rule
/// file name, a stable device path, or a CUPS printer name.
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            pending_sep = true;
            continue;
        }
        if pending_sep {
            out.push('_');
            pending_sep = false;
        }
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
        }
    }
    if pending_sep {
        out.push('_');
    }
    out
}

/// One observed USB device, captured at attach time.
///
/// Descriptors are immutable snapshots; nothing is persisted across
/// attach events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Manufacturer string descriptor (may be empty).
    pub manufacturer: String,
    /// Product/model string descriptor (may be empty).
    pub model: String,
    pub vendor_id: VendorId,
    pub product_id: u16,
    /// Serial number string descriptor. Many non-printer devices omit it.
    pub serial: Option<String>,
}

impl DeviceDescriptor {
    /// Human-readable label for logs. Falls back to `vid:pid` when the
    /// device carries no string descriptors.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.manufacturer, self.model);
        let trimmed = name.trim();
        if trimmed.is_empty() {
            format!("{}:{:04x}", self.vendor_id.hex(), self.product_id)
        } else {
            trimmed.to_string()
        }
    }

    /// The serial number, or `MissingSerial` when the descriptor has none.
    ///
    /// Classification never needs the serial; rule installation and
    /// spooler registration do.
    pub fn require_serial(&self) -> Result<&str> {
        self.serial
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SteckwerkError::MissingSerial(self.display_name()))
    }

    /// Deterministic identifier derived from the descriptor:
    /// `sanitize(manufacturer)-sanitize(model)-sanitize(serial)`.
    ///
    /// Used for rule file names, stable `/dev` paths, and CUPS printer
    /// names, so re-provisioning the same physical device always lands
    /// on the same artifacts.
    pub fn slug(&self) -> Result<String> {
        let serial = self.require_serial()?;
        Ok(format!(
            "{}-{}-{}",
            sanitize(&self.manufacturer),
            sanitize(&self.model),
            sanitize(serial)
        ))
    }
}

/// One installed print queue as reported by `lpstat -v`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterRecord {
    pub name: String,
    pub uri: String,
}

/// How a supported device gets provisioned.
///
/// Closed set: adding a vendor only ever means picking one of these,
/// never adding a new code path per vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvisioningStrategy {
    /// Write a udev rule binding a stable symlink to vendor id + serial.
    DeviceFileRule,
    /// Register with the CUPS spooler under a fuzzy-matched driver.
    SpoolerRegistration,
}
