// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Supported-device catalog: which USB printers we provision, and how.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{DeviceDescriptor, ProvisioningStrategy, parse_usb_id};

/// Catalog entry for one vendor: the provisioning strategy plus the
/// product ids it applies to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorEntry {
    pub strategy: ProvisioningStrategy,
    /// Accepted product ids. JSON form tolerates numbers, decimal
    /// strings, and `0x`-prefixed hex strings.
    #[serde(deserialize_with = "usb_id_list")]
    pub products: Vec<u16>,
}

fn usb_id_list<'de, D>(deserializer: D) -> std::result::Result<Vec<u16>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawUsbId {
        Number(u16),
        Text(String),
    }

    let raw = Vec::<RawUsbId>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|id| match id {
            RawUsbId::Number(n) => Ok(n),
            RawUsbId::Text(s) => parse_usb_id(&s).map_err(serde::de::Error::custom),
        })
        .collect()
}

/// The vendor/product table driving classification.
///
/// Keys are lower-cased manufacturer strings as reported by the USB
/// string descriptor. The table is assembled once at startup (builtin
/// entries plus an optional JSON overlay) and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Catalog {
    vendors: BTreeMap<String, VendorEntry>,
}

impl Catalog {
    /// The builtin table.
    pub fn builtin() -> Self {
        let mut vendors = BTreeMap::new();
        vendors.insert(
            "brother".to_string(),
            VendorEntry {
                strategy: ProvisioningStrategy::DeviceFileRule,
                // QL-570, QL-700
                products: vec![0x2028, 0x2042],
            },
        );
        vendors.insert(
            "dymo".to_string(),
            VendorEntry {
                strategy: ProvisioningStrategy::SpoolerRegistration,
                // LabelWriter 450, LabelWriter 450 Turbo
                products: vec![0x0020, 0x0021],
            },
        );
        Self { vendors }
    }

    /// Classify a descriptor: `Some(strategy)` iff the lower-cased
    /// manufacturer is a catalog key AND the product id is in that
    /// vendor's set. Pure; total over descriptors without serials.
    pub fn classify(&self, desc: &DeviceDescriptor) -> Option<ProvisioningStrategy> {
        let entry = self.vendors.get(&desc.manufacturer.to_lowercase())?;
        entry
            .products
            .contains(&desc.product_id)
            .then_some(entry.strategy)
    }

    /// Merge extra vendors from a JSON document of the form
    /// `{"zebra": {"strategy": "spooler-registration", "products": [10, "0x0b"]}}`.
    /// Entries replace builtin entries for the same vendor.
    pub fn merge_json(&mut self, json: &str) -> Result<()> {
        let extra: BTreeMap<String, VendorEntry> = serde_json::from_str(json)?;
        for (vendor, entry) in extra {
            self.vendors.insert(vendor.to_lowercase(), entry);
        }
        Ok(())
    }

    pub fn vendor_count(&self) -> usize {
        self.vendors.len()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VendorId;

    fn descriptor(manufacturer: &str, vendor_id: u16, product_id: u16) -> DeviceDescriptor {
        DeviceDescriptor {
            manufacturer: manufacturer.into(),
            model: "test".into(),
            vendor_id: VendorId(vendor_id),
            product_id,
            serial: Some("XYZ123".into()),
        }
    }

    #[test]
    fn builtin_brother_gets_device_file_rule() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.classify(&descriptor("Brother", 0x04f9, 0x2028)),
            Some(ProvisioningStrategy::DeviceFileRule)
        );
        assert_eq!(
            catalog.classify(&descriptor("BROTHER", 0x04f9, 0x2042)),
            Some(ProvisioningStrategy::DeviceFileRule)
        );
    }

    #[test]
    fn builtin_dymo_gets_spooler_registration() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.classify(&descriptor("DYMO", 0x0922, 0x0020)),
            Some(ProvisioningStrategy::SpoolerRegistration)
        );
        assert_eq!(
            catalog.classify(&descriptor("Dymo", 0x0922, 0x0021)),
            Some(ProvisioningStrategy::SpoolerRegistration)
        );
    }

    #[test]
    fn unknown_vendor_or_product_is_unclassified() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.classify(&descriptor("Zebra", 0x0a5f, 0x0020)), None);
        assert_eq!(
            catalog.classify(&descriptor("Brother", 0x04f9, 0x9999)),
            None
        );
        assert_eq!(catalog.classify(&descriptor("", 0x0000, 0x0000)), None);
    }

    #[test]
    fn serial_is_irrelevant_to_classification() {
        let catalog = Catalog::builtin();
        let mut desc = descriptor("Brother", 0x04f9, 0x2028);
        desc.serial = None;
        assert_eq!(
            catalog.classify(&desc),
            Some(ProvisioningStrategy::DeviceFileRule)
        );
    }

    #[test]
    fn merge_adds_and_overrides_vendors() {
        let mut catalog = Catalog::builtin();
        catalog
            .merge_json(
                r#"{
                    "Zebra": {"strategy": "spooler-registration", "products": [16, "0x11", "18"]},
                    "brother": {"strategy": "device-file-rule", "products": ["0x2050"]}
                }"#,
            )
            .unwrap();

        assert_eq!(
            catalog.classify(&descriptor("zebra", 0x0a5f, 0x0011)),
            Some(ProvisioningStrategy::SpoolerRegistration)
        );
        // Override replaced the builtin brother product list.
        assert_eq!(
            catalog.classify(&descriptor("Brother", 0x04f9, 0x2050)),
            Some(ProvisioningStrategy::DeviceFileRule)
        );
        assert_eq!(catalog.classify(&descriptor("Brother", 0x04f9, 0x2028)), None);
    }

    #[test]
    fn merge_rejects_unparseable_product_ids() {
        let mut catalog = Catalog::builtin();
        let err = catalog
            .merge_json(r#"{"zebra": {"strategy": "spooler-registration", "products": ["label"]}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("label"));
    }
}
