// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Driver resolution against the spooler's catalog.
//
// `lpinfo -m` prints one candidate per line: a driver file path ending
// in `.ppd` (or `.ppd.gz`), then a free-form description that usually
// contains the make and model. We pick the first line whose description
// mentions the device's model, tolerating the catalog writing "QL-570"
// where the USB descriptor says "QL 570" or "QL_570".

use regex::Regex;

/// Find a driver for `model` in raw `lpinfo -m` output.
///
/// Returns the driver identifier: everything before the `.ppd` suffix
/// on the first matching line, the form `lpadmin -m` expects with
/// `.ppd` re-appended. `None` means the catalog has no match; the
/// caller decides how fatal that is.
pub fn find_driver(catalog: &str, model: &str) -> Option<String> {
    let pattern = model_pattern(model);
    if pattern.is_empty() {
        return None;
    }
    // Escaped tokens joined by a fixed separator class always form a
    // valid pattern.
    let re = Regex::new(&format!(r"(?i)^(\S+)\.ppd\b.*{pattern}")).ok()?;

    for line in catalog.lines() {
        if let Some(caps) = re.captures(line) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }
    }
    None
}

/// Turn a model string into a flexible pattern: tokens separated by
/// whitespace or underscores in the model match across whitespace,
/// underscores, or hyphens in the catalog text. All other characters
/// are taken literally.
fn model_pattern(model: &str) -> String {
    model
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|token| !token.is_empty())
        .map(|token| regex::escape(token))
        .collect::<Vec<_>>()
        .join(r"[\s_-]+")
}
