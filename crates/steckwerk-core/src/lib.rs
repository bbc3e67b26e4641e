// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Steckwerk — core types, device catalog, and error definitions shared
// across all crates.

pub mod catalog;
pub mod config;
pub mod error;
pub mod types;

pub use catalog::Catalog;
pub use config::ProvisionConfig;
pub use error::SteckwerkError;
pub use types::*;
