// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Steckwerk Provision — the stateful side of the daemon: external
// command execution, the udev rule store, CUPS spooler inspection and
// registration, driver resolution, and the installation orchestrator
// that ties them together.

pub mod driver;
pub mod exec;
pub mod install;
pub mod ppd;
pub mod rules;
pub mod spooler;

pub use exec::{CommandOutput, CommandRunner, SystemRunner};
pub use install::{InstallReport, Installer, Outcome};
pub use ppd::PpdPatcher;
pub use rules::RuleStore;
pub use spooler::Spooler;
