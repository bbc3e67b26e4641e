// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "steckwerk", version, about = "USB label printer auto-provisioning daemon")]
pub struct Cli {
    /// Verbose debug logging (RUST_LOG overrides this).
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch for printers being plugged in and provision them.
    Watch(WatchArgs),
    /// List provisioned device paths and active spooler printers.
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Log every step but write no files and run no commands.
    #[arg(long)]
    pub dry_run: bool,

    /// Rewrite `*cupsManualCopies: False` in each installed PPD.
    #[arg(long)]
    pub fix_manual_copies: bool,

    /// Register spooler printers under their live usb:// URI instead
    /// of the stable file: device path.
    #[arg(long)]
    pub use_usb_uri: bool,

    /// Directory the udev rule files are written to.
    #[arg(long, value_name = "DIR")]
    pub rules_dir: Option<PathBuf>,

    /// Subdirectory of /dev the stable printer symlinks appear under.
    #[arg(long, value_name = "NAME")]
    pub dev_subdir: Option<String>,

    /// JSON configuration file; command-line flags override its fields.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Extra device catalog JSON, merged over the builtin table.
    #[arg(long, value_name = "FILE")]
    pub devices: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// JSON configuration file, read for the /dev subdirectory name.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
