// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Steckwerk Hotplug — the USB device feed: a one-shot enumeration of
// already-attached devices plus a live udev attach-event monitor.

mod convert;
pub mod monitor;
pub mod scan;

pub use monitor::HotplugMonitor;
pub use scan::connected_devices;
