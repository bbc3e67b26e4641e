// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Live attach-event feed. udev monitor sockets are not `Send`, so the
// stream runs on a dedicated thread with a single-thread runtime and
// forwards descriptors over a channel.

use std::thread::JoinHandle;

use futures::StreamExt;
use steckwerk_core::{error::Result, DeviceDescriptor, SteckwerkError};
use tokio::{
    runtime,
    sync::{mpsc, oneshot},
    task::LocalSet,
};
use tokio_udev::{AsyncMonitorSocket, EventType, MonitorBuilder};
use tracing::{debug, warn};

use crate::convert;

/// Stream of USB attach events, one descriptor per plugged device.
///
/// Detach events are not reported; provisioning only ever reacts to a
/// device showing up.
pub struct HotplugMonitor {
    events: mpsc::UnboundedReceiver<DeviceDescriptor>,
    stop: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl HotplugMonitor {
    /// Starts the monitor thread and waits until its udev socket is
    /// actually listening, so a device plugged right after `spawn`
    /// returns cannot slip past unseen.
    pub async fn spawn() -> Result<Self> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let thread = std::thread::Builder::new()
            .name("steckwerk-hotplug".into())
            .spawn(move || monitor_thread(event_tx, stop_rx, ready_tx))
            .map_err(|e| SteckwerkError::Monitor(format!("monitor thread: {e}")))?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(Self {
                events: event_rx,
                stop: Some(stop_tx),
                thread: Some(thread),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SteckwerkError::Monitor(
                "monitor thread exited before listening".into(),
            )),
        }
    }

    /// Next attached device. Returns `None` once the monitor has been
    /// stopped or its thread has died. Cancel-safe.
    pub async fn recv(&mut self) -> Option<DeviceDescriptor> {
        self.events.recv().await
    }

    /// Signals the monitor thread to exit and joins it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for HotplugMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn monitor_thread(
    events: mpsc::UnboundedSender<DeviceDescriptor>,
    stop: oneshot::Receiver<()>,
    ready: oneshot::Sender<Result<()>>,
) {
    let rt = match runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            let _ = ready.send(Err(SteckwerkError::Monitor(format!("monitor runtime: {e}"))));
            return;
        }
    };
    let local = LocalSet::new();
    local.spawn_local(feed_events(events, stop, ready));
    rt.block_on(local);
}

async fn feed_events(
    events: mpsc::UnboundedSender<DeviceDescriptor>,
    mut stop: oneshot::Receiver<()>,
    ready: oneshot::Sender<Result<()>>,
) {
    // The AsyncFd registration needs the runtime, so the socket is
    // built here rather than before block_on.
    let mut socket = match listen() {
        Ok(socket) => socket,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }

    loop {
        tokio::select! {
            _ = &mut stop => return,
            event = socket.next() => match event {
                None => return,
                Some(Err(e)) => {
                    // overflow on the netlink socket loses events but
                    // does not invalidate it; keep listening
                    warn!(error = %e, "udev monitor socket error");
                }
                Some(Ok(event)) => {
                    if event.event_type() != EventType::Add {
                        continue;
                    }
                    let Some(desc) = convert::descriptor_from_device(&event.device()) else {
                        debug!("ignoring attach event without parseable id attributes");
                        continue;
                    };
                    debug!(device = %desc.display_name(), "usb attach event");
                    if events.send(desc).is_err() {
                        return;
                    }
                }
            },
        }
    }
}

fn listen() -> Result<AsyncMonitorSocket> {
    MonitorBuilder::new()
        .and_then(|builder| builder.match_subsystem_devtype("usb", "usb_device"))
        .and_then(|builder| builder.listen())
        .and_then(AsyncMonitorSocket::new)
        .map_err(|e| SteckwerkError::Monitor(format!("udev monitor socket: {e}")))
}
