//! Single-threaded dispatch loop
//!
//! Receive tasks copy frames into an mpsc channel; everything else happens
//! here, on one task, so relay state needs no locking. A one-second tick
//! drives the epoch clock and, every `clean_period` ticks, the idle sweep.

use crate::bridge::IpoeBridge;
use crate::relay::RelayCore;
use crate::sink::FrameSink;
use ipoe_core::{Error, Packet, Result, SocketKind};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Length of one epoch
pub const EPOCH: Duration = Duration::from_secs(1);

pub struct EventLoop<S> {
    relay: RelayCore,
    bridge: Option<IpoeBridge>,
    sink: S,
    clean_period: u64,
    ticks: u64,
}

impl<S: FrameSink> EventLoop<S> {
    pub fn new(relay: RelayCore, bridge: Option<IpoeBridge>, sink: S, clean_period: u64) -> Self {
        Self {
            relay,
            bridge,
            sink,
            clean_period: clean_period.max(1),
            ticks: 0,
        }
    }

    pub fn relay(&self) -> &RelayCore {
        &self.relay
    }

    pub fn bridge(&self) -> Option<&IpoeBridge> {
        self.bridge.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Route one received frame to the relay or the bridge
    pub fn dispatch(&mut self, packet: Packet) {
        match (packet.socket, self.bridge.as_mut()) {
            (SocketKind::Ip, Some(bridge)) if packet.interface == bridge.index() => {
                bridge.handle_frame(&mut self.sink, packet.data());
            }
            (SocketKind::Ip, _) => {
                debug!(interface = packet.interface, "IP frame with no bridge");
            }
            (SocketKind::Session, Some(bridge)) if bridge.owns(&packet) => {
                if let Err(e) = bridge.handle_session_frame(&mut self.sink, packet.data()) {
                    debug!(error = %e, "Dropping bridged session frame");
                }
            }
            _ => self.relay.handle_packet(&mut self.sink, &packet),
        }
    }

    fn on_tick(&mut self) {
        self.ticks += 1;
        self.relay.tick();

        if self.ticks % self.clean_period == 0 {
            let reaped = self.relay.clean_sessions(&mut self.sink);
            if reaped > 0 {
                info!(
                    reaped,
                    active = self.relay.directory().len(),
                    "Reaped idle sessions"
                );
            }
        }
    }

    /// Run until `shutdown` completes
    ///
    /// Shutdown and the epoch tick are checked ahead of the frame queue, so a
    /// steady backlog cannot hold them off. Fails with `Error::Channel` if
    /// every receive task has gone away.
    pub async fn run<F>(&mut self, mut rx: mpsc::Receiver<Packet>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(EPOCH);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;
        tokio::pin!(shutdown);

        info!(
            interfaces = self.relay.interfaces().len(),
            capacity = self.relay.directory().capacity(),
            bridge = self.bridge.is_some(),
            "Relay running"
        );

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,
                _ = ticker.tick() => self.on_tick(),
                packet = rx.recv() => match packet {
                    Some(packet) => self.dispatch(packet),
                    None => return Err(Error::Channel("all receive tasks stopped".into())),
                },
            }
        }

        let stats = self.relay.stats();
        info!(
            sessions = self.relay.directory().len(),
            discovery = stats.discovery_relayed,
            session = stats.session_relayed,
            dropped = stats.dropped,
            errors_sent = stats.errors_sent,
            reaped = stats.sessions_reaped,
            "Relay stopped"
        );
        Ok(())
    }
}
