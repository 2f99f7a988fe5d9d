//! BroadcastHub - multiplexes one metrics source to many subscribers
//!
//! The hub owns the subscriber set, the sampling ticker, and the latest
//! sample cache. All mutations flow through its command channel, so a
//! fan-out iteration never observes a torn add/remove.
//!
//! ## Tick Flow
//!
//! ```text
//! Timer tick → probe once → cache + history → fan out to every subscriber
//!     ↑
//!     └─── Commands (Admit, Remove, HandleMessage, Start, Stop, ...)
//! ```
//!
//! ## Failure Semantics
//!
//! - Probe failure: the tick is skipped and retried next interval
//! - Delivery failure: only that subscriber is dropped
//! - Capacity: new subscribers are rejected, existing ones are untouched

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, instrument, trace, warn};

use crate::{SystemSnapshot, VmRecord, config::HubConfig, history::SampleHistory, probe::MetricsProbe};

use super::messages::{
    AdmissionError, ClientMessage, HubCommand, ServerMessage, SubscriberId, Subscription,
    SystemStatusData,
};

/// One live subscriber as the hub tracks it.
///
/// Deliveries go through an unbounded channel: the hub never waits on a slow
/// client, and a hung-up client surfaces as a send error on the next push.
#[derive(Debug)]
struct Subscriber {
    sender: mpsc::UnboundedSender<ServerMessage>,
    connected_at: DateTime<Utc>,
    last_sent_at: Option<DateTime<Utc>>,
}

/// Actor that samples the probe on a timer and fans results out.
pub struct BroadcastHub {
    /// Injected metrics source
    probe: Arc<dyn MetricsProbe>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<HubCommand>,

    /// Live subscribers, keyed by id
    subscribers: HashMap<SubscriberId, Subscriber>,

    /// Most recent successfully sampled snapshot
    latest: Option<SystemSnapshot>,

    /// Ring of recent samples
    history: SampleHistory,

    /// Active broadcast ticker; None while stopped
    ticker: Option<Interval>,

    /// Admission limit
    max_subscribers: usize,

    /// Source for subscriber ids
    next_id: u64,
}

impl BroadcastHub {
    pub fn new(
        probe: Arc<dyn MetricsProbe>,
        command_rx: mpsc::Receiver<HubCommand>,
        config: &HubConfig,
    ) -> Self {
        Self {
            probe,
            command_rx,
            subscribers: HashMap::new(),
            latest: None,
            history: SampleHistory::new(config.history_capacity),
            ticker: None,
            max_subscribers: config.max_subscribers,
            next_id: 0,
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command is received or the command channel is
    /// closed. Stopping the ticker lets an in-progress tick complete but
    /// schedules no further ones.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting broadcast hub");

        loop {
            tokio::select! {
                _ = Self::next_tick(&mut self.ticker) => {
                    self.broadcast_tick().await;
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if !self.handle_command(cmd).await {
                                break;
                            }
                        }
                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        debug!("broadcast hub stopped");
    }

    /// Await the next tick, or forever while no ticker is installed.
    async fn next_tick(ticker: &mut Option<Interval>) {
        match ticker {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending().await,
        }
    }

    /// Returns false when the actor should stop.
    async fn handle_command(&mut self, command: HubCommand) -> bool {
        match command {
            HubCommand::Admit { respond_to } => match self.admit() {
                Ok(subscription) => {
                    let id = subscription.id;
                    let _ = respond_to.send(Ok(subscription));
                    // New clients get the current state without waiting for
                    // the next tick.
                    self.push_current_to(id).await;
                }
                Err(rejection) => {
                    let _ = respond_to.send(Err(rejection));
                }
            },

            HubCommand::Remove { id } => self.remove(id),

            HubCommand::HandleMessage { id, message } => match message {
                ClientMessage::Ping => {
                    self.deliver(
                        id,
                        ServerMessage::Pong {
                            timestamp: Utc::now().to_rfc3339(),
                        },
                    );
                }
                ClientMessage::RequestData => self.push_current_to(id).await,
            },

            HubCommand::Start { interval: period } => {
                if self.ticker.is_some() {
                    debug!("broadcast ticker already running, restarting");
                }
                // Replacing the interval cancels the old one: at most one
                // ticker can ever be active.
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.ticker = Some(ticker);
                debug!("broadcast ticker started ({period:?})");
            }

            HubCommand::Stop => {
                if self.ticker.take().is_some() {
                    debug!("broadcast ticker stopped");
                }
            }

            HubCommand::Latest { respond_to } => {
                let _ = respond_to.send(self.latest.clone());
            }

            HubCommand::Recent { limit, respond_to } => {
                let _ = respond_to.send(self.history.recent(limit));
            }

            HubCommand::SubscriberCount { respond_to } => {
                let _ = respond_to.send(self.subscribers.len());
            }

            HubCommand::Shutdown => {
                debug!("received shutdown command");
                return false;
            }
        }

        true
    }

    /// One execution of the periodic sampling/broadcast cycle.
    ///
    /// Samples the probe exactly once and fans the snapshot out, so every
    /// subscriber in a tick sees the same data. With no subscribers the
    /// probe is not consulted at all.
    #[instrument(skip(self))]
    async fn broadcast_tick(&mut self) {
        if self.subscribers.is_empty() {
            trace!("no subscribers, skipping sample");
            return;
        }

        let snapshot = match self.probe.sample().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("probe failed, skipping tick: {e:#}");
                return;
            }
        };

        self.record(snapshot.clone());
        self.fan_out(&snapshot);
    }

    fn record(&mut self, snapshot: SystemSnapshot) {
        self.latest = Some(snapshot.clone());
        self.history.push(snapshot);
    }

    /// Deliver one snapshot to every subscriber, dropping only those whose
    /// channel has gone away.
    fn fan_out(&mut self, snapshot: &SystemSnapshot) {
        let status = ServerMessage::SystemStatus(SystemStatusData::running(snapshot.clone()));
        let vms = ServerMessage::VmData(vec![VmRecord::from_snapshot(snapshot)]);
        let now = Utc::now();

        let mut dropped = Vec::new();
        for (id, subscriber) in &mut self.subscribers {
            let delivered = subscriber
                .sender
                .send(status.clone())
                .and_then(|_| subscriber.sender.send(vms.clone()));

            match delivered {
                Ok(()) => subscriber.last_sent_at = Some(now),
                Err(_) => dropped.push(*id),
            }
        }

        for id in dropped {
            debug!("delivery to {id} failed, dropping subscriber");
            self.remove(id);
        }

        trace!("delivered sample to {} subscribers", self.subscribers.len());
    }

    fn admit(&mut self) -> Result<Subscription, AdmissionError> {
        if self.subscribers.len() >= self.max_subscribers {
            debug!(
                "rejecting subscriber, capacity reached ({})",
                self.max_subscribers
            );
            return Err(AdmissionError::CapacityExceeded {
                max: self.max_subscribers,
            });
        }

        self.next_id += 1;
        let id = SubscriberId(self.next_id);
        let (sender, receiver) = mpsc::unbounded_channel();

        self.subscribers.insert(
            id,
            Subscriber {
                sender,
                connected_at: Utc::now(),
                last_sent_at: None,
            },
        );
        debug!("admitted {id} ({} connected)", self.subscribers.len());

        Ok(Subscription { id, receiver })
    }

    /// Idempotent: removing an already-gone subscriber is a no-op.
    fn remove(&mut self, id: SubscriberId) {
        if let Some(subscriber) = self.subscribers.remove(&id) {
            let connected_secs = (Utc::now() - subscriber.connected_at).num_seconds();
            debug!(
                "removed {id} after {connected_secs}s, last delivery {:?} ({} remaining)",
                subscriber.last_sent_at,
                self.subscribers.len()
            );
        }
    }

    /// Push the current state to one subscriber, out of band from the timer.
    ///
    /// Uses the cached latest sample; before the first tick there is none,
    /// so one sample is taken. A probe failure here just skips the push.
    async fn push_current_to(&mut self, id: SubscriberId) {
        if !self.subscribers.contains_key(&id) {
            return;
        }

        let snapshot = match &self.latest {
            Some(snapshot) => snapshot.clone(),
            None => match self.probe.sample().await {
                Ok(snapshot) => {
                    self.record(snapshot.clone());
                    snapshot
                }
                Err(e) => {
                    warn!("probe failed during out-of-band push: {e:#}");
                    return;
                }
            },
        };

        self.deliver(
            id,
            ServerMessage::SystemStatus(SystemStatusData::running(snapshot.clone())),
        );
        self.deliver(
            id,
            ServerMessage::VmData(vec![VmRecord::from_snapshot(&snapshot)]),
        );
    }

    /// Send one message to one subscriber, dropping it on a dead channel.
    fn deliver(&mut self, id: SubscriberId, message: ServerMessage) {
        let delivered = match self.subscribers.get_mut(&id) {
            Some(subscriber) => match subscriber.sender.send(message) {
                Ok(()) => {
                    subscriber.last_sent_at = Some(Utc::now());
                    true
                }
                Err(_) => false,
            },
            None => return,
        };

        if !delivered {
            debug!("delivery to {id} failed, dropping subscriber");
            self.remove(id);
        }
    }
}

/// Handle for controlling a BroadcastHub
///
/// This handle provides a typed API for sending commands to the actor.
/// It can be cloned and shared across threads.
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Spawn a new broadcast hub
    pub fn spawn(probe: Arc<dyn MetricsProbe>, config: &HubConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let hub = BroadcastHub::new(probe, cmd_rx, config);
        tokio::spawn(hub.run());

        Self { sender: cmd_tx }
    }

    /// Start (or restart) the broadcast ticker.
    ///
    /// Idempotent in the stacking sense: repeated calls replace the running
    /// ticker instead of adding timers.
    pub async fn start(&self, interval: Duration) -> Result<()> {
        self.sender
            .send(HubCommand::Start { interval })
            .await
            .context("failed to send Start command")?;
        Ok(())
    }

    /// Stop the broadcast ticker; safe to call when not running.
    pub async fn stop(&self) -> Result<()> {
        self.sender
            .send(HubCommand::Stop)
            .await
            .context("failed to send Stop command")?;
        Ok(())
    }

    /// Request admission of a new subscriber.
    pub async fn admit(&self) -> Result<Subscription, AdmissionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(HubCommand::Admit { respond_to: tx })
            .await
            .map_err(|_| AdmissionError::HubUnavailable)?;

        rx.await.map_err(|_| AdmissionError::HubUnavailable)?
    }

    /// Remove a subscriber; idempotent.
    pub async fn remove(&self, id: SubscriberId) {
        let _ = self.sender.send(HubCommand::Remove { id }).await;
    }

    /// Forward a parsed client message to the hub.
    pub async fn handle_message(&self, id: SubscriberId, message: ClientMessage) {
        let _ = self
            .sender
            .send(HubCommand::HandleMessage { id, message })
            .await;
    }

    /// Latest successfully sampled snapshot, if any.
    pub async fn latest(&self) -> Option<SystemSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(HubCommand::Latest { respond_to: tx })
            .await
            .ok()?;

        rx.await.ok()?
    }

    /// Recent samples, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<SystemSnapshot> {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(HubCommand::Recent {
                limit,
                respond_to: tx,
            })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Number of live subscribers.
    pub async fn subscriber_count(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(HubCommand::SubscriberCount { respond_to: tx })
            .await
            .context("failed to send SubscriberCount command")?;

        rx.await.context("failed to receive response")
    }

    /// Gracefully shut down the hub.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(HubCommand::Shutdown).await;
    }
}
