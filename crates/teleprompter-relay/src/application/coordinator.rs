//! Relay startup, fan-in and shutdown.
//!
//! [`RelayCoordinator`] owns the whole relay run:
//!
//! 1. Resolve the local address, retrying on a fixed interval until one
//!    appears.  The retry never blocks the caller of [`RelayCoordinator::start_relay`].
//! 2. Bind the [`ConnectionHub`].  A bind failure ends the run and is reported
//!    through the [`RelayStartup`] handle, never to the sink.
//! 3. Emit `qr` with the local address.
//! 4. Forward every well-formed client command as `command`.
//! 5. Publish the service record and forward every discovered peer as `qr`.
//!
//! # Fan-in
//!
//! Hub connections, the discovery forwarder, the startup task and
//! [`RelayCoordinator::request_link_preparation`] all write into one unbounded
//! queue.  A single dispatcher task drains it and calls
//! [`PresentationSink::deliver`], so the sink sees one call at a time, in queue
//! order, and never needs its own locking.
//!
//! # Cancellation
//!
//! One [`CancellationToken`] is threaded through the retry timer, the accept
//! loop, every connection and the discovery forwarder.  [`RelayCoordinator::stop`]
//! cancels it; [`RelayCoordinator::shutdown`] also waits for those tasks and
//! withdraws the advertisement.  The dispatcher keeps running afterwards so
//! `prepareLinks` still reaches the sink once the relay is down.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use teleprompter_core::{CommandEvent, MalformedCommand, NetworkAddress, RelayNotification};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::sink::PresentationSink;
use crate::domain::RelayConfig;
use crate::infrastructure::address::AddressResolver;
use crate::infrastructure::advertiser::ServiceAdvertiser;
use crate::infrastructure::hub::{ConnectionHub, ConnectionId, HubError, HubEvent, HubListener};

/// Error type for a relay run.
#[derive(Debug, Error)]
pub enum RelayError {
    /// `start_relay` was called a second time on the same coordinator.
    #[error("relay has already been started")]
    AlreadyStarted,

    /// The listener could not be bound.  Not retried.
    #[error(transparent)]
    Bind(#[from] HubError),

    /// The relay was stopped before it became ready.
    #[error("relay was stopped before it became ready")]
    Cancelled,

    /// The startup task ended without reporting a result (it panicked or the
    /// runtime shut down).
    #[error("relay startup task failed: {0}")]
    TaskFailed(String),
}

/// Events that never reach the sink but are worth observing.
///
/// Installing a hook does not change what the sink receives.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayDiagnostic {
    /// No routable address yet; another attempt follows after the retry interval.
    AddressNotFound { attempt: u32 },
    /// Publishing the service record failed.  The relay keeps running.
    AdvertiseFailed { reason: String },
    /// Peer discovery could not be started.  The relay keeps running.
    DiscoveryFailed { reason: String },
    /// A `command` without a usable payload was dropped.
    MalformedCommand {
        connection: ConnectionId,
        reason: MalformedCommand,
    },
    ClientConnected {
        connection: ConnectionId,
        peer: SocketAddr,
    },
    ClientDisconnected {
        connection: ConnectionId,
        peer: SocketAddr,
    },
}

impl From<HubEvent> for RelayDiagnostic {
    fn from(event: HubEvent) -> Self {
        match event {
            HubEvent::Connected { connection, peer } => Self::ClientConnected { connection, peer },
            HubEvent::Disconnected { connection, peer } => {
                Self::ClientDisconnected { connection, peer }
            }
            HubEvent::MalformedCommand { connection, reason } => {
                Self::MalformedCommand { connection, reason }
            }
        }
    }
}

/// Observer for [`RelayDiagnostic`]s.  Called from relay tasks; keep it cheap.
pub type DiagnosticHook = Arc<dyn Fn(RelayDiagnostic) + Send + Sync>;

/// What a successful startup produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayReady {
    /// The address announced to the sink as `qr`.
    pub address: NetworkAddress,
    /// The socket address the hub actually bound.
    pub local_addr: SocketAddr,
}

/// Pending result of [`RelayCoordinator::start_relay`].
///
/// Dropping it does not affect the relay; it only gives up on learning the
/// outcome.
#[derive(Debug)]
pub struct RelayStartup {
    rx: oneshot::Receiver<Result<RelayReady, RelayError>>,
}

impl RelayStartup {
    /// Waits until the hub is bound, the relay fails, or it is stopped.
    pub async fn wait(self) -> Result<RelayReady, RelayError> {
        self.rx.await.unwrap_or_else(|_| {
            Err(RelayError::TaskFailed(
                "startup task ended without a result".to_string(),
            ))
        })
    }
}

/// Orchestrates one relay run and owns the queue feeding the sink.
///
/// Cheap to clone; clones share the same relay.  Must be created inside a
/// Tokio runtime, because construction spawns the dispatcher task.
#[derive(Clone)]
pub struct RelayCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: RelayConfig,
    resolver: Arc<dyn AddressResolver>,
    advertiser: Arc<dyn ServiceAdvertiser>,
    queue: mpsc::UnboundedSender<RelayNotification>,
    shutdown: CancellationToken,
    started: AtomicBool,
    diagnostics: Arc<Diagnostics>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RelayCoordinator {
    /// Builds a coordinator bound to `sink` and spawns its dispatcher.
    pub fn new(
        config: RelayConfig,
        sink: Arc<dyn PresentationSink>,
        resolver: Arc<dyn AddressResolver>,
        advertiser: Arc<dyn ServiceAdvertiser>,
    ) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch(rx, sink));

        Self {
            inner: Arc::new(Inner {
                config,
                resolver,
                advertiser,
                queue,
                shutdown: CancellationToken::new(),
                started: AtomicBool::new(false),
                diagnostics: Arc::new(Diagnostics::default()),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Installs a diagnostic hook, replacing any previous one.
    pub fn with_diagnostics<F>(self, hook: F) -> Self
    where
        F: Fn(RelayDiagnostic) + Send + Sync + 'static,
    {
        self.inner.diagnostics.set(Arc::new(hook));
        self
    }

    /// Starts the relay in the background and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::AlreadyStarted`] if this coordinator was started
    /// before.  Every other failure is reported through the returned
    /// [`RelayStartup`].
    pub fn start_relay(&self) -> Result<RelayStartup, RelayError> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(RelayError::AlreadyStarted);
        }

        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let result = inner.run_startup().await;
            match &result {
                Ok(ready) => info!(
                    "relay ready: reachable at {} (listening on {})",
                    ready.address, ready.local_addr
                ),
                Err(RelayError::Cancelled) => info!("relay stopped before it became ready"),
                Err(e) => error!("relay failed to start: {e}"),
            }
            // The caller may have dropped the startup handle.
            let _ = tx.send(result);
        });
        self.inner.track(task);

        Ok(RelayStartup { rx })
    }

    /// Emits `prepareLinks` to the sink, whatever state the relay is in.
    pub fn request_link_preparation(&self) {
        debug!("link preparation requested");
        self.inner.enqueue(RelayNotification::PrepareLinks);
    }

    /// Signals every relay task to stop.  Returns immediately.
    pub fn stop(&self) {
        self.inner.shutdown.cancel();
    }

    /// Stops the relay, waits for its tasks to exit and withdraws the
    /// service advertisement.
    pub async fn shutdown(&self) {
        self.stop();

        // Tasks may register further tasks while exiting (startup spawning
        // the hub), so drain until nothing new appears.
        loop {
            let pending: Vec<JoinHandle<()>> = self
                .inner
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .drain(..)
                .collect();
            if pending.is_empty() {
                break;
            }
            for task in pending {
                if let Err(e) = task.await {
                    warn!("relay task ended abnormally: {e}");
                }
            }
        }

        self.inner.advertiser.withdraw();
        info!("relay shut down");
    }

    /// `true` once [`Self::stop`] or [`Self::shutdown`] has been called.
    pub fn is_stopped(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

impl Inner {
    async fn run_startup(&self) -> Result<RelayReady, RelayError> {
        let address = self.resolve_address().await?;

        let hub = ConnectionHub::bind(self.config.bind_addr).await?;
        if self.shutdown.is_cancelled() {
            return Err(RelayError::Cancelled);
        }
        let local_addr = hub.local_addr();

        // Queued before the hub serves, so `qr` precedes every command.
        self.enqueue(RelayNotification::local_address(&address));

        let forwarder: Arc<dyn HubListener> = Arc::new(CommandForwarder {
            queue: self.queue.clone(),
            diagnostics: Arc::clone(&self.diagnostics),
        });
        self.track(hub.serve(forwarder, self.shutdown.clone()));

        self.start_advertising(address, local_addr.port());

        Ok(RelayReady {
            address,
            local_addr,
        })
    }

    async fn resolve_address(&self) -> Result<NetworkAddress, RelayError> {
        let mut attempt: u32 = 0;
        loop {
            if self.shutdown.is_cancelled() {
                return Err(RelayError::Cancelled);
            }

            attempt = attempt.saturating_add(1);
            if let Some(address) = self.resolver.resolve() {
                info!("resolved local address {address} (attempt {attempt})");
                return Ok(address);
            }

            debug!(
                "no routable address yet (attempt {attempt}); retrying in {:?}",
                self.config.retry_interval
            );
            self.diagnostics.emit(RelayDiagnostic::AddressNotFound { attempt });

            tokio::select! {
                _ = self.shutdown.cancelled() => return Err(RelayError::Cancelled),
                _ = tokio::time::sleep(self.config.retry_interval) => {}
            }
        }
    }

    /// Publishes and starts watching.  Failures are logged and reported to the
    /// diagnostic hook only.
    fn start_advertising(&self, address: NetworkAddress, port: u16) {
        if !self.config.advertise {
            debug!("advertisement disabled; skipping publish and discovery");
            return;
        }

        let record = self.config.service_record(port);
        if let Err(e) = self.advertiser.publish(&record, address) {
            warn!("service advertisement failed: {e}");
            self.diagnostics.emit(RelayDiagnostic::AdvertiseFailed {
                reason: e.to_string(),
            });
        }

        let mut peers = match self
            .advertiser
            .watch(&self.config.service_protocol, self.shutdown.clone())
        {
            Ok(peers) => peers,
            Err(e) => {
                warn!("peer discovery failed: {e}");
                self.diagnostics.emit(RelayDiagnostic::DiscoveryFailed {
                    reason: e.to_string(),
                });
                return;
            }
        };

        let queue = self.queue.clone();
        let shutdown = self.shutdown.clone();
        self.track(tokio::spawn(async move {
            loop {
                let peer = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    peer = peers.recv() => peer,
                };
                let Some(peer) = peer else { break };
                debug!("discovered peer {}", peer.host_address);
                if queue.send(RelayNotification::peer(&peer)).is_err() {
                    break;
                }
            }
        }));
    }

    fn enqueue(&self, notification: RelayNotification) {
        // Only fails once the dispatcher is gone, i.e. the runtime is exiting.
        if self.queue.send(notification).is_err() {
            debug!("notification dropped: dispatcher has stopped");
        }
    }

    fn track(&self, task: JoinHandle<()>) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task);
    }
}

/// Drains the queue into the sink, one notification at a time.
async fn dispatch(
    mut rx: mpsc::UnboundedReceiver<RelayNotification>,
    sink: Arc<dyn PresentationSink>,
) {
    while let Some(notification) = rx.recv().await {
        debug!("delivering {} notification", notification.kind().as_str());
        sink.deliver(notification);
    }
}

/// Hub listener that wraps commands for the queue.
struct CommandForwarder {
    queue: mpsc::UnboundedSender<RelayNotification>,
    diagnostics: Arc<Diagnostics>,
}

impl HubListener for CommandForwarder {
    fn on_command(&self, _connection: ConnectionId, event: CommandEvent) {
        let _ = self.queue.send(RelayNotification::command(event));
    }

    fn on_hub_event(&self, event: HubEvent) {
        self.diagnostics.emit(event.into());
    }
}

#[derive(Default)]
struct Diagnostics {
    hook: Mutex<Option<DiagnosticHook>>,
}

impl Diagnostics {
    fn set(&self, hook: DiagnosticHook) {
        *self.hook.lock().unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    fn emit(&self, diagnostic: RelayDiagnostic) {
        // Clone out so the hook runs without the lock held.
        let hook = self
            .hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(hook) = hook {
            hook(diagnostic);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
