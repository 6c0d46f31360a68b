//! WebSocket hub: accept loop and per-connection event handling.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting any number of remote-control clients.
//! 3. Upgrading each connection to a WebSocket session.
//! 4. Reading named events from each session and handing every well-formed
//!    `command` to the registered [`HubListener`], in arrival order.
//! 5. Closing everything when the shutdown token is cancelled.
//!
//! # Concurrency
//!
//! Each client runs in its own Tokio task, so one slow phone never delays
//! another.  Within a connection, frames are processed strictly one after the
//! other, which is what guarantees per-connection ordering.  Across
//! connections, calls to the listener interleave arbitrarily.
//!
//! # Disconnects
//!
//! A client going away is not an error and is not forwarded anywhere: its task
//! ends and the connection handle is dropped.  A returning client gets a new
//! [`ConnectionId`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures_util::StreamExt;
use teleprompter_core::{parse_client_frame, CommandEvent, MalformedCommand};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Opaque handle identifying one client connection for its lifetime.
pub type ConnectionId = Uuid;

/// Pause after a failed `accept()` so a persistent error (e.g. out of file
/// descriptors) does not turn the loop into a busy spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Error type for hub startup.
#[derive(Debug, Error)]
pub enum HubError {
    /// The listener could not be bound (port in use, permission denied, ...).
    #[error("failed to bind remote-control listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Connection lifecycle events, reported for observability only.
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    Connected {
        connection: ConnectionId,
        peer: SocketAddr,
    },
    Disconnected {
        connection: ConnectionId,
        peer: SocketAddr,
    },
    /// A `command` event arrived without a usable payload and was dropped.
    MalformedCommand {
        connection: ConnectionId,
        reason: MalformedCommand,
    },
}

/// Receives what the hub reads from its clients.
///
/// Called from the per-connection tasks; implementations must be cheap and
/// must not block.
pub trait HubListener: Send + Sync + 'static {
    /// One well-formed command, in arrival order for its connection.
    fn on_command(&self, connection: ConnectionId, event: CommandEvent);

    /// Connection lifecycle and dropped-frame notices.  Ignored by default.
    fn on_hub_event(&self, _event: HubEvent) {}
}

impl<F> HubListener for F
where
    F: Fn(ConnectionId, CommandEvent) + Send + Sync + 'static,
{
    fn on_command(&self, connection: ConnectionId, event: CommandEvent) {
        self(connection, event)
    }
}

/// A bound, not yet serving, remote-control listener.
///
/// Binding and serving are separate steps: a successful [`ConnectionHub::bind`]
/// is the "ready" signal (the port is open and connections queue in the
/// backlog), and [`ConnectionHub::serve`] starts accepting them.
pub struct ConnectionHub {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ConnectionHub {
    /// Binds the listener.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Bind`] if the address cannot be bound.  This is
    /// fatal for the relay run and is never retried here.
    pub async fn bind(addr: SocketAddr) -> Result<Self, HubError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| HubError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| HubError::Bind { addr, source })?;

        info!("remote-control hub listening on {local_addr}");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// The address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns the accept loop.  It runs until `shutdown` is cancelled; every
    /// open connection is closed at the same time.
    pub fn serve(self, listener: Arc<dyn HubListener>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(accept_loop(self.listener, listener, shutdown))
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

async fn accept_loop(
    tcp: TcpListener,
    listener: Arc<dyn HubListener>,
    shutdown: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("shutdown requested; stopping remote-control hub");
                break;
            }
            accepted = tcp.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                debug!("new remote-control connection from {peer}");
                let listener = Arc::clone(&listener);
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    handle_client(stream, peer, listener, shutdown).await;
                });
            }
            Err(e) => {
                // Transient (e.g. EMFILE); keep serving the clients we have.
                error!("accept error: {e}");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn handle_client(
    stream: TcpStream,
    peer: SocketAddr,
    listener: Arc<dyn HubListener>,
    shutdown: CancellationToken,
) {
    if let Err(e) = run_client(stream, peer, listener, shutdown).await {
        debug!("client {peer} ended with error: {e:#}");
    }
}

async fn run_client(
    stream: TcpStream,
    peer: SocketAddr,
    listener: Arc<dyn HubListener>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let mut ws = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer}"))?;

    let connection = Uuid::new_v4();
    info!("client {peer} connected ({connection})");
    listener.on_hub_event(HubEvent::Connected { connection, peer });

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => {
                // Best effort; the peer may already be gone.
                let _ = ws.close(None).await;
                break;
            }
            next = ws.next() => next,
        };

        match next {
            Some(Ok(WsMessage::Text(text))) => {
                dispatch_text(&text, connection, listener.as_ref());
            }
            Some(Ok(WsMessage::Binary(data))) => {
                debug!("client {peer}: binary frame ({} bytes) ignored", data.len());
            }
            Some(Ok(WsMessage::Close(_))) => break,
            // Ping replies are queued by tungstenite and flushed on the next read.
            Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
            Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) | None => break,
            Some(Err(e)) => {
                warn!("client {peer}: WebSocket error: {e}");
                break;
            }
        }
    }

    info!("client {peer} disconnected ({connection})");
    listener.on_hub_event(HubEvent::Disconnected { connection, peer });
    Ok(())
}

/// What happened to one text frame.
#[derive(Debug, Clone, PartialEq)]
enum Dispatch {
    Forwarded,
    Malformed(MalformedCommand),
    OtherEvent(String),
    Unreadable,
}

/// Parses one text frame and forwards it if it is a well-formed command.
fn dispatch_text(text: &str, connection: ConnectionId, listener: &dyn HubListener) -> Dispatch {
    let frame = match parse_client_frame(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("connection {connection}: unreadable frame: {e}");
            return Dispatch::Unreadable;
        }
    };

    if !frame.is_command() {
        debug!("connection {connection}: ignoring `{}` event", frame.event);
        return Dispatch::OtherEvent(frame.event);
    }

    match frame.into_command() {
        Ok(event) => {
            listener.on_command(connection, event);
            Dispatch::Forwarded
        }
        Err(reason) => {
            listener.on_hub_event(HubEvent::MalformedCommand {
                connection,
                reason: reason.clone(),
            });
            Dispatch::Malformed(reason)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
