//! A single Diameter peer connection: state machine, reader/writer tasks and
//! the timers that drive CER/CEA, DWR/DWA and DPR/DPA locally.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::Instant;

use crate::avp::dictionary::AvpDictionary;
use crate::error::NodeError;
use crate::message::commands::CommandKind;
use crate::message::Message;
use crate::transport::{framed, TransportStream};

/// Where a peer connection currently sits in the RFC 6733 §5.6 state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Connecting,
    Connected,
    Ready,
    ReadyAwaitingDwa,
    Disconnecting,
    Closing,
    Closed,
}

/// Static configuration for one peer, supplied by the node at construction.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    pub host_identity: String,
    pub realm: String,
    pub address: SocketAddr,
    pub is_acceptor: bool,
    pub cer_timeout: Duration,
    pub cea_timeout: Duration,
    pub idle_timeout: Duration,
    pub dwa_timeout: Duration,
}

impl Default for PeerConfig {
    fn default() -> Self {
        PeerConfig {
            host_identity: String::new(),
            realm: String::new(),
            address: "0.0.0.0:3868".parse().unwrap(),
            is_acceptor: false,
            cer_timeout: Duration::from_secs(10),
            cea_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30),
            dwa_timeout: Duration::from_secs(10),
        }
    }
}

/// A handle to a running peer connection: cloneable, cheap, and the only way
/// the node (or an application) talks to the reader/writer tasks. Requests
/// sent through a peer are correlated to their answer at the node level
/// (`Node::route_request`/`route_answer`), not here, so the same answer
/// path works whether the eventual peer is chosen before or after the
/// request was built.
#[derive(Clone)]
pub struct Peer {
    pub config: Arc<PeerConfig>,
    pub identity: Arc<Mutex<Option<String>>>,
    state: Arc<Mutex<PeerState>>,
    outbound: mpsc::UnboundedSender<Message>,
    request_count: Arc<std::sync::atomic::AtomicU64>,
    shutdown: Arc<Notify>,
    watchdog: Arc<WatchdogClock>,
    dwr_sent_at: Arc<Mutex<Option<Instant>>>,
}

impl Peer {
    /// Spawns the reader and writer tasks for an already-connected transport
    /// stream and returns a handle plus a channel of decoded incoming
    /// commands for the node's event loop to consume.
    pub fn spawn(
        config: PeerConfig,
        stream: TransportStream,
        dict: Arc<dyn AvpDictionary>,
    ) -> (Peer, mpsc::UnboundedReceiver<CommandKind>) {
        let config = Arc::new(config);
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<CommandKind>();
        let shutdown = Arc::new(Notify::new());

        let watchdog = Arc::new(WatchdogClock::new());

        let peer = Peer {
            config: config.clone(),
            identity: Arc::new(Mutex::new(None)),
            state: Arc::new(Mutex::new(PeerState::Connecting)),
            outbound: outbound_tx,
            request_count: Arc::new(std::sync::atomic::AtomicU64::new(0)),
            shutdown: shutdown.clone(),
            watchdog: watchdog.clone(),
            dwr_sent_at: Arc::new(Mutex::new(None)),
        };

        let mut transport = framed(stream);
        let shutdown_io = shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_io.notified() => break,
                    outgoing = outbound_rx.recv() => {
                        match outgoing {
                            Some(mut msg) => {
                                let bytes = msg.encode();
                                if transport.send(Bytes::from(bytes)).await.is_err() {
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                    incoming = transport.next() => {
                        match incoming {
                            Some(Ok(frame)) => {
                                watchdog.touch().await;
                                match Message::decode(&frame, dict.as_ref()) {
                                    Ok(msg) => {
                                        let kind = crate::message::commands::type_factory(&msg.header, msg.avps);
                                        if inbound_tx.send(kind).is_err() {
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        tracing::warn!("discarding unparseable frame: {}", e);
                                    }
                                }
                            }
                            Some(Err(e)) => {
                                tracing::warn!("transport read error: {}", e);
                                break;
                            }
                            None => break,
                        }
                    }
                }
            }
            tracing::debug!("peer io task exiting");
        });

        (peer, inbound_rx)
    }

    pub async fn state(&self) -> PeerState {
        *self.state.lock().await
    }

    pub async fn set_state(&self, new_state: PeerState) {
        *self.state.lock().await = new_state;
    }

    /// Total number of requests sent over this peer's lifetime, used by the
    /// node's least-used-peer load balancing.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Queues a message for the writer task. Does not wait for an answer;
    /// pair with [`Peer::send_request`] for request/answer correlation.
    pub fn send(&self, msg: Message) -> Result<(), NodeError> {
        self.outbound
            .send(msg)
            .map_err(|_| NodeError::UnknownPeer("peer io task has exited".into()))
    }

    /// Queues a message for the writer task and bumps the request counter
    /// `Node::least_used_peer` load-balances on.
    pub fn send_request(&self, msg: Message) -> Result<(), NodeError> {
        self.request_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.send(msg)
    }

    pub fn close(&self) {
        self.shutdown.notify_waiters();
    }

    /// How long it's been since the last frame was read off this connection.
    pub async fn idle_for(&self) -> Duration {
        self.watchdog.idle_for().await
    }

    /// Records that a DWR was just sent, starting the `dwa_timeout` clock.
    pub async fn mark_dwr_sent(&self) {
        *self.dwr_sent_at.lock().await = Some(Instant::now());
    }

    /// Clears the `dwa_timeout` clock once a DWA is received.
    pub async fn clear_dwr_sent(&self) {
        *self.dwr_sent_at.lock().await = None;
    }

    /// Time elapsed since a DWR was sent, if one is still outstanding.
    pub async fn dwr_elapsed(&self) -> Option<Duration> {
        self.dwr_sent_at.lock().await.map(|at| at.elapsed())
    }
}

/// Tracks the last time any message was received from a peer, driving the
/// idle/watchdog timer described in RFC 6733 §5.5.
pub struct WatchdogClock {
    pub last_activity: Mutex<Instant>,
}

impl WatchdogClock {
    pub fn new() -> Self {
        WatchdogClock { last_activity: Mutex::new(Instant::now()) }
    }

    pub async fn touch(&self) {
        *self.last_activity.lock().await = Instant::now();
    }

    pub async fn idle_for(&self) -> Duration {
        self.last_activity.lock().await.elapsed()
    }
}

impl Default for WatchdogClock {
    fn default() -> Self {
        Self::new()
    }
}
