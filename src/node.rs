//! The node: the single logical authority RFC 6733 §5.6 assumes is checking
//! every event, realized here as a central event-loop task fed by per-peer
//! reader/writer tasks over channels rather than a raw `select()` over file
//! descriptors (see the note in this crate's design notes).

use std::collections::{HashMap as StdHashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex, RwLock};

use crate::avp::dictionary::{codes, AvpDictionary, StaticDictionary};
use crate::avp::{Avp, AvpValue};
use crate::constants::{disconnect_cause, result_code};
use crate::error::NodeError;
use crate::message::commands::{
    CapabilitiesExchangeAnswer, CapabilitiesExchangeRequest, CommandKind, DeviceWatchdogAnswer,
    DeviceWatchdogRequest, DisconnectPeerAnswer, DisconnectPeerRequest,
};
use crate::message::Message;
use crate::peer::{Peer, PeerConfig, PeerState};
use crate::session::SequenceGenerator;
use crate::transport::{TransportListener, TransportStream};
use crate::uri::UriTransport;

/// Node-wide configuration: who we claim to be, and what we require of a
/// peer before it's allowed into the `Ready` state.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub host_identity: String,
    pub realm: String,
    pub vendor_id: u32,
    pub product_name: String,
    pub listen_address: SocketAddr,
    pub supported_applications: Vec<u32>,
    pub watchdog_interval: Duration,
    /// Origin-Hosts this node will accept a CER from. Empty means "accept
    /// any peer" unless `reject_unknown_peers` is set.
    pub known_peers: HashSet<String>,
    /// When true, a CER from an origin-host not in `known_peers` is answered
    /// `DIAMETER_UNKNOWN_PEER` and the connection closed (RFC 6733 §5.3).
    pub reject_unknown_peers: bool,
}

/// One entry in a realm's routing list: an ordered set of peers able to
/// serve a given application, or the realm's catch-all route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RouteApp {
    Application(u32),
    Default,
}

/// realm → {application_id | `_default`} → ordered peer-identity list,
/// mirroring the upstream routing table consulted by `route_request`.
#[derive(Debug, Default)]
struct RoutingTable {
    by_realm: StdHashMap<String, StdHashMap<RouteApp, Vec<String>>>,
}

impl RoutingTable {
    fn add_route(&mut self, realm: &str, application_id: Option<u32>, peer_identity: &str) {
        let key = application_id.map(RouteApp::Application).unwrap_or(RouteApp::Default);
        self.by_realm
            .entry(realm.to_string())
            .or_default()
            .entry(key)
            .or_default()
            .push(peer_identity.to_string());
    }

    /// Candidates for `(realm, application_id)`, falling back to the realm's
    /// `_default` list when no application-specific route is configured.
    fn candidates(&self, realm: &str, application_id: u32) -> Vec<String> {
        let Some(by_app) = self.by_realm.get(realm) else {
            return Vec::new();
        };
        by_app
            .get(&RouteApp::Application(application_id))
            .or_else(|| by_app.get(&RouteApp::Default))
            .cloned()
            .unwrap_or_default()
    }

    /// Every peer identity configured anywhere for `application_id`, used by
    /// `wait_for_ready` (it doesn't know which realm it'll be asked to serve
    /// ahead of time).
    fn all_candidates_for_application(&self, application_id: u32) -> Vec<String> {
        let mut out = Vec::new();
        for by_app in self.by_realm.values() {
            if let Some(list) = by_app.get(&RouteApp::Application(application_id)) {
                out.extend(list.iter().cloned());
            }
            if let Some(list) = by_app.get(&RouteApp::Default) {
                out.extend(list.iter().cloned());
            }
        }
        out
    }
}

/// A node: owns the listening socket, the peer table, the realm/application
/// routing table, and the correlation tables tying an in-flight request to
/// whoever is waiting on its answer.
pub struct Node {
    config: Arc<NodeConfig>,
    dict: Arc<dyn AvpDictionary>,
    peers: Arc<RwLock<StdHashMap<String, Peer>>>,
    routing: Arc<RwLock<RoutingTable>>,
    /// Requests this node routed out, waiting for their answer to come back
    /// in over the wire, keyed by `(hop_by_hop_id, end_to_end_id)`.
    awaiting_answer: Arc<Mutex<StdHashMap<(u32, u32), oneshot::Sender<Message>>>>,
    /// Inbound requests handed to an application, waiting for that
    /// application to answer so the answer can be sent back on the peer it
    /// arrived on, keyed by `(hop_by_hop_id, end_to_end_id)`.
    awaiting_response: Arc<Mutex<StdHashMap<(u32, u32), Peer>>>,
    /// Registered applications by `application_id`, fed inbound requests via
    /// an unbounded channel rather than a trait-object call so the node
    /// never blocks on a slow handler.
    applications: Arc<RwLock<StdHashMap<u32, mpsc::UnboundedSender<(Peer, Message)>>>>,
    sequence: Arc<SequenceGenerator>,
    running: Arc<AtomicBool>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        Node {
            config: Arc::new(config),
            dict: Arc::new(StaticDictionary::new()),
            peers: Arc::new(RwLock::new(StdHashMap::new())),
            routing: Arc::new(RwLock::new(RoutingTable::default())),
            awaiting_answer: Arc::new(Mutex::new(StdHashMap::new())),
            awaiting_response: Arc::new(Mutex::new(StdHashMap::new())),
            applications: Arc::new(RwLock::new(StdHashMap::new())),
            sequence: Arc::new(SequenceGenerator::new_time_seeded()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Adds `peer_identity` to the ordered candidate list consulted by
    /// `route_request` for `realm`/`application_id`. `application_id: None`
    /// registers the realm's `_default` route, used when no
    /// application-specific list matches.
    pub async fn add_route(&self, realm: &str, application_id: Option<u32>, peer_identity: &str) {
        self.routing.write().await.add_route(realm, application_id, peer_identity);
    }

    /// Registers an application's inbound channel so requests whose
    /// `application_id` matches are delivered to it instead of dropped.
    pub async fn register_application(&self, application_id: u32, sender: mpsc::UnboundedSender<(Peer, Message)>) {
        self.applications.write().await.insert(application_id, sender);
    }

    /// Binds the listen address and spawns the accept loop. Returns once
    /// the listener is bound; the accept loop itself runs in the
    /// background until [`Node::stop`] is called.
    pub async fn start(self: &Arc<Self>) -> std::io::Result<()> {
        self.running.store(true, Ordering::SeqCst);
        let listener = TransportListener::bind(self.config.listen_address).await?;
        let node = self.clone();

        tokio::spawn(async move {
            while node.running.load(Ordering::SeqCst) {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        tracing::info!("accepted connection from {}", addr);
                        node.clone().handle_inbound_connection(stream, addr);
                    }
                    Err(e) => {
                        tracing::warn!("accept failed: {}", e);
                    }
                }
            }
        });

        Ok(())
    }

    /// Stops accepting new connections and closes every peer. `force` skips
    /// sending `Disconnect-Peer-Request` and just tears the connections down.
    pub async fn stop(&self, wait: Duration, force: bool) {
        self.running.store(false, Ordering::SeqCst);
        let peers = self.peers.read().await;
        for peer in peers.values() {
            if !force {
                let dpr = DisconnectPeerRequest {
                    origin_host: Some(self.config.host_identity.clone().into_bytes()),
                    origin_realm: Some(self.config.realm.clone().into_bytes()),
                    disconnect_cause: Some(disconnect_cause::REBOOTING),
                    additional_avps: Vec::new(),
                };
                if let Ok(msg) = dpr.into_message(self.sequence.next(), self.sequence.next()) {
                    let _ = peer.send(msg);
                }
            }
        }
        tokio::time::sleep(wait).await;
        for peer in peers.values() {
            peer.close();
        }
    }

    fn handle_inbound_connection(self: Arc<Self>, stream: TransportStream, addr: SocketAddr) {
        let config = PeerConfig { address: addr, is_acceptor: true, ..PeerConfig::default() };
        let dict = self.dict.clone();
        let (peer, mut inbound) = Peer::spawn(config, stream, dict);
        tokio::spawn(async move {
            self.drive_peer(peer, &mut inbound).await;
        });
    }

    /// Connects outbound to a known peer by URI and brings it through the
    /// CER/CEA handshake.
    pub async fn connect(self: &Arc<Self>, addr: SocketAddr, transport: UriTransport) -> Result<(), NodeError> {
        let stream = TransportStream::connect(addr, transport)
            .await
            .map_err(|e| NodeError::NotRoutable(e.to_string()))?;
        let config = PeerConfig { address: addr, is_acceptor: false, ..PeerConfig::default() };
        let (peer, mut inbound) = Peer::spawn(config, stream, self.dict.clone());

        let cer = CapabilitiesExchangeRequest {
            origin_host: Some(self.config.host_identity.clone().into_bytes()),
            origin_realm: Some(self.config.realm.clone().into_bytes()),
            host_ip_address: Vec::new(),
            vendor_id: Some(self.config.vendor_id),
            product_name: Some(self.config.product_name.clone()),
            auth_application_id: self.config.supported_applications.clone(),
            ..Default::default()
        };
        let msg = cer
            .into_message(self.sequence.next(), self.sequence.next())
            .map_err(|e| NodeError::NotRoutable(e.to_string()))?;
        peer.send(msg)?;

        let node = self.clone();
        tokio::spawn(async move {
            node.drive_peer(peer, &mut inbound).await;
        });
        Ok(())
    }

    /// Resolves a peer to carry `msg` for `application_id`: looks up the
    /// realm in `msg`'s `Destination-Realm` AVP (falling back to this
    /// node's own realm when absent), picks the least-used `Ready` peer
    /// configured to serve that realm/application, assigns a hop-by-hop id
    /// if `msg` doesn't already carry one, and records the `(hbh, e2e)` pair
    /// in `awaiting_answer` so the answer can find its way back here.
    pub async fn route_request(
        &self,
        application_id: u32,
        mut msg: Message,
    ) -> Result<(Peer, Message, oneshot::Receiver<Message>), NodeError> {
        let realm = destination_realm(&msg).unwrap_or_else(|| self.config.realm.clone());
        let peer = self
            .least_used_peer(&realm, application_id)
            .await
            .ok_or_else(|| NodeError::NotRoutable(format!("no ready peer for realm {} application {}", realm, application_id)))?;

        if msg.header.hop_by_hop_id == 0 {
            msg.header.hop_by_hop_id = self.sequence.next();
        }
        let key = (msg.header.hop_by_hop_id, msg.header.end_to_end_id);
        let (tx, rx) = oneshot::channel();
        self.awaiting_answer.lock().await.insert(key, tx);

        Ok((peer, msg, rx))
    }

    /// Resolves the peer an application's answer should go out on: the peer
    /// that delivered the original request, recorded in `awaiting_response`
    /// when it was dispatched. Fails `NotRoutable` if nothing is waiting for
    /// this answer, or the peer it was waiting on is no longer `Ready`.
    pub async fn route_answer(&self, msg: &Message) -> Result<Peer, NodeError> {
        let key = (msg.header.hop_by_hop_id, msg.header.end_to_end_id);
        let peer = self
            .awaiting_response
            .lock()
            .await
            .remove(&key)
            .ok_or_else(|| NodeError::NotRoutable("no request is awaiting this answer".into()))?;
        if !matches!(peer.state().await, PeerState::Ready | PeerState::ReadyAwaitingDwa) {
            return Err(NodeError::NotRoutable("peer for this answer is no longer ready".into()));
        }
        Ok(peer)
    }

    /// Hands a decoded answer for an application-level request to whoever
    /// is waiting on it in `awaiting_answer`, dropping it silently if
    /// nothing matches (an unsolicited or duplicate answer).
    async fn resolve_answer(&self, msg: Message) {
        let key = (msg.header.hop_by_hop_id, msg.header.end_to_end_id);
        if let Some(tx) = self.awaiting_answer.lock().await.remove(&key) {
            let _ = tx.send(msg);
        } else {
            tracing::debug!("discarding answer with no waiter: hbh={} e2e={}", key.0, key.1);
        }
    }

    /// Validates and dispatches one inbound request to its registered
    /// application, or auto-answers when it can't be routed any further.
    async fn dispatch_request(&self, peer: &Peer, msg: Message) {
        if let Some(missing) = missing_mandatory_avp(&msg) {
            let answer = missing_avp_answer(&msg, missing);
            let _ = peer.send(answer);
            return;
        }

        let realm = destination_realm(&msg);
        if realm.as_deref() != Some(self.config.realm.as_str()) {
            let answer = result_answer(&msg, result_code::DIAMETER_REALM_NOT_SERVED);
            let _ = peer.send(answer);
            return;
        }

        let application_id = msg.header.application_id;
        let sender = self.applications.read().await.get(&application_id).cloned();
        match sender {
            Some(sender) => {
                let key = (msg.header.hop_by_hop_id, msg.header.end_to_end_id);
                self.awaiting_response.lock().await.insert(key, peer.clone());
                if sender.send((peer.clone(), msg)).is_err() {
                    self.awaiting_response.lock().await.remove(&key);
                }
            }
            None => {
                let answer = result_answer(&msg, result_code::DIAMETER_APPLICATION_UNSUPPORTED);
                let _ = peer.send(answer);
            }
        }
    }

    /// The per-peer event loop: consumes decoded commands off that peer's
    /// inbound channel, advances the state machine, answers CER/DWR/DPR
    /// locally, and routes anything else to a registered application.
    ///
    /// The ticker only checks timers, on a cadence independent of
    /// `watchdog_interval`; it sends a `Device-Watchdog-Request` once the
    /// peer has been `Ready` and idle (no inbound traffic) for at least
    /// `idle_timeout`, and closes a peer that doesn't answer a DWR within
    /// `dwa_timeout` (RFC 6733 §5.5.1).
    async fn drive_peer(self: Arc<Self>, peer: Peer, inbound: &mut mpsc::UnboundedReceiver<CommandKind>) {
        peer.set_state(PeerState::Connecting).await;
        let mut watchdog = tokio::time::interval(self.config.watchdog_interval.min(Duration::from_secs(1)));
        watchdog.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = inbound.recv() => {
                    let Some(cmd) = cmd else { break };
                    match cmd {
                        CommandKind::Cer(cer) => self.handle_cer(&peer, cer).await,
                        CommandKind::Cea(cea) => self.handle_cea(&peer, cea).await,
                        CommandKind::Dwr(dwr) => self.handle_dwr(&peer, dwr).await,
                        CommandKind::Dwa(_) => {
                            peer.clear_dwr_sent().await;
                            peer.set_state(PeerState::Ready).await;
                        }
                        CommandKind::Dpr(dpr) => {
                            self.handle_dpr(&peer, dpr).await;
                            break;
                        }
                        CommandKind::Dpa(_) => break,
                        CommandKind::Undefined(msg) => {
                            if msg.header.is_request() {
                                self.dispatch_request(&peer, msg).await;
                            } else {
                                self.resolve_answer(msg).await;
                            }
                        }
                    }
                }
                _ = watchdog.tick() => {
                    match peer.state().await {
                        PeerState::Ready => {
                            if peer.idle_for().await >= peer.config.idle_timeout {
                                self.send_dwr(&peer).await;
                                peer.mark_dwr_sent().await;
                                peer.set_state(PeerState::ReadyAwaitingDwa).await;
                            }
                        }
                        PeerState::ReadyAwaitingDwa => {
                            if peer.dwr_elapsed().await.map(|e| e >= peer.config.dwa_timeout).unwrap_or(false) {
                                tracing::warn!("peer missed DWA within dwa_timeout, closing");
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        peer.set_state(PeerState::Closed).await;
        peer.close();
        if let Some(identity) = peer.identity.lock().await.clone() {
            self.peers.write().await.remove(&identity);
        }
    }

    async fn send_dwr(&self, peer: &Peer) {
        let dwr = DeviceWatchdogRequest {
            origin_host: Some(self.config.host_identity.clone().into_bytes()),
            origin_realm: Some(self.config.realm.clone().into_bytes()),
            origin_state_id: None,
            additional_avps: Vec::new(),
        };
        if let Ok(msg) = dwr.into_message(self.sequence.next(), self.sequence.next()) {
            let _ = peer.send(msg);
        }
    }

    async fn handle_cer(&self, peer: &Peer, cer: CapabilitiesExchangeRequest) {
        let origin_host = cer.origin_host.clone().unwrap_or_default();
        let origin_host_str = String::from_utf8_lossy(&origin_host).to_string();

        // A self-connection never enters the §5.6.4 tie-break: we refuse it
        // outright, since electing against ourselves is meaningless.
        if origin_host_str == self.config.host_identity {
            self.answer_cer(peer, result_code::DIAMETER_UNKNOWN_PEER).await;
            peer.set_state(PeerState::Disconnecting).await;
            peer.close();
            return;
        }

        if self.config.reject_unknown_peers && !self.config.known_peers.contains(&origin_host_str) {
            self.answer_cer(peer, result_code::DIAMETER_UNKNOWN_PEER).await;
            peer.set_state(PeerState::Closing).await;
            peer.close();
            return;
        }

        let common = cer
            .auth_application_id
            .iter()
            .any(|id| self.config.supported_applications.contains(id))
            || cer.auth_application_id.is_empty();
        if !common {
            self.answer_cer(peer, result_code::DIAMETER_NO_COMMON_APPLICATION).await;
            peer.set_state(PeerState::Disconnecting).await;
            peer.close();
            return;
        }

        // RFC 6733 §5.6.4 election: a second connection for an origin-host we
        // already have a Ready peer for is resolved by a case-insensitive
        // lexicographic compare of the two Origin-Hosts. Whichever side's
        // compare goes the other way closes the connection it was told to, so
        // the outcome is antisymmetric regardless of which side is asked.
        let existing = self.peers.read().await.get(&origin_host_str).cloned();
        if let Some(existing_peer) = existing {
            if matches!(existing_peer.state().await, PeerState::Ready | PeerState::ReadyAwaitingDwa) {
                let we_win = self.config.host_identity.to_lowercase() > origin_host_str.to_lowercase();
                if we_win {
                    self.peers.write().await.remove(&origin_host_str);
                    existing_peer.set_state(PeerState::Closing).await;
                    existing_peer.close();
                } else {
                    self.answer_cer(peer, result_code::DIAMETER_ELECTION_LOST).await;
                    peer.set_state(PeerState::Disconnecting).await;
                    peer.close();
                    return;
                }
            }
        }

        *peer.identity.lock().await = Some(origin_host_str.clone());
        self.peers.write().await.insert(origin_host_str, peer.clone());
        peer.set_state(PeerState::Ready).await;
        self.answer_cer(peer, result_code::DIAMETER_SUCCESS).await;
    }

    async fn answer_cer(&self, peer: &Peer, result: u32) {
        let cea = CapabilitiesExchangeAnswer {
            result_code: Some(result),
            origin_host: Some(self.config.host_identity.clone().into_bytes()),
            origin_realm: Some(self.config.realm.clone().into_bytes()),
            host_ip_address: Vec::new(),
            vendor_id: Some(self.config.vendor_id),
            product_name: Some(self.config.product_name.clone()),
            auth_application_id: self.config.supported_applications.clone(),
            ..Default::default()
        };
        if let Ok(msg) = cea.into_message(self.sequence.next(), self.sequence.next()) {
            let _ = peer.send(msg);
        }
    }

    async fn handle_cea(&self, peer: &Peer, cea: CapabilitiesExchangeAnswer) {
        if cea.result_code == Some(result_code::DIAMETER_SUCCESS) {
            if let Some(origin_host) = cea.origin_host.clone() {
                let origin_host_str = String::from_utf8_lossy(&origin_host).to_string();
                *peer.identity.lock().await = Some(origin_host_str.clone());
                self.peers.write().await.insert(origin_host_str, peer.clone());
            }
            peer.set_state(PeerState::Ready).await;
        } else {
            peer.set_state(PeerState::Closing).await;
            peer.close();
        }
    }

    async fn handle_dwr(&self, peer: &Peer, _dwr: DeviceWatchdogRequest) {
        let dwa = DeviceWatchdogAnswer {
            result_code: Some(result_code::DIAMETER_SUCCESS),
            origin_host: Some(self.config.host_identity.clone().into_bytes()),
            origin_realm: Some(self.config.realm.clone().into_bytes()),
            ..Default::default()
        };
        if let Ok(msg) = dwa.into_message(self.sequence.next(), self.sequence.next()) {
            let _ = peer.send(msg);
        }
    }

    async fn handle_dpr(&self, peer: &Peer, _dpr: DisconnectPeerRequest) {
        let dpa = DisconnectPeerAnswer {
            result_code: Some(result_code::DIAMETER_SUCCESS),
            origin_host: Some(self.config.host_identity.clone().into_bytes()),
            origin_realm: Some(self.config.realm.clone().into_bytes()),
            ..Default::default()
        };
        if let Ok(msg) = dpa.into_message(self.sequence.next(), self.sequence.next()) {
            let _ = peer.send(msg);
        }
        peer.set_state(PeerState::Closing).await;
    }

    /// Picks the peer with the fewest requests sent so far among those
    /// currently `Ready`, restricted to the candidates configured for
    /// `realm`/`application_id` via [`Node::add_route`].
    pub async fn least_used_peer(&self, realm: &str, application_id: u32) -> Option<Peer> {
        let candidates = self.routing.read().await.candidates(realm, application_id);
        self.least_used_among(&candidates).await
    }

    async fn least_used_among(&self, candidates: &[String]) -> Option<Peer> {
        let peers = self.peers.read().await;
        let mut best: Option<&Peer> = None;
        for identity in candidates {
            if let Some(peer) = peers.get(identity) {
                if peer.state().await != PeerState::Ready {
                    continue;
                }
                best = match best {
                    None => Some(peer),
                    Some(current) if peer.request_count() < current.request_count() => Some(peer),
                    Some(current) => Some(current),
                };
            }
        }
        best.cloned()
    }

    /// Whether at least one peer configured (anywhere) to serve
    /// `application_id` currently has a `Ready` connection.
    pub async fn has_ready_peer_for_application(&self, application_id: u32) -> bool {
        let candidates = self.routing.read().await.all_candidates_for_application(application_id);
        for identity in candidates {
            if let Some(peer) = self.peer(&identity).await {
                if peer.state().await == PeerState::Ready {
                    return true;
                }
            }
        }
        false
    }

    pub async fn peer(&self, identity: &str) -> Option<Peer> {
        self.peers.read().await.get(identity).cloned()
    }

    pub fn next_hop_by_hop_id(&self) -> u32 {
        self.sequence.next()
    }

    pub fn next_end_to_end_id(&self) -> u32 {
        self.sequence.next()
    }

    pub fn config(&self) -> &Arc<NodeConfig> {
        &self.config
    }
}

/// Reads `Destination-Realm` off a message, if present.
fn destination_realm(msg: &Message) -> Option<String> {
    msg.find_avps(&[(codes::DESTINATION_REALM, 0)])
        .first()
        .and_then(|avp| match &avp.value {
            AvpValue::OctetString(bytes) => Some(String::from_utf8_lossy(bytes).to_string()),
            AvpValue::Utf8String(s) => Some(s.clone()),
            _ => None,
        })
}

/// The base AVPs RFC 6733 §6.3 requires on every request; returns the first
/// one missing from `msg`, if any.
fn missing_mandatory_avp(msg: &Message) -> Option<u32> {
    for code in [codes::ORIGIN_HOST, codes::ORIGIN_REALM, codes::DESTINATION_REALM] {
        if msg.find_avps(&[(code, 0)]).is_empty() {
            return Some(code);
        }
    }
    None
}

fn result_answer(request: &Message, result: u32) -> Message {
    let mut answer = request.to_answer();
    answer.avps.push(Avp::new(codes::RESULT_CODE, 0, AvpValue::Unsigned32(result), None));
    answer
}

/// Builds a `DIAMETER_MISSING_AVP` answer with a `Failed-AVP` grouped AVP
/// naming the missing code (carried as an empty-valued placeholder, since
/// there is no AVP instance to echo back).
fn missing_avp_answer(request: &Message, missing_code: u32) -> Message {
    let mut answer = result_answer(request, result_code::DIAMETER_MISSING_AVP);
    let placeholder = Avp::new(missing_code, 0, AvpValue::OctetString(Vec::new()), None);
    answer.avps.push(Avp::new(codes::FAILED_AVP, 0, AvpValue::Grouped(vec![placeholder]), None));
    answer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{CommandFlags, MessageHeader};

    fn request_with(avps: Vec<Avp>) -> Message {
        let header = MessageHeader {
            version: 1,
            length: 0,
            flags: CommandFlags { request: true, proxiable: true, error: false, retransmit: false },
            command_code: 999,
            application_id: 4,
            hop_by_hop_id: 11,
            end_to_end_id: 22,
        };
        Message::new(header, avps)
    }

    fn base_avps() -> Vec<Avp> {
        vec![
            Avp::new(codes::ORIGIN_HOST, 0, AvpValue::OctetString(b"client.example.com".to_vec()), None),
            Avp::new(codes::ORIGIN_REALM, 0, AvpValue::OctetString(b"example.com".to_vec()), None),
            Avp::new(codes::DESTINATION_REALM, 0, AvpValue::OctetString(b"example.com".to_vec()), None),
        ]
    }

    #[test]
    fn missing_mandatory_avp_flags_absent_destination_realm() {
        let msg = request_with(vec![
            Avp::new(codes::ORIGIN_HOST, 0, AvpValue::OctetString(b"client.example.com".to_vec()), None),
            Avp::new(codes::ORIGIN_REALM, 0, AvpValue::OctetString(b"example.com".to_vec()), None),
        ]);
        assert_eq!(missing_mandatory_avp(&msg), Some(codes::DESTINATION_REALM));
    }

    #[test]
    fn missing_mandatory_avp_passes_when_all_present() {
        let msg = request_with(base_avps());
        assert_eq!(missing_mandatory_avp(&msg), None);
    }

    #[test]
    fn missing_avp_answer_carries_result_code_and_failed_avp() {
        let msg = request_with(base_avps());
        let answer = missing_avp_answer(&msg, codes::DESTINATION_REALM);
        assert!(!answer.header.flags.request);
        let result = answer.find_avps(&[(codes::RESULT_CODE, 0)]);
        assert_eq!(result[0].value, AvpValue::Unsigned32(result_code::DIAMETER_MISSING_AVP));
        let failed = answer.find_avps(&[(codes::FAILED_AVP, 0), (codes::DESTINATION_REALM, 0)]);
        assert_eq!(failed.len(), 1);
    }

    #[test]
    fn destination_realm_reads_octet_string_avp() {
        let msg = request_with(base_avps());
        assert_eq!(destination_realm(&msg), Some("example.com".to_string()));
    }

    #[test]
    fn destination_realm_absent_returns_none() {
        let msg = request_with(Vec::new());
        assert_eq!(destination_realm(&msg), None);
    }

    #[test]
    fn routing_table_falls_back_to_default_route() {
        let mut table = RoutingTable::default();
        table.add_route("example.com", None, "fallback.example.com");
        table.add_route("example.com", Some(4), "cc.example.com");

        assert_eq!(table.candidates("example.com", 4), vec!["cc.example.com".to_string()]);
        assert_eq!(table.candidates("example.com", 7), vec!["fallback.example.com".to_string()]);
        assert!(table.candidates("other.example.com", 4).is_empty());
    }

    #[test]
    fn routing_table_collects_candidates_across_realms() {
        let mut table = RoutingTable::default();
        table.add_route("a.example.com", Some(4), "peer-a");
        table.add_route("b.example.com", Some(4), "peer-b");
        table.add_route("b.example.com", None, "peer-default");

        let mut candidates = table.all_candidates_for_application(4);
        candidates.sort();
        assert_eq!(candidates, vec!["peer-a".to_string(), "peer-b".to_string(), "peer-default".to_string()]);
    }
}
