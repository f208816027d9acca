//! The `Application` interface: the contract a Diameter application (e.g.
//! credit control, NASREQ) implements against a running [`crate::node::Node`].
//!
//! Upstream offers a plain synchronous `Application` and a
//! `ThreadingApplication` that hands each request to a worker pool. This
//! crate's async equivalent is a semaphore-gated `spawn` per request: once
//! the semaphore is saturated, a new request is answered locally with
//! `DIAMETER_TOO_BUSY` instead of being queued, which is the same backpressure
//! contract expressed without a thread pool.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};

use crate::avp::dictionary::codes;
use crate::avp::{Avp, AvpValue};
use crate::constants::result_code;
use crate::error::ApplicationError;
use crate::message::Message;
use crate::node::Node;
use crate::peer::Peer;

/// Implemented by a concrete Diameter application to answer requests routed
/// to it and to build outgoing requests of its own.
#[async_trait]
pub trait Application: Send + Sync {
    /// The application id this implementation claims in CER/CEA.
    fn application_id(&self) -> u32;

    /// Produces the answer for a request this application owns. Returning
    /// `Err` causes the caller to synthesize a `DIAMETER_UNABLE_TO_COMPLY`
    /// answer instead.
    async fn handle_request(&self, request: Message) -> Result<Message, ApplicationError>;
}

/// Runs an [`Application`] against a node, answering inbound requests and
/// correlating outbound ones, bounding concurrent in-flight requests to
/// `max_concurrent_requests`.
pub struct ApplicationRunner<A: Application> {
    app: Arc<A>,
    node: Arc<Node>,
    semaphore: Arc<Semaphore>,
    request_timeout: Duration,
}

impl<A: Application + 'static> ApplicationRunner<A> {
    pub fn new(app: A, node: Arc<Node>, max_concurrent_requests: usize, request_timeout: Duration) -> Self {
        ApplicationRunner {
            app: Arc::new(app),
            node,
            semaphore: Arc::new(Semaphore::new(max_concurrent_requests)),
            request_timeout,
        }
    }

    /// Registers this application's application id with the node and spawns
    /// the task that consumes requests the node routes to it. Must be
    /// called once, after the runner is wrapped in an `Arc`, before the node
    /// starts accepting connections for this application.
    pub fn start(self: &Arc<Self>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<(Peer, Message)>();
        let node = self.node.clone();
        let application_id = self.app.application_id();
        let this = self.clone();
        tokio::spawn(async move {
            node.register_application(application_id, tx).await;
            while let Some((peer, request)) = rx.recv().await {
                this.dispatch_request(peer, request);
            }
        });
    }

    /// Blocks until at least one peer configured to serve this application
    /// is `Ready`, or `timeout` elapses.
    pub async fn wait_for_ready(&self, timeout: Duration) -> Result<(), ApplicationError> {
        let application_id = self.app.application_id();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.node.has_ready_peer_for_application(application_id).await {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ApplicationError::RequestTimeout);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Sends `request`, assigning `end_to_end_id`/`application_id` if either
    /// is still zero, asks the node to route it to a peer serving its
    /// destination realm, and waits (up to `request_timeout`) for the
    /// correlated answer.
    pub async fn send_request(&self, mut request: Message) -> Result<Message, ApplicationError> {
        if request.header.application_id == 0 {
            request.header.application_id = self.app.application_id();
        }
        if request.header.end_to_end_id == 0 {
            request.header.end_to_end_id = self.node.next_end_to_end_id();
        }

        let (peer, request, rx) = self.node.route_request(self.app.application_id(), request).await?;
        peer.send_request(request)?;

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(_)) => Err(ApplicationError::EmptyAnswer),
            Err(_) => Err(ApplicationError::RequestTimeout),
        }
    }

    /// Sends an answer this application produced: asks the node which peer
    /// the originating request arrived on, via [`Node::route_answer`], and
    /// queues it there.
    pub async fn send_answer(&self, answer: Message) -> Result<(), ApplicationError> {
        let peer = self.node.route_answer(&answer).await?;
        peer.send(answer).map_err(ApplicationError::from)
    }

    /// Builds an answer envelope for `request`: same command/identifiers via
    /// [`Message::to_answer`], this node's own Origin-Host/Origin-Realm, the
    /// request's Session-Id and Proxy-Info carried over unchanged, and the
    /// given result code (plus an optional Error-Message).
    pub fn generate_answer(&self, request: &Message, result: u32, error_message: Option<&str>) -> Message {
        let mut answer = request.to_answer();
        let config = self.node.config();

        answer.avps.push(Avp::new(codes::RESULT_CODE, 0, AvpValue::Unsigned32(result), None));
        answer.avps.push(Avp::new(
            codes::ORIGIN_HOST,
            0,
            AvpValue::OctetString(config.host_identity.clone().into_bytes()),
            None,
        ));
        answer.avps.push(Avp::new(
            codes::ORIGIN_REALM,
            0,
            AvpValue::OctetString(config.realm.clone().into_bytes()),
            None,
        ));

        for avp in request.find_avps(&[(codes::SESSION_ID, 0)]) {
            answer.avps.push(avp.clone());
        }
        for avp in request.find_avps(&[(codes::PROXY_INFO, 0)]) {
            answer.avps.push(avp.clone());
        }
        if let Some(message) = error_message {
            answer.avps.push(Avp::new(codes::ERROR_MESSAGE, 0, AvpValue::Utf8String(message.to_string()), None));
        }

        answer
    }

    /// Dispatches one inbound request to the application, spawning a bounded
    /// task so a slow handler doesn't stall the rest of the peer's traffic.
    /// When the concurrency budget is exhausted, answers immediately with
    /// `DIAMETER_TOO_BUSY` rather than queuing, mirroring the upstream
    /// threading application's saturation behavior.
    fn dispatch_request(self: &Arc<Self>, peer: Peer, request: Message) {
        let this = self.clone();

        let Ok(permit) = self.semaphore.clone().try_acquire_owned() else {
            let too_busy = this.generate_answer(&request, result_code::DIAMETER_TOO_BUSY, None);
            let _ = peer.send(too_busy);
            return;
        };

        tokio::spawn(async move {
            let _permit = permit;
            let answer = match this.app.handle_request(request.clone()).await {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::warn!("application handler failed: {}", e);
                    this.generate_answer(&request, result_code::DIAMETER_UNABLE_TO_COMPLY, None)
                }
            };
            if this.send_answer(answer).await.is_err() {
                let _ = peer.send(this.generate_answer(&request, result_code::DIAMETER_UNABLE_TO_COMPLY, None));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{CommandFlags, MessageHeader};
    use crate::node::NodeConfig;

    fn dummy_request() -> Message {
        let header = MessageHeader {
            version: 1,
            length: 0,
            flags: CommandFlags { request: true, proxiable: true, error: false, retransmit: false },
            command_code: 272,
            application_id: 4,
            hop_by_hop_id: 7,
            end_to_end_id: 9,
        };
        Message::new(header, Vec::new())
    }

    struct EchoApplication;

    #[async_trait]
    impl Application for EchoApplication {
        fn application_id(&self) -> u32 {
            4
        }

        async fn handle_request(&self, request: Message) -> Result<Message, ApplicationError> {
            Ok(request.to_answer())
        }
    }

    fn test_node() -> Arc<Node> {
        Arc::new(Node::new(NodeConfig {
            host_identity: "app.example.com".to_string(),
            realm: "example.com".to_string(),
            vendor_id: 0,
            product_name: "diameter-node-test".to_string(),
            listen_address: "127.0.0.1:0".parse().unwrap(),
            supported_applications: vec![4],
            watchdog_interval: Duration::from_secs(30),
            known_peers: Default::default(),
            reject_unknown_peers: false,
        }))
    }

    #[test]
    fn generate_answer_clears_request_bit_and_sets_result_code() {
        let node = test_node();
        let runner = ApplicationRunner::new(EchoApplication, node, 4, Duration::from_secs(1));
        let req = dummy_request();
        let answer = runner.generate_answer(&req, result_code::DIAMETER_TOO_BUSY, None);
        assert!(!answer.header.flags.request);
        assert_eq!(answer.header.hop_by_hop_id, req.header.hop_by_hop_id);
        let result = answer.find_avps(&[(codes::RESULT_CODE, 0)]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].value, AvpValue::Unsigned32(result_code::DIAMETER_TOO_BUSY));
    }

    #[test]
    fn generate_answer_carries_session_id_from_request() {
        let node = test_node();
        let runner = ApplicationRunner::new(EchoApplication, node, 4, Duration::from_secs(1));
        let mut req = dummy_request();
        req.avps.push(Avp::new(codes::SESSION_ID, 0, AvpValue::Utf8String("abc;1".to_string()), None));
        let answer = runner.generate_answer(&req, result_code::DIAMETER_SUCCESS, None);
        let session = answer.find_avps(&[(codes::SESSION_ID, 0)]);
        assert_eq!(session.len(), 1);
        assert_eq!(session[0].value, AvpValue::Utf8String("abc;1".to_string()));
    }
}
