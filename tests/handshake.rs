//! End-to-end loopback test: two nodes complete CER/CEA over real TCP
//! sockets and both land in the `Ready` state.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use diameter_node::node::{Node, NodeConfig};
use diameter_node::uri::UriTransport;
use diameter_node::PeerState;

fn config(identity: &str, port: u16) -> NodeConfig {
    NodeConfig {
        host_identity: identity.to_string(),
        realm: "example.com".to_string(),
        vendor_id: 0,
        product_name: "diameter-node-test".to_string(),
        listen_address: format!("127.0.0.1:{}", port).parse().unwrap(),
        supported_applications: vec![0],
        watchdog_interval: Duration::from_secs(30),
        known_peers: Default::default(),
        reject_unknown_peers: false,
    }
}

async fn wait_until_ready(node: &Arc<Node>, identity: &str) -> diameter_node::Peer {
    for _ in 0..50 {
        if let Some(peer) = node.peer(identity).await {
            if peer.state().await == PeerState::Ready {
                return peer;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("peer {} never reached Ready", identity);
}

#[tokio::test]
async fn cer_cea_handshake_brings_both_sides_to_ready() {
    let addr_a: SocketAddr = "127.0.0.1:38680".parse().unwrap();
    let addr_b: SocketAddr = "127.0.0.1:38681".parse().unwrap();

    let node_a = Arc::new(Node::new(config("a.example.com", 38680)));
    let node_b = Arc::new(Node::new(config("b.example.com", 38681)));

    node_a.start().await.unwrap();
    node_b.start().await.unwrap();

    // Give both accept loops a moment to start listening.
    tokio::time::sleep(Duration::from_millis(50)).await;

    node_a.connect(addr_b, UriTransport::Tcp).await.unwrap();

    let peer_on_a = wait_until_ready(&node_a, "b.example.com").await;
    let peer_on_b = wait_until_ready(&node_b, "a.example.com").await;

    assert_eq!(peer_on_a.state().await, PeerState::Ready);
    assert_eq!(peer_on_b.state().await, PeerState::Ready);

    node_a.stop(Duration::from_millis(50), true).await;
    node_b.stop(Duration::from_millis(50), true).await;
}

#[tokio::test]
async fn self_connection_is_rejected() {
    let addr: SocketAddr = "127.0.0.1:38682".parse().unwrap();
    let node = Arc::new(Node::new(config("self.example.com", 38682)));
    node.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Connect to ourselves: the CER we send carries our own Origin-Host, so
    // the accepting side must refuse it rather than entering an election.
    node.connect(addr, UriTransport::Tcp).await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(node.peer("self.example.com").await.is_none());

    node.stop(Duration::from_millis(50), true).await;
}
