use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use chordring_transport::core::transport::Connection;
use chordring_transport::core::transport::TransportInterface;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;

use crate::dht::RingId;
use crate::error::Result;
use crate::rpc::RingClient;
use crate::tests::default::prepare_node;
use crate::tests::default::test_config;
use crate::transport::connections::MemoryNetwork;

async fn raw_connection(net: &MemoryNetwork, to: std::net::SocketAddrV4) -> Connection {
    net.transport(Ipv4Addr::new(10, 9, 9, 9))
        .connect(to)
        .await
        .unwrap()
}

/// Read until the peer closes, failing if it takes longer than two seconds.
async fn read_to_close(conn: &mut Connection) -> Vec<u8> {
    let mut buf = vec![];
    tokio::time::timeout(Duration::from_secs(2), conn.read_to_end(&mut buf))
        .await
        .expect("peer kept the connection open")
        .unwrap();
    buf
}

#[tokio::test]
async fn test_unknown_tag_closes_connection() -> Result<()> {
    let net = MemoryNetwork::new();
    let node = prepare_node(&net, Ipv4Addr::new(10, 0, 0, 1), 100).await?;
    node.network_create()?;

    let mut conn = raw_connection(&net, node.node_info().addr()).await;
    conn.write_all(b"X00000004abcd").await.unwrap();
    assert!(read_to_close(&mut conn).await.is_empty());

    // The node keeps serving.
    assert!(node.client().check_alive(node.node_info().addr()).await);
    Ok(())
}

#[tokio::test]
async fn test_bad_length_closes_connection() -> Result<()> {
    let net = MemoryNetwork::new();
    let node = prepare_node(&net, Ipv4Addr::new(10, 0, 0, 1), 100).await?;

    let mut conn = raw_connection(&net, node.node_info().addr()).await;
    conn.write_all(b"Szz000004").await.unwrap();
    assert!(read_to_close(&mut conn).await.is_empty());

    let mut conn = raw_connection(&net, node.node_info().addr()).await;
    conn.write_all(b"MFFFFFFFF").await.unwrap();
    assert!(read_to_close(&mut conn).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_truncated_body_does_not_hang() -> Result<()> {
    let net = MemoryNetwork::new();
    let node = prepare_node(&net, Ipv4Addr::new(10, 0, 0, 1), 100).await?;
    node.network_create()?;

    // Half-closed after 2 of the 5 declared bytes.
    let mut conn = raw_connection(&net, node.node_info().addr()).await;
    conn.write_all(b"S00000005\x00\x00").await.unwrap();
    conn.shutdown().await.unwrap();
    assert!(read_to_close(&mut conn).await.is_empty());

    // Still open but never completed, the read timeout closes it.
    let mut conn = raw_connection(&net, node.node_info().addr()).await;
    conn.write_all(b"S00000005\x00\x00").await.unwrap();
    assert!(read_to_close(&mut conn).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_frame_is_not_answered() -> Result<()> {
    let net = MemoryNetwork::new();
    let node = prepare_node(&net, Ipv4Addr::new(10, 0, 0, 1), 100).await?;

    let mut conn = raw_connection(&net, node.node_info().addr()).await;
    conn.write_all(b"000000003xyz").await.unwrap();
    assert!(read_to_close(&mut conn).await.is_empty());

    // A report arriving as a request gets the same treatment.
    let mut conn = raw_connection(&net, node.node_info().addr()).await;
    conn.write_all(b"a00000001Y").await.unwrap();
    assert!(read_to_close(&mut conn).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_find_successor_answers_raw_request() -> Result<()> {
    let net = MemoryNetwork::new();
    let node = prepare_node(&net, Ipv4Addr::new(10, 0, 0, 1), 0x0102_0304).await?;
    node.network_create()?;

    // Legacy request without ttl.
    let mut conn = raw_connection(&net, node.node_info().addr()).await;
    conn.write_all(b"S00000004\x00\x00\x00\x01").await.unwrap();
    let reply = read_to_close(&mut conn).await;

    let mut expected = b"s0000000BY".to_vec();
    expected.extend_from_slice(&node.node_info().to_bytes());
    assert_eq!(reply, expected);
    Ok(())
}

#[tokio::test]
async fn test_client_times_out_on_silent_peer() -> Result<()> {
    let net = MemoryNetwork::new();
    let node = prepare_node(&net, Ipv4Addr::new(10, 0, 0, 1), 100).await?;
    let addr = node.node_info().addr();
    net.blackhole(addr);

    let client = RingClient::new(
        Arc::new(net.transport(Ipv4Addr::new(10, 0, 0, 2))),
        &test_config(),
    );
    let started = tokio::time::Instant::now();
    let res = client.find_successor(addr, RingId::new(5), 3).await;
    assert!(res.is_err());
    assert!(started.elapsed() < Duration::from_secs(2));
    Ok(())
}
