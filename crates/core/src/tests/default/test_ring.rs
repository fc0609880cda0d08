use std::time::Duration;

use futures::StreamExt;

use crate::dht::RingId;
use crate::error::Error;
use crate::error::Result;
use crate::message::Message;
use crate::node::NodeState;
use crate::tests::default::expected_owner;
use crate::tests::default::host;
use crate::tests::default::prepare_node;
use crate::tests::default::prepare_ring;
use crate::tests::default::stabilize_all;
use crate::tests::default::ChannelHandler;
use crate::transport::connections::MemoryNetwork;

#[tokio::test]
async fn test_single_node_ring_owns_everything() -> Result<()> {
    let net = MemoryNetwork::new();
    let node = prepare_node(&net, host(0), RingId::from_name("alice").value()).await?;
    assert_eq!(node.state()?, NodeState::Created);
    node.network_create()?;
    assert_eq!(node.state()?, NodeState::Joined);

    let me = node.node_info();
    assert_eq!(node.find_successor(me.id).await?, me);
    assert_eq!(node.find_successor(RingId::new(0)).await?, me);
    assert_eq!(node.find_successor(RingId::new(u32::MAX)).await?, me);
    assert_eq!(node.topo_info()?.predecessor, Some(me));

    // A single round changes nothing.
    node.stabilizer().stabilize().await?;
    node.stabilizer().fix_fingers().await?;
    assert_eq!(node.find_successor(RingId::new(42)).await?, me);
    Ok(())
}

#[tokio::test]
async fn test_create_twice_is_rejected() -> Result<()> {
    let net = MemoryNetwork::new();
    let node = prepare_node(&net, host(0), 10).await?;
    node.network_create()?;
    assert!(matches!(
        node.network_create(),
        Err(Error::InvalidState(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_two_node_ring_converges() -> Result<()> {
    let net = MemoryNetwork::new();
    let nodes = prepare_ring(&net, &[1000, 2_000_000]).await?;
    let a = &nodes[0];
    let b = &nodes[1];
    assert_eq!(b.state()?, NodeState::Joined);

    stabilize_all(&nodes, 2).await?;

    let a_info = a.node_info();
    let b_info = b.node_info();
    assert_eq!(a.dht().successor()?, b_info);
    assert_eq!(b.dht().successor()?, a_info);
    assert_eq!(a.topo_info()?.predecessor, Some(b_info));
    assert_eq!(b.topo_info()?.predecessor, Some(a_info));
    Ok(())
}

#[tokio::test]
async fn test_lookup_on_converged_ring() -> Result<()> {
    let ids = [
        0x1000_0000,
        0xD000_0000,
        0x4000_0000,
        0xA000_0000,
        0x7000_0000,
        0x0000_0010,
    ];
    let net = MemoryNetwork::new();
    let nodes = prepare_ring(&net, &ids).await?;
    stabilize_all(&nodes, ids.len() * 2).await?;

    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    for node in nodes.iter() {
        let me = node.id().value();
        let pos = sorted.iter().position(|i| *i == me).unwrap();
        let next = sorted[(pos + 1) % sorted.len()];
        let prev = sorted[(pos + sorted.len() - 1) % sorted.len()];
        assert_eq!(node.dht().successor()?.id.value(), next, "successor of {:#x}", me);
        assert_eq!(
            node.topo_info()?.predecessor.map(|p| p.id.value()),
            Some(prev),
            "predecessor of {:#x}",
            me
        );
    }

    let mut targets = vec![0, u32::MAX, 0x0000_0011, 0x8000_0000];
    for id in ids {
        targets.push(id);
        targets.push(id.wrapping_add(1));
        targets.push(id.wrapping_sub(1));
    }
    for node in nodes.iter() {
        for target in targets.iter() {
            let found = node.find_successor(RingId::new(*target)).await?;
            assert_eq!(
                found.id.value(),
                expected_owner(&ids, *target),
                "lookup of {:#x} from {:#x}",
                target,
                node.id().value()
            );
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_successor_list_fills_up() -> Result<()> {
    let ids = [100, 200, 300, 400, 500];
    let net = MemoryNetwork::new();
    let nodes = prepare_ring(&net, &ids).await?;
    stabilize_all(&nodes, ids.len() * 2).await?;

    let successors: Vec<u32> = nodes[0]
        .topo_info()?
        .successors
        .iter()
        .map(|n| n.id.value())
        .collect();
    assert_eq!(successors, vec![200, 300, 400]);

    let successors: Vec<u32> = nodes[4]
        .topo_info()?
        .successors
        .iter()
        .map(|n| n.id.value())
        .collect();
    assert_eq!(successors, vec![100, 200, 300]);
    Ok(())
}

#[tokio::test]
async fn test_join_with_taken_id() -> Result<()> {
    let net = MemoryNetwork::new();
    let a = prepare_node(&net, host(0), 77).await?;
    a.network_create()?;
    let b = prepare_node(&net, host(1), 77).await?;

    let res = b.network_join(a.node_info().addr()).await;
    assert!(matches!(res, Err(Error::DuplicateId(_))), "{:?}", res);
    assert_eq!(b.state()?, NodeState::Created);
    Ok(())
}

#[tokio::test]
async fn test_join_unreachable_bootstrap() -> Result<()> {
    let net = MemoryNetwork::new();
    let node = prepare_node(&net, host(0), 77).await?;

    let res = node.network_join(std::net::SocketAddrV4::new(host(9), 7000)).await;
    assert!(matches!(res, Err(Error::JoinFailed(_))), "{:?}", res);
    assert_eq!(node.state()?, NodeState::Created);

    // Nothing is broken, a later create works.
    node.network_create()?;
    assert_eq!(node.state()?, NodeState::Joined);
    Ok(())
}

#[tokio::test]
async fn test_join_through_node_outside_ring_fails() -> Result<()> {
    let net = MemoryNetwork::new();
    let b = prepare_node(&net, host(0), 1000).await?;
    let c = prepare_node(&net, host(1), 3000).await?;

    // b is listening but never created or joined a ring.
    let res = c.network_join(b.node_info().addr()).await;
    assert!(matches!(res, Err(Error::JoinFailed(_))), "{:?}", res);
    assert_eq!(c.state()?, NodeState::Created);
    assert_eq!(b.state()?, NodeState::Created);

    assert!(matches!(
        b.find_successor(RingId::new(3000)).await,
        Err(Error::InvalidState(_))
    ));
    let client = c.client();
    assert_eq!(
        client
            .find_successor(b.node_info().addr(), RingId::new(3000), 4)
            .await?,
        None
    );
    assert!(!client.notify(b.node_info().addr(), c.node_info()).await?);
    assert_eq!(b.topo_info()?.predecessor, None);

    // Once b creates a ring the same join goes through.
    b.network_create()?;
    assert_eq!(c.network_join(b.node_info().addr()).await?, b.node_info());
    assert_eq!(c.state()?, NodeState::Joined);
    Ok(())
}

#[tokio::test]
async fn test_route_message_reaches_owner() -> Result<()> {
    let ids = [1000, 5000, 9000];
    let net = MemoryNetwork::new();
    let nodes = prepare_ring(&net, &ids).await?;
    stabilize_all(&nodes, 4).await?;

    let (handler, mut rx) = ChannelHandler::new();
    nodes[1].set_app_message_handler(handler)?;

    let owner = nodes[0].route_message(RingId::new(4000), "hello").await?;
    assert_eq!(owner, nodes[1].node_info());

    let (msg, payload) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload.as_ref(), b"hello");
    assert_eq!(*msg.from.ip(), nodes[0].node_info().ip);
    Ok(())
}

#[tokio::test]
async fn test_connect_and_send_gets_reply() -> Result<()> {
    let net = MemoryNetwork::new();
    let nodes = prepare_ring(&net, &[1000, 5000]).await?;

    let (handler, mut rx) = ChannelHandler::new();
    nodes[1].set_app_message_handler(handler)?;

    let mut stream = nodes[0]
        .connect_and_send(nodes[1].node_info().addr(), "ping")
        .await?;
    let (mut msg, payload) = rx.recv().await.unwrap();
    assert_eq!(payload.as_ref(), b"ping");
    msg.reply("pong").await?;

    match stream.next().await {
        Some(Ok(Message::CustomMessage(m))) => assert_eq!(m.0.as_ref(), b"pong"),
        other => panic!("unexpected reply {:?}", other),
    }

    drop(msg);
    assert!(stream.next().await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_app_message_without_handler_is_dropped() -> Result<()> {
    let net = MemoryNetwork::new();
    let nodes = prepare_ring(&net, &[1000, 5000]).await?;

    let mut stream = nodes[0]
        .connect_and_send(nodes[1].node_info().addr(), "nobody listens")
        .await?;
    assert!(stream.next().await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_shutdown_stops_listening() -> Result<()> {
    let net = MemoryNetwork::new();
    let node = prepare_node(&net, host(0), 10).await?;
    node.network_create()?;
    let addr = node.node_info().addr();
    assert!(net.is_listening(&addr));

    node.shutdown()?;
    assert_eq!(node.state()?, NodeState::Destroyed);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!net.is_listening(&addr));
    Ok(())
}
