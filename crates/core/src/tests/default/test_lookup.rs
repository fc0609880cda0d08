use std::time::Duration;

use crate::dht::NodeInfo;
use crate::dht::RingId;
use crate::error::Error;
use crate::error::Result;
use crate::tests::default::host;
use crate::tests::default::prepare_ring;
use crate::tests::default::stabilize_all;
use crate::tests::default::TEST_PORT;
use crate::transport::connections::MemoryNetwork;

fn finger_holds(node: &crate::node::RingNode, id: RingId) -> Result<bool> {
    Ok(node.dht().lock_finger()?.contains(id))
}

#[tokio::test]
async fn test_lookup_at_ttl_zero_is_answered_only_locally() -> Result<()> {
    let net = MemoryNetwork::new();
    let nodes = prepare_ring(&net, &[100, 200, 300]).await?;
    stabilize_all(&nodes, 6).await?;
    let addr = nodes[0].node_info().addr();
    let client = nodes[0].client();

    // 150 is in (100, 200], no forwarding needed.
    assert_eq!(
        client.find_successor(addr, RingId::new(150), 0).await?,
        Some(nodes[1].node_info())
    );
    // 300 would have to be forwarded, there are no hops left.
    assert_eq!(client.find_successor(addr, RingId::new(300), 0).await?, None);
    // One hop is enough to reach 200, which owns 250.
    assert_eq!(
        client.find_successor(addr, RingId::new(250), 1).await?,
        Some(nodes[2].node_info())
    );
    Ok(())
}

#[tokio::test]
async fn test_refusing_finger_is_dropped_and_lookup_retried() -> Result<()> {
    let ids = [0, 0x4000_0000, 0x8000_0000, 0xC000_0000];
    let net = MemoryNetwork::new();
    let nodes = prepare_ring(&net, &ids).await?;
    stabilize_all(&nodes, 8).await?;

    // Nobody listens there.
    let gone = NodeInfo::new(RingId::new(0xA000_0000), host(50), TEST_PORT);
    nodes[0].dht().set_finger(31, Some(gone))?;

    let owner = nodes[0].find_successor(RingId::new(0xB000_0000)).await?;
    assert_eq!(owner, nodes[3].node_info());
    assert!(!finger_holds(&nodes[0], gone.id)?);
    assert!(finger_holds(&nodes[0], nodes[1].id())?);
    Ok(())
}

#[tokio::test]
async fn test_silent_finger_is_dropped() -> Result<()> {
    let ids = [0, 0x4000_0000, 0x8000_0000, 0xC000_0000];
    let net = MemoryNetwork::new();
    let nodes = prepare_ring(&net, &ids).await?;
    stabilize_all(&nodes, 8).await?;

    let silent = NodeInfo::new(RingId::new(0xA000_0000), host(50), TEST_PORT);
    net.blackhole(silent.addr());
    nodes[0].dht().set_finger(31, Some(silent))?;

    let res = nodes[0].find_successor(RingId::new(0xB000_0000)).await;
    assert!(matches!(res, Err(Error::RpcTimeout)), "{:?}", res);
    assert!(!finger_holds(&nodes[0], silent.id)?);

    // The next lookup takes the remaining fingers.
    let owner = nodes[0].find_successor(RingId::new(0xB000_0000)).await?;
    assert_eq!(owner, nodes[3].node_info());
    Ok(())
}

#[tokio::test]
async fn test_failing_successor_is_not_retried() -> Result<()> {
    let net = MemoryNetwork::new();
    let mut nodes = prepare_ring(&net, &[0, 0x4000_0000, 0x8000_0000]).await?;
    stabilize_all(&nodes, 6).await?;

    let succ = nodes.remove(1);
    let succ_info = succ.node_info();
    succ.shutdown()?;
    drop(succ);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // 0x60000000 goes through the successor, which refuses.
    let res = nodes[0].find_successor(RingId::new(0x6000_0000)).await;
    assert!(matches!(res, Err(Error::Transport(_))), "{:?}", res);
    // Left to the liveness checks.
    assert!(finger_holds(&nodes[0], succ_info.id)?);
    assert_eq!(nodes[0].dht().successor()?, succ_info);
    Ok(())
}

#[tokio::test]
async fn test_silent_node_down_the_chain_keeps_upstream_fingers() -> Result<()> {
    let ids: Vec<u32> = (0..8).map(|i| i * 0x2000_0000).collect();
    let net = MemoryNetwork::new();
    let nodes = prepare_ring(&net, &ids).await?;
    stabilize_all(&nodes, ids.len() * 2).await?;

    let (n0, n2, n3) = (&nodes[0], &nodes[2], &nodes[3]);
    assert!(finger_holds(n0, n2.id())?);
    assert!(n0.client().lookup_timeout(30) < n0.client().lookup_timeout(31));

    // n0 forwards to n2, whose successor n3 stops answering.
    net.blackhole(n3.node_info().addr());
    let res = n0.find_successor(RingId::new(0x7000_0001)).await;
    assert!(matches!(res, Err(Error::SuccessorNotFound(_))), "{:?}", res);

    // n2 reported the failure in time, so n0 still trusts it.
    assert!(n0.client().check_alive(n2.node_info().addr()).await);
    assert!(finger_holds(n0, n2.id())?);

    // Lookups that avoid n3 still work.
    let owner = n0.find_successor(RingId::new(0x9000_0001)).await?;
    assert_eq!(owner, nodes[5].node_info());
    Ok(())
}
