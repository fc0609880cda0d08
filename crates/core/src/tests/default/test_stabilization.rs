use std::time::Duration;

use crate::dht::NodeInfo;
use crate::dht::RingId;
use crate::error::Result;
use crate::tests::default::prepare_ring;
use crate::tests::default::stabilize_all;
use crate::transport::connections::MemoryNetwork;

#[tokio::test]
async fn test_repeated_notify_keeps_predecessor() -> Result<()> {
    let net = MemoryNetwork::new();
    let nodes = prepare_ring(&net, &[1000, 5000, 9000]).await?;
    stabilize_all(&nodes, 4).await?;

    let target = &nodes[1];
    let pred = nodes[0].node_info();
    assert_eq!(target.topo_info()?.predecessor, Some(pred));

    let client = nodes[0].client();
    for _ in 0..3 {
        assert!(client.notify(target.node_info().addr(), pred).await?);
        assert_eq!(target.topo_info()?.predecessor, Some(pred));
    }

    // 9000 is outside (1000, 5000), it is refused and nothing changes.
    let outsider = nodes[2].node_info();
    assert!(!nodes[2]
        .client()
        .notify(target.node_info().addr(), outsider)
        .await?);
    assert_eq!(target.topo_info()?.predecessor, Some(pred));
    Ok(())
}

#[tokio::test]
async fn test_silent_predecessor_is_cleared() -> Result<()> {
    let net = MemoryNetwork::new();
    let nodes = prepare_ring(&net, &[1000, 5000]).await?;
    stabilize_all(&nodes, 2).await?;

    let a = nodes[0].node_info();
    let b = &nodes[1];
    assert_eq!(b.topo_info()?.predecessor, Some(a));

    // Connections to a are accepted but never answered.
    net.blackhole(a.addr());
    tokio::time::timeout(Duration::from_secs(2), b.stabilizer().check_predecessor())
        .await
        .unwrap()?;
    assert_eq!(b.topo_info()?.predecessor, None);
    Ok(())
}

#[tokio::test]
async fn test_alive_predecessor_is_kept() -> Result<()> {
    let net = MemoryNetwork::new();
    let nodes = prepare_ring(&net, &[1000, 5000]).await?;
    stabilize_all(&nodes, 2).await?;

    nodes[1].stabilizer().check_predecessor().await?;
    assert_eq!(
        nodes[1].topo_info()?.predecessor,
        Some(nodes[0].node_info())
    );
    Ok(())
}

#[tokio::test]
async fn test_successor_failover() -> Result<()> {
    let net = MemoryNetwork::new();
    let mut nodes = prepare_ring(&net, &[1000, 5000, 9000]).await?;
    stabilize_all(&nodes, 6).await?;

    let a = nodes[0].node_info();
    let c = nodes[2].node_info();
    assert_eq!(nodes[0].dht().successor()?.id, RingId::new(5000));

    // 5000 leaves without telling anyone.
    let b = nodes.remove(1);
    b.shutdown()?;
    drop(b);

    nodes[0].stabilizer().check_successors().await?;
    assert_eq!(nodes[0].dht().successor()?, c);

    nodes[1].stabilizer().check_predecessor().await?;
    assert_eq!(nodes[1].topo_info()?.predecessor, None);

    stabilize_all(&nodes, 2).await?;
    assert_eq!(nodes[0].dht().successor()?, c);
    assert_eq!(nodes[1].dht().successor()?, a);
    assert_eq!(nodes[1].topo_info()?.predecessor, Some(a));
    assert_eq!(nodes[0].topo_info()?.predecessor, Some(c));

    for id in [0u32, 3000, 7000, 9500] {
        let owner = nodes[0].find_successor(RingId::new(id)).await?;
        let expected = if (1001..=9000).contains(&id) { c } else { a };
        assert_eq!(owner, expected, "owner of {}", id);
    }
    Ok(())
}

#[tokio::test]
async fn test_stabilize_drops_dead_successor() -> Result<()> {
    let net = MemoryNetwork::new();
    let nodes = prepare_ring(&net, &[1000, 5000, 9000]).await?;
    stabilize_all(&nodes, 6).await?;

    let b: NodeInfo = nodes[1].node_info();
    net.blackhole(b.addr());

    // The query to the successor times out and it is forgotten.
    nodes[0].stabilizer().stabilize().await?;
    let topo = nodes[0].topo_info()?;
    assert!(topo.successors.iter().all(|n| n.id != b.id));
    assert_eq!(nodes[0].dht().successor()?, nodes[2].node_info());
    Ok(())
}
