//! Partition chaos scenarios (T-PART-*).
//!
//! A disconnected node neither sends nor receives. Rejoining nodes pick up
//! whatever the leader is still re-broadcasting.

#[cfg(test)]
mod tests {
    use crate::assertions::{
        assert_at_most_once, assert_delivered_everywhere, assert_lateness_within,
        assert_never_delivered,
    };
    use crate::harness::{four_peers, ChaosGroup};

    /// T-PART-01: a peer cut off for longer than the stale window misses the
    /// event but runs later ones on time.
    #[tokio::test(start_paused = true)]
    async fn t_part_01_long_partition_misses_event() {
        let mut chaos = ChaosGroup::new(&four_peers(), 0.0, 1).unwrap();
        chaos.promote(0).await.unwrap();
        chaos.settle(0.5).await;

        chaos.disconnect(2).unwrap();
        let missed = chaos.schedule_in(0, 0.3).unwrap();
        chaos.settle(2.0).await;
        chaos.reconnect(2).unwrap();
        chaos.settle(0.3).await;

        let after = chaos.schedule_in(0, 0.5).unwrap();
        chaos.settle(1.0).await;

        let log = chaos.log();
        assert!(assert_never_delivered(&log.nodes[2..3], &missed).passed);
        assert!(log.nodes[1].ran(&missed));
        assert!(assert_delivered_everywhere(&log, &after).passed);
        assert!(assert_lateness_within(&log.nodes, 0.01).passed);
        chaos.shutdown().await;
    }

    /// T-PART-02: a short partition that heals before the due time is
    /// invisible.
    #[tokio::test(start_paused = true)]
    async fn t_part_02_short_partition_is_invisible() {
        let mut chaos = ChaosGroup::new(&four_peers(), 0.0, 1).unwrap();
        chaos.promote(0).await.unwrap();
        chaos.settle(0.5).await;

        chaos.disconnect(3).unwrap();
        let id = chaos.schedule_in(0, 0.8).unwrap();
        chaos.settle(0.3).await;
        chaos.reconnect(3).unwrap();
        chaos.settle(1.5).await;

        let log = chaos.log();
        assert!(assert_delivered_everywhere(&log, &id).passed);
        assert!(assert_lateness_within(&log.nodes, 0.01).passed);
        chaos.shutdown().await;
    }

    /// T-PART-03: the leader itself is cut off. Sends fail and are counted,
    /// nothing is retried, and the horizon re-broadcast recovers once the
    /// leader is back.
    #[tokio::test(start_paused = true)]
    async fn t_part_03_isolated_leader_recovers() {
        let mut chaos = ChaosGroup::new(&four_peers(), 0.0, 1).unwrap();
        chaos.promote(0).await.unwrap();
        chaos.settle(0.5).await;

        chaos.disconnect(0).unwrap();
        let id = chaos.schedule_in(0, 0.3).unwrap();
        chaos.settle(0.2).await;
        chaos.reconnect(0).unwrap();
        chaos.settle(1.0).await;

        let log = chaos.log();
        assert!(assert_delivered_everywhere(&log, &id).passed);
        assert!(assert_at_most_once(&log).passed);
        assert!(assert_lateness_within(&log.nodes, 0.25).passed);
        assert!(chaos.node(0).unwrap().stats().send_failures >= 1);
        chaos.shutdown().await;
    }
}
