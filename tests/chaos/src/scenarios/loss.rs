//! Loss chaos scenarios (T-LOSS-*).
//!
//! The leader never retries a send; coverage comes from re-broadcasting
//! every event inside the horizon on each tick until it goes stale.

#[cfg(test)]
mod tests {
    use crate::assertions::{
        assert_at_most_once, assert_delivered_everywhere, assert_lateness_within,
        assert_never_delivered, assert_no_event_loss, assert_same_order,
    };
    use crate::harness::{four_peers, ChaosGroup};

    /// T-LOSS-01: 30% random loss, every event still runs once everywhere.
    #[tokio::test(start_paused = true)]
    async fn t_loss_01_random_loss_is_healed_by_rebroadcast() {
        let mut chaos = ChaosGroup::new(&four_peers(), 0.3, 7).unwrap();
        chaos.promote(0).await.unwrap();
        chaos.settle(0.5).await;

        for _ in 0..6 {
            chaos.schedule_in(0, 0.6).unwrap();
            chaos.settle(0.15).await;
        }
        chaos.settle(2.0).await;

        let log = chaos.log();
        for result in [
            assert_no_event_loss(&log),
            assert_at_most_once(&log),
            assert_same_order(&log),
            assert_lateness_within(&log.nodes, 0.5),
        ] {
            assert!(result.passed, "{}: {:?}", result.description, result.failure_details);
        }
        assert!(chaos.dropped() > 0);
        chaos.shutdown().await;
    }

    /// T-LOSS-02: total loss until after the due time, restored before the
    /// event goes stale. Peers run it late; the leader runs it on time.
    #[tokio::test(start_paused = true)]
    async fn t_loss_02_recovery_inside_stale_window_runs_late() {
        let mut chaos = ChaosGroup::new(&four_peers(), 0.0, 1).unwrap();
        chaos.promote(0).await.unwrap();
        chaos.settle(0.5).await;

        chaos.set_loss(1.0);
        let id = chaos.schedule_in(0, 0.2).unwrap();
        chaos.settle(0.5).await;
        chaos.set_loss(0.0);
        chaos.settle(1.0).await;

        let log = chaos.log();
        let result = assert_delivered_everywhere(&log, &id);
        assert!(result.passed, "{:?}", result.failure_details);

        assert!(assert_lateness_within(&log.nodes[..1], 0.01).passed);
        for node in &log.nodes[1..] {
            assert!(node.landings[0].lateness >= 0.25, "{:?}", node);
        }
        chaos.shutdown().await;
    }

    /// T-LOSS-03: loss lasting past the stale window. The event is pruned
    /// at the leader and never reaches the peers.
    #[tokio::test(start_paused = true)]
    async fn t_loss_03_outage_past_stale_window_drops_event() {
        let mut chaos = ChaosGroup::new(&four_peers(), 0.0, 1).unwrap();
        chaos.promote(0).await.unwrap();
        chaos.settle(0.5).await;

        chaos.set_loss(1.0);
        let id = chaos.schedule_in(0, 0.2).unwrap();
        chaos.settle(1.5).await;
        chaos.set_loss(0.0);
        chaos.settle(1.0).await;

        let log = chaos.log();
        assert!(log.nodes[0].ran(&id));
        assert!(assert_never_delivered(&log.nodes[1..], &id).passed);
        assert_eq!(chaos.node(0).unwrap().stats().events_pruned, 1);
        chaos.shutdown().await;
    }
}
