//! Run a simulated group in-process.
//!
//! Every node gets its own skewed clock and ping. The first node leads and
//! issues `announce` calls; each node reports how late it ran them.

use anyhow::{Context, Result};
use lockstep_sync_client::{
    CallTable, GroupConfig, GroupNode, GroupRpc, MemoryGroup, MonotonicClock, StatsSnapshot,
};
use lockstep_sync_types::DeviceId;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Gap between consecutive calls from the leader.
const CALL_SPACING: Duration = Duration::from_millis(200);

/// Skew added per node so that no two clocks agree.
const SKEW_STEP_SECS: f64 = 7.25;

/// Simulation parameters.
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub peers: usize,
    pub loss: f64,
    pub calls: u32,
    pub offset: f64,
    pub max_ping: f64,
    pub seed: u64,
    pub config: GroupConfig,
}

/// Outcome for one node.
#[derive(Debug, Clone)]
pub struct PeerReport {
    pub device_id: DeviceId,
    pub ping: f64,
    pub delivered: u32,
    pub mean_lateness: f64,
    pub max_lateness: f64,
    pub offset: Option<f64>,
    pub stats: StatsSnapshot,
}

/// Outcome of a whole run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub calls: u32,
    pub loss: f64,
    pub dropped: u64,
    pub peers: Vec<PeerReport>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Announce {
    seq: u32,
}

struct Landing {
    peer: usize,
    lateness: f64,
}

/// Run the simulate command.
pub async fn run(options: SimulateOptions) -> Result<SimulationReport> {
    anyhow::ensure!(options.peers > 0, "Need at least one peer");
    anyhow::ensure!(
        (0.0..=1.0).contains(&options.loss),
        "Loss must be between 0 and 1, got {}",
        options.loss
    );
    anyhow::ensure!(options.offset >= 0.0, "Offset must not be negative");

    let group = MemoryGroup::with_loss(options.loss, options.seed);
    let (landings_tx, mut landings_rx) = mpsc::unbounded_channel();

    let mut nodes = Vec::with_capacity(options.peers);
    let mut pings = Vec::with_capacity(options.peers);
    let mut tasks = Vec::with_capacity(options.peers);
    let mut leader_rpc = None;

    for index in 0..options.peers {
        let device_id = DeviceId::new(format!("peer-{}", index));
        let ping = options.max_ping * index as f64 / options.peers as f64;
        let clock = Arc::new(MonotonicClock::with_skew(index as f64 * SKEW_STEP_SECS));

        let node = Arc::new(
            GroupNode::new(
                device_id.clone(),
                options.config.clone(),
                group.endpoint(device_id.clone()),
                clock,
            )
            .context("Invalid group config")?,
        );
        group.join(device_id.clone(), ping, node.ingest());

        let mut table = CallTable::new();
        table.register("announce", move |call: Announce| {
            tracing::debug!("{} runs announce #{}", device_id, call.seq);
            Ok::<(), Infallible>(())
        });
        let rpc = Arc::new(GroupRpc::new(node.clone(), table));
        let mut stream = node
            .take_delivery_stream()
            .context("Delivery stream already taken")?;

        let worker = rpc.clone();
        let landings = landings_tx.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                let delivery = stream.next().await;
                let lateness = delivery.lateness();
                match worker.dispatch(&delivery) {
                    Ok(()) => {
                        let _ = landings.send(Landing {
                            peer: index,
                            lateness,
                        });
                    }
                    Err(e) => tracing::warn!("Dropped group call: {}", e),
                }
            }
        }));

        if index == 0 {
            leader_rpc = Some(rpc);
        }
        nodes.push(node);
        pings.push(ping);
    }
    drop(landings_tx);

    let leader_rpc = leader_rpc.context("No leader")?;
    let epoch = leader_rpc.node().promote().await;
    tracing::info!("Simulating {} peers under leader epoch {}", options.peers, epoch);

    // Let every peer hear a few keepalives before the first call
    tokio::time::sleep(options.config.broadcast_interval() * 3).await;

    for seq in 0..options.calls {
        leader_rpc
            .call(options.offset, "announce", Announce { seq })
            .context("Leader failed to schedule a call")?;
        tokio::time::sleep(CALL_SPACING).await;
    }

    let settle = options.offset + options.max_ping + options.config.stale_after_secs;
    tokio::time::sleep(Duration::from_secs_f64(settle)).await;
    leader_rpc.node().demote().await;
    for task in &tasks {
        task.abort();
    }

    let mut lateness: Vec<Vec<f64>> = vec![Vec::new(); options.peers];
    while let Ok(landing) = landings_rx.try_recv() {
        lateness[landing.peer].push(landing.lateness);
    }

    let peers = nodes
        .iter()
        .zip(pings)
        .zip(lateness)
        .map(|((node, ping), samples)| {
            let delivered = samples.len() as u32;
            let mean_lateness = if samples.is_empty() {
                0.0
            } else {
                samples.iter().sum::<f64>() / samples.len() as f64
            };
            let max_lateness = samples.iter().copied().fold(0.0, f64::max);
            PeerReport {
                device_id: node.device_id().clone(),
                ping,
                delivered,
                mean_lateness,
                max_lateness,
                offset: node.smoothed_offset(),
                stats: node.stats(),
            }
        })
        .collect();

    Ok(SimulationReport {
        calls: options.calls,
        loss: options.loss,
        dropped: group.dropped_count(),
        peers,
    })
}

/// Print a report as a table.
pub fn print_report(report: &SimulationReport) {
    println!("=== lockstep simulate ===");
    println!();
    println!(
        "{} peers, {} calls, {:.0}% loss ({} deliveries dropped)",
        report.peers.len(),
        report.calls,
        report.loss * 100.0,
        report.dropped
    );
    println!();
    println!(
        "  {:<8} {:>8} {:>10} {:>9} {:>11} {:>10}",
        "PEER", "PING", "OFFSET", "RAN", "MEAN LATE", "MAX LATE"
    );
    for peer in &report.peers {
        let offset = peer
            .offset
            .map_or_else(|| "-".to_string(), |o| format!("{:.3}s", o));
        println!(
            "  {:<8} {:>6.0}ms {:>10} {:>5}/{:<3} {:>9.1}ms {:>8.1}ms",
            peer.device_id.as_str(),
            peer.ping * 1000.0,
            offset,
            peer.delivered,
            report.calls,
            peer.mean_lateness * 1000.0,
            peer.max_lateness * 1000.0
        );
    }
    println!();

    let missed: Vec<&str> = report
        .peers
        .iter()
        .filter(|p| p.delivered < report.calls)
        .map(|p| p.device_id.as_str())
        .collect();
    if missed.is_empty() {
        println!("Every peer ran every call.");
    } else {
        println!("Missed calls on: {}", missed.join(", "));
    }
}
