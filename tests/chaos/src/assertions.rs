//! Assertion helpers for chaos testing.
//!
//! These are pure functions that verify delivery logs after a chaos scenario
//! completes. They take the recorded state as input and return pass/fail.

use std::collections::HashSet;

use lockstep_sync_types::EventId;

/// One event as it fired on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Landing {
    /// Event id
    pub event: EventId,
    /// Seconds after the due time
    pub lateness: f64,
}

/// Deliveries recorded on one node, in firing order.
#[derive(Debug, Clone, Default)]
pub struct NodeLog {
    /// Node name
    pub device_id: String,
    /// Fired events
    pub landings: Vec<Landing>,
}

impl NodeLog {
    /// Whether `event` fired on this node.
    pub fn ran(&self, event: &EventId) -> bool {
        self.landings.iter().any(|l| &l.event == event)
    }
}

/// Delivery state of the whole group.
#[derive(Debug, Clone, Default)]
pub struct GroupLog {
    /// Every node's log
    pub nodes: Vec<NodeLog>,
    /// Every event a leader scheduled
    pub scheduled: Vec<EventId>,
}

/// Result of an assertion check.
#[derive(Debug, Clone)]
pub struct AssertionResult {
    /// Whether the assertion passed
    pub passed: bool,
    /// Description of what was checked
    pub description: String,
    /// Details on failure
    pub failure_details: Option<String>,
}

impl AssertionResult {
    /// Create a passing result.
    pub fn pass(description: &str) -> Self {
        Self {
            passed: true,
            description: description.into(),
            failure_details: None,
        }
    }

    /// Create a failing result.
    pub fn fail(description: &str, details: &str) -> Self {
        Self {
            passed: false,
            description: description.into(),
            failure_details: Some(details.into()),
        }
    }
}

/// Assert that `event` fired on every node.
pub fn assert_delivered_everywhere(log: &GroupLog, event: &EventId) -> AssertionResult {
    let missing: Vec<&str> = log
        .nodes
        .iter()
        .filter(|node| !node.ran(event))
        .map(|node| node.device_id.as_str())
        .collect();

    if missing.is_empty() {
        AssertionResult::pass(&format!(
            "Event {} fired on all {} nodes",
            event,
            log.nodes.len()
        ))
    } else {
        AssertionResult::fail(
            &format!("Event {} should fire on every node", event),
            &format!("Missing on: {}", missing.join(", ")),
        )
    }
}

/// Assert that `event` fired nowhere in `nodes`.
pub fn assert_never_delivered(nodes: &[NodeLog], event: &EventId) -> AssertionResult {
    match nodes.iter().find(|node| node.ran(event)) {
        Some(node) => AssertionResult::fail(
            &format!("Event {} should not fire", event),
            &format!("Fired on {}", node.device_id),
        ),
        None => AssertionResult::pass(&format!("Event {} never fired", event)),
    }
}

/// Assert that every scheduled event fired on every node.
pub fn assert_no_event_loss(log: &GroupLog) -> AssertionResult {
    for event in &log.scheduled {
        let result = assert_delivered_everywhere(log, event);
        if !result.passed {
            return AssertionResult::fail(
                "No event loss check",
                result.failure_details.as_deref().unwrap_or_default(),
            );
        }
    }

    AssertionResult::pass(&format!(
        "All {} nodes ran all {} events",
        log.nodes.len(),
        log.scheduled.len()
    ))
}

/// Assert that no node fired the same event twice.
pub fn assert_at_most_once(log: &GroupLog) -> AssertionResult {
    for node in &log.nodes {
        let mut seen = HashSet::new();
        for landing in &node.landings {
            if !seen.insert(&landing.event) {
                return AssertionResult::fail(
                    "At-most-once delivery",
                    &format!("Node {} ran {} twice", node.device_id, landing.event),
                );
            }
        }
    }

    AssertionResult::pass("No event ran twice on any node")
}

/// Assert that events which fired on every node fired in the same order.
pub fn assert_same_order(log: &GroupLog) -> AssertionResult {
    let Some(first) = log.nodes.first() else {
        return AssertionResult::pass("No nodes to check");
    };

    let common: HashSet<&EventId> = first
        .landings
        .iter()
        .map(|l| &l.event)
        .filter(|event| log.nodes.iter().all(|node| node.ran(event)))
        .collect();
    let order = |node: &NodeLog| -> Vec<EventId> {
        node.landings
            .iter()
            .filter(|l| common.contains(&l.event))
            .map(|l| l.event.clone())
            .collect()
    };

    let reference = order(first);
    for node in log.nodes.iter().skip(1) {
        let other = order(node);
        if other != reference {
            return AssertionResult::fail(
                "Delivery order agreement",
                &format!(
                    "Node {} order {:?} differs from node {} order {:?}",
                    node.device_id, other, first.device_id, reference
                ),
            );
        }
    }

    AssertionResult::pass(&format!(
        "All {} nodes ran {} shared events in the same order",
        log.nodes.len(),
        common.len()
    ))
}

/// Assert that every landing on `nodes` was at most `bound` seconds late.
pub fn assert_lateness_within(nodes: &[NodeLog], bound: f64) -> AssertionResult {
    for node in nodes {
        for landing in &node.landings {
            if landing.lateness > bound {
                return AssertionResult::fail(
                    &format!("Lateness within {:.3}s", bound),
                    &format!(
                        "Node {} ran {} {:.3}s late",
                        node.device_id, landing.event, landing.lateness
                    ),
                );
            }
        }
    }

    AssertionResult::pass(&format!("All landings within {:.3}s", bound))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landing(id: &str, lateness: f64) -> Landing {
        Landing {
            event: EventId::new(id),
            lateness,
        }
    }

    fn node(name: &str, events: &[&str]) -> NodeLog {
        NodeLog {
            device_id: name.into(),
            landings: events.iter().map(|id| landing(id, 0.0)).collect(),
        }
    }

    fn group(nodes: Vec<NodeLog>, scheduled: &[&str]) -> GroupLog {
        GroupLog {
            nodes,
            scheduled: scheduled.iter().map(|id| EventId::new(*id)).collect(),
        }
    }

    #[test]
    fn test_delivered_everywhere() {
        let log = group(vec![node("a", &["x"]), node("b", &["x"])], &["x"]);
        assert!(assert_delivered_everywhere(&log, &EventId::new("x")).passed);

        let log = group(vec![node("a", &["x"]), node("b", &[])], &["x"]);
        let result = assert_delivered_everywhere(&log, &EventId::new("x"));
        assert!(!result.passed);
        assert!(result.failure_details.unwrap().contains('b'));
    }

    #[test]
    fn test_never_delivered() {
        let nodes = vec![node("a", &["x"]), node("b", &[])];
        assert!(assert_never_delivered(&nodes[1..], &EventId::new("x")).passed);
        assert!(!assert_never_delivered(&nodes, &EventId::new("x")).passed);
    }

    #[test]
    fn test_no_event_loss() {
        let log = group(vec![node("a", &["x", "y"]), node("b", &["y", "x"])], &["x", "y"]);
        assert!(assert_no_event_loss(&log).passed);

        let log = group(vec![node("a", &["x", "y"]), node("b", &["x"])], &["x", "y"]);
        assert!(!assert_no_event_loss(&log).passed);
    }

    #[test]
    fn test_at_most_once() {
        let log = group(vec![node("a", &["x", "y"])], &[]);
        assert!(assert_at_most_once(&log).passed);

        let log = group(vec![node("a", &["x", "x"])], &[]);
        assert!(!assert_at_most_once(&log).passed);
    }

    #[test]
    fn test_same_order_ignores_partial_events() {
        // "p" only ran on one node and does not count
        let log = group(
            vec![node("a", &["x", "p", "y"]), node("b", &["x", "y"])],
            &[],
        );
        assert!(assert_same_order(&log).passed);

        let log = group(vec![node("a", &["x", "y"]), node("b", &["y", "x"])], &[]);
        assert!(!assert_same_order(&log).passed);
    }

    #[test]
    fn test_lateness_within() {
        let nodes = vec![NodeLog {
            device_id: "a".into(),
            landings: vec![landing("x", 0.001), landing("y", 0.25)],
        }];
        assert!(assert_lateness_within(&nodes, 0.5).passed);
        assert!(!assert_lateness_within(&nodes, 0.1).passed);
    }
}
