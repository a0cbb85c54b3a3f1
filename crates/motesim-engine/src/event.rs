//! Queued engine events.

use motesim_common::{NodeId, OutboundPacket, SimTime};
use std::cmp::Ordering;

/// What happens when an event fires.
#[derive(Debug, Clone)]
pub(crate) enum EventKind {
    /// Node finishes booting.
    Boot(NodeId),
    /// Packet arrives at a node.
    Deliver {
        node: NodeId,
        packet: OutboundPacket,
    },
}

/// An event in the queue, ordered earliest first, then by schedule order.
#[derive(Debug, Clone)]
pub(crate) struct ScheduledEvent {
    pub time: SimTime,
    pub seq: u64,
    pub kind: EventKind,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (earliest time first)
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    fn boot(time: u64, seq: u64) -> ScheduledEvent {
        ScheduledEvent {
            time: SimTime::from_ticks(time),
            seq,
            kind: EventKind::Boot(NodeId::new(seq as u32)),
        }
    }

    #[test]
    fn test_heap_pops_earliest_then_fifo() {
        let mut heap = BinaryHeap::new();
        heap.push(boot(50, 0));
        heap.push(boot(10, 1));
        heap.push(boot(10, 2));
        heap.push(boot(5, 3));

        let order: Vec<(u64, u64)> = std::iter::from_fn(|| heap.pop())
            .map(|e| (e.time.as_ticks(), e.seq))
            .collect();
        assert_eq!(order, vec![(5, 3), (10, 1), (10, 2), (50, 0)]);
    }
}
