/// An emitted event stamped with its emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamped<E> {
    pub seq: u64,
    pub event: E,
}

/// Ordered outbox of events for the UI layer.
///
/// Producers `emit`; the consumer drains once per turn of its event loop.
#[derive(Debug)]
pub struct EventBus<E> {
    next_seq: u64,
    events: Vec<Stamped<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            next_seq: 0,
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: E) {
        self.events.push(Stamped {
            seq: self.next_seq,
            event,
        });
        self.next_seq += 1;
    }

    pub fn events(&self) -> &[Stamped<E>] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.events)
            .into_iter()
            .map(|s| s.event)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::EventBus;

    #[test]
    fn records_events_in_order() {
        let mut bus = EventBus::new();
        bus.emit("a");
        bus.emit("b");
        assert_eq!(bus.events().len(), 2);
        assert_eq!(bus.events()[1].seq, 1);
    }

    #[test]
    fn drain_clears_events_but_keeps_sequence() {
        let mut bus = EventBus::new();
        bus.emit(1);
        assert_eq!(bus.drain(), vec![1]);
        assert!(bus.is_empty());
        bus.emit(2);
        assert_eq!(bus.events()[0].seq, 1);
    }
}
