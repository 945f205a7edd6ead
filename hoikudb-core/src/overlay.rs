//! Single source of truth for which overlay panel is open.
//!
//! At most one of the ward picker, the filter panel and the facility detail modal is open at
//! a time. Every command broadcasts the resulting [`OverlayBroadcast`] to all subscribers
//! before it returns, including commands that leave the state unchanged. Components that are
//! not wired to the coordinator directly ask for a panel through [`PanelSignal`]s sent over
//! the channel from [`OverlayCoordinator::signal_sender`].

use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::Facility;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Which overlay is open, without its payload.
pub enum OverlayKind {
    /// Nothing covers the map.
    #[serde(rename = "none")]
    Closed,
    /// Ward picker.
    Ward,
    /// Filter panel.
    Filter,
    /// Facility detail modal.
    Detail,
}

#[derive(Debug, Clone, PartialEq)]
/// Overlay state including the facility shown by the detail modal.
pub enum OverlayState {
    /// Nothing covers the map.
    Closed,
    /// Ward picker.
    Ward,
    /// Filter panel.
    Filter,
    /// Detail modal for the selected facility.
    Detail(Facility),
}

impl OverlayState {
    /// Kind of this state.
    #[must_use]
    pub fn kind(&self) -> OverlayKind {
        match self {
            OverlayState::Closed => OverlayKind::Closed,
            OverlayState::Ward => OverlayKind::Ward,
            OverlayState::Filter => OverlayKind::Filter,
            OverlayState::Detail(_) => OverlayKind::Detail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Payload delivered to subscribers after every transition.
pub struct OverlayBroadcast {
    /// Overlay now open.
    pub kind: OverlayKind,
    /// Whether any overlay is open.
    pub any_open: bool,
    /// Whether a ward has been chosen at least once this session.
    pub ward_chosen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Requests any component may publish without holding the coordinator.
pub enum PanelSignal {
    /// Open the ward picker.
    OpenWardPanel,
    /// Open the filter panel.
    OpenFilterPanel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Handle returned by [`OverlayCoordinator::subscribe`].
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&OverlayBroadcast) + Send>;

/// Owns the [`OverlayState`] and notifies subscribers of every transition.
pub struct OverlayCoordinator {
    state: OverlayState,
    ward_chosen: bool,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    signal_tx: Sender<PanelSignal>,
    signal_rx: Receiver<PanelSignal>,
}

impl OverlayCoordinator {
    /// Coordinator for a session. Without a prior ward choice the ward picker starts open
    /// and cannot be closed until [`Self::mark_ward_chosen`] is called.
    #[must_use]
    pub fn new(ward_chosen: bool) -> Self {
        let (signal_tx, signal_rx) = unbounded();
        let state = if ward_chosen {
            OverlayState::Closed
        } else {
            OverlayState::Ward
        };
        Self {
            state,
            ward_chosen,
            subscribers: Vec::new(),
            next_subscription: 0,
            signal_tx,
            signal_rx,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    /// Current kind.
    #[must_use]
    pub fn kind(&self) -> OverlayKind {
        self.state.kind()
    }

    /// Facility shown by the detail modal, if open.
    #[must_use]
    pub fn selected_facility(&self) -> Option<&Facility> {
        match &self.state {
            OverlayState::Detail(facility) => Some(facility),
            _ => None,
        }
    }

    /// Whether the mandatory first ward choice has happened.
    #[must_use]
    pub fn is_ward_chosen(&self) -> bool {
        self.ward_chosen
    }

    /// Snapshot of what subscribers last received.
    #[must_use]
    pub fn broadcast(&self) -> OverlayBroadcast {
        let kind = self.kind();
        OverlayBroadcast {
            kind,
            any_open: kind != OverlayKind::Closed,
            ward_chosen: self.ward_chosen,
        }
    }

    /// Register a subscriber. It is called synchronously after every command, in
    /// registration order.
    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
    where
        F: FnMut(&OverlayBroadcast) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(subscription, _)| *subscription != id);
        self.subscribers.len() != before
    }

    /// Sender for [`PanelSignal`]s; applied on the next [`Self::pump_signals`].
    #[must_use]
    pub fn signal_sender(&self) -> Sender<PanelSignal> {
        self.signal_tx.clone()
    }

    /// Open the ward picker, dropping any selected facility.
    pub fn open_ward(&mut self) {
        self.transition(OverlayState::Ward);
    }

    /// Open the filter panel, dropping any selected facility.
    pub fn open_filter(&mut self) {
        self.transition(OverlayState::Filter);
    }

    /// Open the detail modal for a facility.
    pub fn open_detail(&mut self, facility: Facility) {
        self.transition(OverlayState::Detail(facility));
    }

    /// Close the open overlay.
    ///
    /// The ward picker stays open while no ward has been chosen yet; the refused close
    /// still broadcasts.
    pub fn close(&mut self) {
        match self.state {
            OverlayState::Ward if !self.ward_chosen => {
                debug!("ignoring close of the initial ward prompt");
                self.notify();
            }
            _ => self.transition(OverlayState::Closed),
        }
    }

    /// Record that a ward was picked and close the ward picker if it is open.
    pub fn mark_ward_chosen(&mut self) {
        self.ward_chosen = true;
        if self.state == OverlayState::Ward {
            self.transition(OverlayState::Closed);
        } else {
            self.notify();
        }
    }

    /// Apply a single signal as the matching open command.
    pub fn apply_signal(&mut self, signal: PanelSignal) {
        match signal {
            PanelSignal::OpenWardPanel => self.open_ward(),
            PanelSignal::OpenFilterPanel => self.open_filter(),
        }
    }

    /// Apply the signals that were queued when the pump started and return how many.
    ///
    /// Signals published by subscribers while pumping wait for the next pump.
    pub fn pump_signals(&mut self) -> usize {
        let pending: Vec<PanelSignal> = self
            .signal_rx
            .try_iter()
            .take(self.signal_rx.len())
            .collect();
        let count = pending.len();
        for signal in pending {
            self.apply_signal(signal);
        }
        count
    }

    fn transition(&mut self, next: OverlayState) {
        if self.state.kind() != next.kind() {
            debug!(from = ?self.state.kind(), to = ?next.kind(), "overlay transition");
        }
        self.state = next;
        self.notify();
    }

    fn notify(&mut self) {
        let broadcast = self.broadcast();
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&broadcast);
        }
    }
}

impl Default for OverlayCoordinator {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::model::{Coordinates, FacilityId, StatisticsSet};

    fn facility(id: i64) -> Facility {
        Facility {
            id: FacilityId(id),
            name: format!("保育園{id}"),
            location: Coordinates {
                longitude: 139.6,
                latitude: 35.4,
            },
            stats: StatisticsSet::default(),
        }
    }

    fn recorder(coordinator: &mut OverlayCoordinator) -> Arc<Mutex<Vec<OverlayBroadcast>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        coordinator.subscribe(move |broadcast| {
            sink.lock().expect("recorder lock").push(*broadcast);
        });
        seen
    }

    #[test]
    fn starts_with_mandatory_ward_prompt() {
        let mut coordinator = OverlayCoordinator::new(false);
        assert_eq!(coordinator.kind(), OverlayKind::Ward);

        coordinator.close();
        assert_eq!(coordinator.kind(), OverlayKind::Ward);

        coordinator.mark_ward_chosen();
        assert_eq!(coordinator.kind(), OverlayKind::Closed);
        assert!(coordinator.is_ward_chosen());
    }

    #[test]
    fn resumed_session_starts_closed() {
        let coordinator = OverlayCoordinator::new(true);
        assert_eq!(coordinator.kind(), OverlayKind::Closed);
    }

    #[test]
    fn ward_panel_closes_freely_after_first_choice() {
        let mut coordinator = OverlayCoordinator::new(false);
        coordinator.mark_ward_chosen();
        coordinator.open_ward();
        coordinator.close();
        assert_eq!(coordinator.kind(), OverlayKind::Closed);
    }

    #[test]
    fn detail_from_filter_then_close() {
        let mut coordinator = OverlayCoordinator::new(true);
        coordinator.open_filter();
        coordinator.open_detail(facility(7));

        assert_eq!(coordinator.kind(), OverlayKind::Detail);
        assert_eq!(
            coordinator.selected_facility().map(|facility| facility.id.clone()),
            Some(FacilityId(7))
        );

        coordinator.close();
        assert_eq!(coordinator.kind(), OverlayKind::Closed);
        assert!(coordinator.selected_facility().is_none());
    }

    #[test]
    fn opening_a_panel_drops_selected_facility() {
        let mut coordinator = OverlayCoordinator::new(true);
        coordinator.open_detail(facility(1));
        coordinator.open_filter();
        assert!(coordinator.selected_facility().is_none());

        coordinator.open_detail(facility(2));
        coordinator.open_ward();
        assert!(coordinator.selected_facility().is_none());
        assert_eq!(coordinator.kind(), OverlayKind::Ward);
    }

    #[test]
    fn every_command_broadcasts_even_without_change() {
        let mut coordinator = OverlayCoordinator::new(false);
        let seen = recorder(&mut coordinator);

        coordinator.close();
        coordinator.mark_ward_chosen();
        coordinator.close();
        coordinator.open_filter();
        coordinator.open_filter();

        let seen = seen.lock().expect("recorder lock");
        let kinds: Vec<_> = seen.iter().map(|broadcast| broadcast.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OverlayKind::Ward,
                OverlayKind::Closed,
                OverlayKind::Closed,
                OverlayKind::Filter,
                OverlayKind::Filter,
            ]
        );
        assert!(!seen.first().expect("first broadcast").ward_chosen);
        assert!(seen.last().expect("last broadcast").any_open);
        assert!(seen.last().expect("last broadcast").ward_chosen);
    }

    #[test]
    fn unsubscribed_handlers_stop_receiving() {
        let mut coordinator = OverlayCoordinator::new(true);
        let seen = Arc::new(Mutex::new(0_usize));
        let sink = Arc::clone(&seen);
        let id = coordinator.subscribe(move |_| {
            *sink.lock().expect("counter lock") += 1;
        });

        coordinator.open_filter();
        assert!(coordinator.unsubscribe(id));
        coordinator.close();

        assert_eq!(*seen.lock().expect("counter lock"), 1);
        assert!(!coordinator.unsubscribe(id));
    }

    #[test]
    fn signals_open_panels_on_pump() {
        let mut coordinator = OverlayCoordinator::new(true);
        let sender = coordinator.signal_sender();

        sender.send(PanelSignal::OpenFilterPanel).expect("send");
        assert_eq!(coordinator.kind(), OverlayKind::Closed);

        assert_eq!(coordinator.pump_signals(), 1);
        assert_eq!(coordinator.kind(), OverlayKind::Filter);

        sender.send(PanelSignal::OpenWardPanel).expect("send");
        coordinator.pump_signals();
        assert_eq!(coordinator.kind(), OverlayKind::Ward);
    }

    #[test]
    fn republishing_subscriber_does_not_loop() {
        let mut coordinator = OverlayCoordinator::new(true);
        let sender = coordinator.signal_sender();
        coordinator.subscribe(move |_| {
            sender.send(PanelSignal::OpenFilterPanel).expect("send");
        });

        coordinator.open_ward();
        assert_eq!(coordinator.pump_signals(), 1);
        assert_eq!(coordinator.pump_signals(), 1);
        assert_eq!(coordinator.kind(), OverlayKind::Filter);
    }

    #[test]
    fn broadcast_serializes_closed_as_none() {
        let coordinator = OverlayCoordinator::new(true);
        let json = serde_json::to_value(coordinator.broadcast()).expect("serialize");
        assert_eq!(json["kind"], "none");
        assert_eq!(json["any_open"], false);
    }
}
