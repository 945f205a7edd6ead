use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, Sender, unbounded};
use hoikudb_core::{
    model::{AgeClass, AreaKey},
    overlay::{OverlayBroadcast, PanelSignal},
    service::MapSession,
};

use crate::map::TerminalMap;

pub(crate) struct App {
    pub session: MapSession<TerminalMap>,

    // control island: publishes panel signals, listens to overlay broadcasts
    pub signals: Sender<PanelSignal>,
    island_rx: Receiver<OverlayBroadcast>,
    pub island: OverlayBroadcast,
    /// Data source attribution popover under the island.
    pub show_source: bool,

    pub areas: Vec<AreaKey>,
    pub ward_list_index: usize,
    pub age_list_index: usize,

    pub is_loading: bool,
    pub error_message: Option<String>,
    pub loaded_at: Option<DateTime<Local>>,
}

impl App {
    pub(crate) fn new(
        mut session: MapSession<TerminalMap>,
        map_tx: Sender<OverlayBroadcast>,
    ) -> Self {
        let (island_tx, island_rx) = unbounded();
        let overlay = session.overlay_mut();
        overlay.subscribe(move |broadcast| {
            map_tx.send(*broadcast).ok();
        });
        overlay.subscribe(move |broadcast| {
            island_tx.send(*broadcast).ok();
        });
        let signals = overlay.signal_sender();
        let island = overlay.broadcast();
        let areas = session.gazetteer().areas().cloned().collect();
        session.bridge_mut().set_covered(island.any_open);

        Self {
            session,
            signals,
            island_rx,
            island,
            show_source: false,
            areas,
            ward_list_index: 0,
            age_list_index: 0,
            is_loading: false,
            error_message: None,
            loaded_at: None,
        }
    }

    /// Apply queued panel signals and let every view catch up with the overlay state.
    pub(crate) fn sync_overlay(&mut self) {
        self.session.overlay_mut().pump_signals();
        if let Some(latest) = self.island_rx.try_iter().last() {
            self.island = latest;
        }
        if self.island.any_open {
            self.show_source = false;
        }
        self.session.bridge_mut().sync_overlay();
    }

    pub(crate) fn current_area(&self) -> Option<&AreaKey> {
        self.areas.get(self.ward_list_index)
    }

    pub(crate) fn current_age(&self) -> AgeClass {
        AgeClass::ALL
            .get(self.age_list_index)
            .copied()
            .unwrap_or(AgeClass::Zero)
    }

    pub(crate) fn request_panel(&mut self, signal: PanelSignal) {
        if self.signals.send(signal).is_err() {
            self.error_message = Some("Overlay channel closed".into());
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use hoikudb_core::{stats::StatsRepository, wards::WardGazetteer};
    use hoikudb_provider_yokohama as yokohama;
    use reqwest::Client;

    use super::*;

    pub(crate) fn app() -> App {
        let source = yokohama::source(Client::new(), "http://127.0.0.1:9/data");
        let (map_tx, map_rx) = unbounded();
        let session = MapSession::new(
            Arc::new(StatsRepository::new(source)),
            WardGazetteer::yokohama(),
            TerminalMap::new(map_rx),
        );
        App::new(session, map_tx)
    }

    #[test]
    fn map_is_dimmed_under_the_initial_ward_prompt() {
        let mut app = app();
        assert!(app.island.any_open);
        assert!(app.session.bridge().is_covered());

        app.sync_overlay();
        assert!(app.session.bridge().is_covered());
    }

    #[test]
    fn opening_a_panel_hides_the_source_popover() {
        let mut app = app();
        app.session.overlay_mut().mark_ward_chosen();
        app.sync_overlay();
        app.show_source = true;

        app.request_panel(PanelSignal::OpenFilterPanel);
        app.sync_overlay();

        assert!(!app.show_source);
        assert!(app.session.bridge().is_covered());
    }
}
