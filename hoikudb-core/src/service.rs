//! Session facade wiring the statistics cache, filter, overlays and the map renderer.

use std::sync::Arc;

use tracing::{debug, info};

use crate::filter::{self, FilterCriteria};
use crate::model::{AreaKey, Facility, FacilityCollection};
use crate::overlay::OverlayCoordinator;
use crate::ports::{FlyTarget, MapEvent, MapViewBridge, PortError};
use crate::stats::StatsRepository;
use crate::wards::WardGazetteer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What happened to a completed area fetch.
pub enum FetchOutcome {
    /// The snapshot is now on the map; carries the number of visible facilities.
    Applied(usize),
    /// Another area was selected meanwhile; the result was dropped.
    Superseded,
}

/// State of one user session on the map.
pub struct MapSession<B: MapViewBridge> {
    repository: Arc<StatsRepository>,
    gazetteer: WardGazetteer,
    overlay: OverlayCoordinator,
    criteria: FilterCriteria,
    selected_area: Option<AreaKey>,
    facilities: FacilityCollection,
    visible: Vec<Facility>,
    bridge: B,
}

impl<B: MapViewBridge> MapSession<B> {
    /// Fresh session: no area selected and the ward picker open.
    #[must_use]
    pub fn new(repository: Arc<StatsRepository>, gazetteer: WardGazetteer, bridge: B) -> Self {
        Self {
            repository,
            gazetteer,
            overlay: OverlayCoordinator::new(false),
            criteria: FilterCriteria::new(),
            selected_area: None,
            facilities: Arc::new(Vec::new()),
            visible: Vec::new(),
            bridge,
        }
    }

    /// Overlay state owner.
    #[must_use]
    pub fn overlay(&self) -> &OverlayCoordinator {
        &self.overlay
    }

    /// Mutable access for issuing overlay commands and subscribing.
    pub fn overlay_mut(&mut self) -> &mut OverlayCoordinator {
        &mut self.overlay
    }

    /// Ward table.
    #[must_use]
    pub fn gazetteer(&self) -> &WardGazetteer {
        &self.gazetteer
    }

    /// Statistics cache shared with the session.
    #[must_use]
    pub fn repository(&self) -> &Arc<StatsRepository> {
        &self.repository
    }

    /// Map renderer.
    #[must_use]
    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// Mutable map renderer, for viewport changes driven by the user.
    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    /// Criteria currently applied.
    #[must_use]
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Area the user last picked.
    #[must_use]
    pub fn selected_area(&self) -> Option<&AreaKey> {
        self.selected_area.as_ref()
    }

    /// Unfiltered snapshot of the selected area.
    #[must_use]
    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    /// Facilities passing the current criteria, in snapshot order.
    #[must_use]
    pub fn visible(&self) -> &[Facility] {
        &self.visible
    }

    /// Record an area pick, close the ward picker and fly to the area.
    ///
    /// Returns the key to fetch; hand it back to [`Self::complete_area`] with the result.
    pub fn begin_area(&mut self, area: AreaKey) -> AreaKey {
        debug!(%area, "area selected");
        self.selected_area = Some(area.clone());
        self.overlay.mark_ward_chosen();
        match self.gazetteer.bounds_of(area.as_str()) {
            Ok(bounds) => self.bridge.fly_to(FlyTarget::Bounds(bounds)),
            Err(err) => debug!(error = %err, "not navigating"),
        }
        area
    }

    /// Apply the result of fetching `requested`.
    ///
    /// Results for an area that is no longer selected are dropped. Errors leave the
    /// previous facilities on the map.
    ///
    /// # Errors
    ///
    /// Returns the fetch error unchanged when `requested` is still the selected area.
    pub fn complete_area(
        &mut self,
        requested: &AreaKey,
        result: Result<FacilityCollection, PortError>,
    ) -> Result<FetchOutcome, PortError> {
        if self.selected_area.as_ref() != Some(requested) {
            debug!(area = %requested, "dropping result for superseded area");
            return Ok(FetchOutcome::Superseded);
        }
        self.facilities = result?;
        self.refilter();
        info!(area = %requested, visible = self.visible.len(), "area rendered");
        Ok(FetchOutcome::Applied(self.visible.len()))
    }

    /// Select an area, fetch it through the cache and render it.
    ///
    /// # Errors
    ///
    /// Returns the transport or format error of the fetch; the map keeps its previous data.
    pub async fn select_area(&mut self, area: AreaKey) -> Result<FetchOutcome, PortError> {
        let requested = self.begin_area(area);
        let result = self.repository.fetch(&requested).await;
        self.complete_area(&requested, result)
    }

    /// Re-fetch the selected area; cached snapshots are reused while fresh.
    ///
    /// # Errors
    ///
    /// Same as [`Self::select_area`]. Without a selected area nothing happens.
    pub async fn reload(&mut self) -> Result<FetchOutcome, PortError> {
        let Some(area) = self.selected_area.clone() else {
            return Ok(FetchOutcome::Applied(self.visible.len()));
        };
        let result = self.repository.fetch(&area).await;
        self.complete_area(&area, result)
    }

    /// Edit the criteria, then re-filter and redraw.
    pub fn update_criteria<F: FnOnce(&mut FilterCriteria)>(&mut self, edit: F) {
        edit(&mut self.criteria);
        self.refilter();
    }

    /// React to an interaction reported by the map renderer.
    pub fn handle_map_event(&mut self, event: MapEvent) {
        match event {
            MapEvent::PointSelected(id) => {
                if let Some(facility) = self.visible.iter().find(|facility| facility.id == id) {
                    let facility = facility.clone();
                    self.overlay.open_detail(facility);
                } else {
                    debug!(%id, "selected point is not visible");
                }
            }
            MapEvent::ClusterSelected(bounds) => self.bridge.fly_to(FlyTarget::Bounds(bounds)),
            MapEvent::ViewportChanged => {}
        }
    }

    fn refilter(&mut self) {
        self.visible = filter::apply(&self.facilities, &self.criteria);
        self.bridge.set_facilities(&self.visible);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::filter::AgeConstraint;
    use crate::model::{
        AgeClass, Bounds, Coordinates, FacilityId, StatKind, StatRecord, StatisticsSet,
    };
    use crate::overlay::OverlayKind;
    use crate::ports::FacilitySource;

    #[derive(Default)]
    struct RecordingBridge {
        rendered: Vec<Vec<FacilityId>>,
        flights: Vec<FlyTarget>,
    }

    impl MapViewBridge for RecordingBridge {
        fn set_facilities(&mut self, facilities: &[Facility]) {
            self.rendered
                .push(facilities.iter().map(|facility| facility.id.clone()).collect());
        }

        fn fly_to(&mut self, target: FlyTarget) {
            self.flights.push(target);
        }
    }

    struct FixedSource {
        fail: Mutex<bool>,
    }

    #[async_trait]
    impl FacilitySource for FixedSource {
        async fn fetch_area(&self, area: &AreaKey) -> Result<Vec<Facility>, PortError> {
            if *self.fail.lock().expect("flag lock") {
                return Err(PortError::Schema("not a feature collection".to_owned()));
            }
            Ok(vec![
                sakura(),
                Facility {
                    id: FacilityId(2),
                    name: format!("{area}こども園"),
                    location: Coordinates {
                        longitude: 139.67,
                        latitude: 35.5,
                    },
                    stats: StatisticsSet::default(),
                },
            ])
        }
    }

    fn sakura() -> Facility {
        let reported_on = NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid date");
        Facility {
            id: FacilityId(1),
            name: "さくら保育園".to_owned(),
            location: Coordinates {
                longitude: 139.68,
                latitude: 35.51,
            },
            stats: StatisticsSet::from_records([
                StatRecord {
                    kind: StatKind::Accepted,
                    reported_on,
                    counts: [5, 0, 0, 0, 0, 0],
                },
                StatRecord {
                    kind: StatKind::Waiting,
                    reported_on,
                    counts: [3, 0, 0, 0, 0, 0],
                },
            ]),
        }
    }

    fn session() -> (MapSession<RecordingBridge>, Arc<FixedSource>) {
        let source = Arc::new(FixedSource {
            fail: Mutex::new(false),
        });
        let repository = Arc::new(StatsRepository::new(
            Arc::clone(&source) as Arc<dyn FacilitySource>
        ));
        let session = MapSession::new(
            repository,
            WardGazetteer::yokohama(),
            RecordingBridge::default(),
        );
        (session, source)
    }

    #[tokio::test]
    async fn selecting_a_ward_flies_fetches_and_renders() {
        let (mut session, _) = session();
        assert_eq!(session.overlay().kind(), OverlayKind::Ward);

        let outcome = session
            .select_area(AreaKey::new("鶴見区"))
            .await
            .expect("fetch succeeds");

        assert_eq!(outcome, FetchOutcome::Applied(2));
        assert_eq!(session.overlay().kind(), OverlayKind::Closed);
        let tsurumi = session.gazetteer().bounds_of("鶴見区").expect("bounds");
        assert_eq!(session.bridge().flights, vec![FlyTarget::Bounds(tsurumi)]);
        assert_eq!(
            session.bridge().rendered.last(),
            Some(&vec![FacilityId(1), FacilityId(2)])
        );
    }

    #[tokio::test]
    async fn criteria_changes_redraw_the_filtered_set() {
        let (mut session, _) = session();
        session
            .select_area(AreaKey::new("鶴見区"))
            .await
            .expect("fetch succeeds");

        session.update_criteria(|criteria| {
            criteria.constraints.push(AgeConstraint::new(AgeClass::Zero, 2));
        });
        assert_eq!(session.bridge().rendered.last(), Some(&vec![FacilityId(1)]));

        session.update_criteria(|criteria| criteria.adjust(AgeClass::Zero, 1));
        assert!(session.visible().is_empty());
        assert_eq!(session.facilities().len(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_data() {
        let (mut session, source) = session();
        session
            .select_area(AreaKey::new("中区"))
            .await
            .expect("fetch succeeds");

        *source.fail.lock().expect("flag lock") = true;
        let err = session
            .select_area(AreaKey::new("西区"))
            .await
            .expect_err("fetch fails");

        assert!(err.is_format());
        assert_eq!(session.visible().len(), 2);
        assert_eq!(session.selected_area(), Some(&AreaKey::new("西区")));
    }

    #[test]
    fn superseded_results_are_dropped() {
        let (mut session, _) = session();
        let first = session.begin_area(AreaKey::new("港北区"));
        let second = session.begin_area(AreaKey::new("緑区"));

        let late = session.complete_area(&first, Ok(Arc::new(vec![sakura()])));
        assert_eq!(late.expect("no error"), FetchOutcome::Superseded);
        assert!(session.visible().is_empty());

        let current = session.complete_area(&second, Ok(Arc::new(vec![sakura()])));
        assert_eq!(current.expect("no error"), FetchOutcome::Applied(1));
    }

    #[test]
    fn unknown_area_is_fetched_without_navigation() {
        let (mut session, _) = session();
        session.begin_area(AreaKey::new("どこか"));
        assert!(session.bridge().flights.is_empty());
        assert!(session.overlay().is_ward_chosen());
    }

    #[test]
    fn map_events_drive_detail_and_camera() {
        let (mut session, _) = session();
        let area = session.begin_area(AreaKey::new("鶴見区"));
        session
            .complete_area(&area, Ok(Arc::new(vec![sakura()])))
            .expect("applied");

        session.handle_map_event(MapEvent::PointSelected(FacilityId(99)));
        assert_eq!(session.overlay().kind(), OverlayKind::Closed);

        session.handle_map_event(MapEvent::PointSelected(FacilityId(1)));
        assert_eq!(
            session.overlay().selected_facility().map(|facility| facility.name.as_str()),
            Some("さくら保育園")
        );

        let cluster = Bounds::new(139.6, 35.4, 139.7, 35.5);
        session.handle_map_event(MapEvent::ClusterSelected(cluster));
        assert_eq!(
            session.bridge().flights.last(),
            Some(&FlyTarget::Bounds(cluster))
        );
    }
}
