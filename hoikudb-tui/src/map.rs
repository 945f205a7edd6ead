use crossbeam_channel::Receiver;
use hoikudb_core::{
    model::{Bounds, Coordinates, Facility},
    overlay::OverlayBroadcast,
    ports::{FlyTarget, MapEvent, MapViewBridge},
};

// Whole-city extent shown before the first ward is picked.
const INITIAL_VIEW: Bounds = Bounds::new(139.46, 35.31, 139.72, 35.59);
// Keeps markers on the edge of a ward visible.
const FIT_PADDING: f64 = 0.1;
const PAN_STEP: f64 = 0.2;
const MIN_SPAN: f64 = 0.002;

/// Canvas-backed map renderer for the terminal.
pub(crate) struct TerminalMap {
    facilities: Vec<Facility>,
    viewport: Bounds,
    cursor: usize,
    covered: bool,
    broadcasts: Receiver<OverlayBroadcast>,
}

impl TerminalMap {
    pub(crate) fn new(broadcasts: Receiver<OverlayBroadcast>) -> Self {
        Self {
            facilities: Vec::new(),
            viewport: INITIAL_VIEW,
            cursor: 0,
            covered: false,
            broadcasts,
        }
    }

    pub(crate) fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    pub(crate) fn viewport(&self) -> Bounds {
        self.viewport
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether an overlay currently covers the map.
    pub(crate) fn is_covered(&self) -> bool {
        self.covered
    }

    /// Seed the covered flag before any broadcast arrives.
    pub(crate) fn set_covered(&mut self, covered: bool) {
        self.covered = covered;
    }

    /// Apply overlay broadcasts received since the last frame.
    pub(crate) fn sync_overlay(&mut self) {
        if let Some(latest) = self.broadcasts.try_iter().last() {
            self.covered = latest.any_open;
        }
    }

    pub(crate) fn cursor_facility(&self) -> Option<&Facility> {
        self.facilities.get(self.cursor)
    }

    pub(crate) fn move_cursor(&mut self, forward: bool) {
        if forward {
            if self.cursor + 1 < self.facilities.len() {
                self.cursor += 1;
            }
        } else {
            self.cursor = self.cursor.saturating_sub(1);
        }
    }

    /// Shift the view by a fraction of its span.
    pub(crate) fn pan(&mut self, east: f64, north: f64) -> MapEvent {
        let dx = (self.viewport.max_lon - self.viewport.min_lon) * PAN_STEP * east;
        let dy = (self.viewport.max_lat - self.viewport.min_lat) * PAN_STEP * north;
        self.viewport = Bounds::new(
            self.viewport.min_lon + dx,
            self.viewport.min_lat + dy,
            self.viewport.max_lon + dx,
            self.viewport.max_lat + dy,
        );
        MapEvent::ViewportChanged
    }

    /// Scale the view around its center; factors below one zoom in.
    pub(crate) fn zoom(&mut self, factor: f64) -> MapEvent {
        let center = self.viewport.center();
        let span_lon = self.viewport.max_lon - self.viewport.min_lon;
        let span_lat = self.viewport.max_lat - self.viewport.min_lat;
        let half_lon = (span_lon * factor / 2.0).max(MIN_SPAN);
        let half_lat = (span_lat * factor / 2.0).max(MIN_SPAN);
        self.viewport = around(center, half_lon, half_lat);
        MapEvent::ViewportChanged
    }

    /// Click on the marker under the cursor.
    pub(crate) fn click_point(&self) -> Option<MapEvent> {
        self.cursor_facility()
            .map(|facility| MapEvent::PointSelected(facility.id.clone()))
    }

    /// Click on the group of markers surrounding the cursor.
    pub(crate) fn click_cluster(&self) -> Option<MapEvent> {
        let facility = self.cursor_facility()?;
        let half_lon = (self.viewport.max_lon - self.viewport.min_lon) / 8.0;
        let half_lat = (self.viewport.max_lat - self.viewport.min_lat) / 8.0;
        Some(MapEvent::ClusterSelected(around(
            facility.location,
            half_lon,
            half_lat,
        )))
    }
}

impl MapViewBridge for TerminalMap {
    fn set_facilities(&mut self, facilities: &[Facility]) {
        self.facilities = facilities.to_vec();
        if self.cursor >= self.facilities.len() {
            self.cursor = self.facilities.len().saturating_sub(1);
        }
    }

    fn fly_to(&mut self, target: FlyTarget) {
        self.viewport = match target {
            FlyTarget::Bounds(bounds) => {
                let pad_lon = (bounds.max_lon - bounds.min_lon) * FIT_PADDING;
                let pad_lat = (bounds.max_lat - bounds.min_lat) * FIT_PADDING;
                Bounds::new(
                    bounds.min_lon - pad_lon,
                    bounds.min_lat - pad_lat,
                    bounds.max_lon + pad_lon,
                    bounds.max_lat + pad_lat,
                )
            }
            FlyTarget::Point { center, zoom } => {
                let half = (180.0 / zoom.exp2()).max(MIN_SPAN);
                around(center, half, half)
            }
        };
    }
}

fn around(center: Coordinates, half_lon: f64, half_lat: f64) -> Bounds {
    Bounds::new(
        center.longitude - half_lon,
        center.latitude - half_lat,
        center.longitude + half_lon,
        center.latitude + half_lat,
    )
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::unbounded;
    use hoikudb_core::model::{FacilityId, StatisticsSet};
    use hoikudb_core::overlay::OverlayKind;

    use super::*;

    fn facility(id: i64) -> Facility {
        Facility {
            id: FacilityId(id),
            name: format!("保育園{id}"),
            location: Coordinates {
                longitude: 139.6,
                latitude: 35.45,
            },
            stats: StatisticsSet::default(),
        }
    }

    #[test]
    fn fly_to_bounds_pads_the_view() {
        let (_tx, rx) = unbounded();
        let mut map = TerminalMap::new(rx);
        let ward = Bounds::new(139.6, 35.4, 139.7, 35.5);

        map.fly_to(FlyTarget::Bounds(ward));

        let view = map.viewport();
        assert!(view.min_lon < ward.min_lon && view.max_lat > ward.max_lat);
        assert!(view.contains(ward.center()));
    }

    #[test]
    fn cursor_is_clamped_when_facilities_shrink() {
        let (_tx, rx) = unbounded();
        let mut map = TerminalMap::new(rx);
        map.set_facilities(&[facility(1), facility(2), facility(3)]);
        map.move_cursor(true);
        map.move_cursor(true);
        map.move_cursor(true);
        assert_eq!(map.cursor(), 2);

        map.set_facilities(&[facility(1)]);
        assert_eq!(map.cursor(), 0);
        assert_eq!(
            map.click_point(),
            Some(MapEvent::PointSelected(FacilityId(1)))
        );
    }

    #[test]
    fn covered_follows_latest_broadcast() {
        let (tx, rx) = unbounded();
        let mut map = TerminalMap::new(rx);
        for kind in [OverlayKind::Ward, OverlayKind::Closed, OverlayKind::Filter] {
            tx.send(OverlayBroadcast {
                kind,
                any_open: kind != OverlayKind::Closed,
                ward_chosen: true,
            })
            .expect("send");
        }

        map.sync_overlay();
        assert!(map.is_covered());
    }
}
