//! Traits describing external collaborators and the shared error taxonomy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;

use crate::model::{AreaKey, Bounds, Coordinates, Facility, FacilityId};

#[derive(thiserror::Error, Debug)]
/// Errors surfaced by facility sources, the statistics cache, and the ward gazetteer.
pub enum PortError {
    /// Network layer failed before a response arrived.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Upstream answered with a non-success status.
    #[error("Upstream returned HTTP {0}")]
    UpstreamStatus(u16),
    /// Payload is not valid JSON or does not deserialize.
    #[error("Decode error: {0}")]
    Decode(#[from] JsonError),
    /// Payload is JSON but does not describe facilities.
    #[error("Schema error: {0}")]
    Schema(String),
    /// Ward name is not part of the gazetteer.
    #[error("Unknown ward: {0}")]
    WardNotFound(String),
}

impl PortError {
    /// Upstream could not be reached or refused the request.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, PortError::Network(_) | PortError::UpstreamStatus(_))
    }

    /// Upstream answered, but the payload could not be read as facilities.
    #[must_use]
    pub fn is_format(&self) -> bool {
        matches!(self, PortError::Decode(_) | PortError::Schema(_))
    }
}

#[async_trait]
/// Remote source of facility statistics, partitioned by area.
pub trait FacilitySource: Send + Sync {
    /// Fetch every facility of an area together with its statistics.
    ///
    /// # Errors
    ///
    /// Returns a transport [`PortError`] when the upstream is unreachable or answers with a
    /// failure status, and a format [`PortError`] when the payload cannot be decoded.
    async fn fetch_area(&self, area: &AreaKey) -> Result<Vec<Facility>, PortError>;
}

/// Wall clock used for cache expiry.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
/// [`Clock`] backed by the system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Camera target for [`MapViewBridge::fly_to`].
pub enum FlyTarget {
    /// Fit the view to a rectangle.
    Bounds(Bounds),
    /// Center on a point at a zoom level.
    Point {
        /// Point to center on.
        center: Coordinates,
        /// Target zoom level.
        zoom: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
/// User interactions reported by the map renderer.
pub enum MapEvent {
    /// A single facility marker was clicked.
    PointSelected(FacilityId),
    /// A cluster was clicked; carries the area it approximately covers.
    ClusterSelected(Bounds),
    /// The user panned or zoomed.
    ViewportChanged,
}

/// Map rendering engine that draws facilities and moves the camera.
///
/// Clustering, marker styling and projection are the renderer's business; the core only
/// supplies geometry and consumes [`MapEvent`]s.
pub trait MapViewBridge {
    /// Replace the rendered facilities.
    fn set_facilities(&mut self, facilities: &[Facility]);

    /// Move the camera.
    fn fly_to(&mut self, target: FlyTarget);
}
