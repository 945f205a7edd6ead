//! Area-partitioned cache in front of a [`FacilitySource`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use crate::model::{AreaKey, FacilityCollection};
use crate::ports::{Clock, FacilitySource, PortError, SystemClock};

/// Default lifetime of a cached area snapshot.
pub const DEFAULT_TTL: TimeDelta = TimeDelta::minutes(5);

#[derive(Debug, Clone)]
/// Snapshot of one area as fetched at a point in time.
pub struct CacheEntry {
    /// Area the snapshot belongs to.
    pub area: AreaKey,
    /// Facilities returned by the source.
    pub snapshot: FacilityCollection,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now.signed_duration_since(self.fetched_at) < ttl
    }
}

/// Fetches facility statistics per area and keeps each snapshot for a fixed TTL.
///
/// Concurrent fetches of the same area are not coalesced: two callers racing on a cold key
/// both reach the source, and the later completion overwrites the earlier entry.
pub struct StatsRepository {
    source: Arc<dyn FacilitySource>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    entries: Mutex<HashMap<AreaKey, CacheEntry>>,
}

impl StatsRepository {
    /// Repository using the system clock and [`DEFAULT_TTL`].
    #[must_use]
    pub fn new(source: Arc<dyn FacilitySource>) -> Self {
        Self::with_clock(source, Arc::new(SystemClock), DEFAULT_TTL)
    }

    /// Repository with an explicit clock and TTL.
    #[must_use]
    pub fn with_clock(source: Arc<dyn FacilitySource>, clock: Arc<dyn Clock>, ttl: TimeDelta) -> Self {
        Self {
            source,
            clock,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Lifetime of a cached snapshot.
    #[must_use]
    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Return the facilities of an area, from cache while fresh, otherwise from the source.
    ///
    /// A failed refresh leaves any stale entry untouched and is reported as-is; stale data is
    /// never served in its place.
    ///
    /// # Errors
    ///
    /// Propagates the source's transport or format [`PortError`] without retrying.
    pub async fn fetch(&self, area: &AreaKey) -> Result<FacilityCollection, PortError> {
        let now = self.clock.now();
        if let Some(entry) = self.cached(area)
            && entry.is_fresh(now, self.ttl)
        {
            debug!(%area, fetched_at = %entry.fetched_at, "statistics cache hit");
            return Ok(entry.snapshot);
        }

        debug!(%area, "statistics cache miss");
        let facilities = match self.source.fetch_area(area).await {
            Ok(facilities) => facilities,
            Err(err) => {
                warn!(%area, error = %err, "failed to fetch facility statistics");
                return Err(err);
            }
        };

        let entry = CacheEntry {
            area: area.clone(),
            snapshot: Arc::new(facilities),
            fetched_at: self.clock.now(),
        };
        info!(%area, facilities = entry.snapshot.len(), "fetched facility statistics");

        let snapshot = Arc::clone(&entry.snapshot);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(area.clone(), entry);
        Ok(snapshot)
    }

    /// Current cache entry for an area regardless of age.
    #[must_use]
    pub fn cached(&self, area: &AreaKey) -> Option<CacheEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(area)
            .cloned()
    }

    /// Areas that have been fetched at least once, sorted by name.
    #[must_use]
    pub fn cached_areas(&self) -> Vec<AreaKey> {
        let mut areas: Vec<AreaKey> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        areas.sort();
        areas
    }
}
