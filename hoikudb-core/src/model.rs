//! Domain data structures for facilities, vacancy statistics, and map geometry.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of age classes reported for every facility.
pub const AGE_CLASS_COUNT: usize = 6;

/// Area key used for the whole city rather than a single ward.
pub const CITY_WIDE_AREA: &str = "横浜市";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Opaque identifier of a childcare facility.
pub struct FacilityId(pub i64);

impl fmt::Display for FacilityId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Name of the area a statistics snapshot is partitioned by: the city or one ward.
pub struct AreaKey(pub String);

impl AreaKey {
    /// Build a key from any ward or city name.
    #[must_use]
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    /// Key covering every ward of the city.
    #[must_use]
    pub fn city_wide() -> Self {
        Self(CITY_WIDE_AREA.to_owned())
    }

    /// Borrow the underlying area name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AreaKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Child age bucket used by every statistic.
pub enum AgeClass {
    /// Children aged 0.
    Zero,
    /// Children aged 1.
    One,
    /// Children aged 2.
    Two,
    /// Children aged 3.
    Three,
    /// Children aged 4.
    Four,
    /// Children aged 5.
    Five,
}

impl AgeClass {
    /// All age classes in ascending order.
    pub const ALL: [AgeClass; AGE_CLASS_COUNT] = [
        AgeClass::Zero,
        AgeClass::One,
        AgeClass::Two,
        AgeClass::Three,
        AgeClass::Four,
        AgeClass::Five,
    ];

    /// Position of this class inside a per-age count array.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            AgeClass::Zero => 0,
            AgeClass::One => 1,
            AgeClass::Two => 2,
            AgeClass::Three => 3,
            AgeClass::Four => 4,
            AgeClass::Five => 5,
        }
    }

    /// Label used by the municipal data set.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AgeClass::Zero => "０歳児",
            AgeClass::One => "１歳児",
            AgeClass::Two => "２歳児",
            AgeClass::Three => "３歳児",
            AgeClass::Four => "４歳児",
            AgeClass::Five => "５歳児",
        }
    }
}

impl TryFrom<u8> for AgeClass {
    type Error = u8;

    fn try_from(age: u8) -> Result<Self, Self::Error> {
        match age {
            0 => Ok(AgeClass::Zero),
            1 => Ok(AgeClass::One),
            2 => Ok(AgeClass::Two),
            3 => Ok(AgeClass::Three),
            4 => Ok(AgeClass::Four),
            5 => Ok(AgeClass::Five),
            other => Err(other),
        }
    }
}

impl fmt::Display for AgeClass {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// What a statistics record counts.
pub enum StatKind {
    /// Children currently enrolled.
    Enrolled,
    /// Places the facility can accept.
    Accepted,
    /// Children on the waiting list.
    Waiting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One reported statistic with a count per age class.
pub struct StatRecord {
    /// Which figure the counts represent.
    pub kind: StatKind,
    /// Reporting date published with the figures.
    pub reported_on: NaiveDate,
    /// Counts indexed by [`AgeClass::index`].
    pub counts: [u32; AGE_CLASS_COUNT],
}

impl StatRecord {
    /// Count for a single age class.
    #[must_use]
    pub fn count(&self, age: AgeClass) -> u32 {
        self.counts.get(age.index()).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// At most one [`StatRecord`] per [`StatKind`].
///
/// A missing kind reads as zero for every age class.
pub struct StatisticsSet {
    enrolled: Option<StatRecord>,
    accepted: Option<StatRecord>,
    waiting: Option<StatRecord>,
}

impl StatisticsSet {
    /// Build a set from records, keeping the most recently reported one for a repeated kind.
    pub fn from_records<I: IntoIterator<Item = StatRecord>>(records: I) -> Self {
        let mut set = Self::default();
        for record in records {
            set.insert(record);
        }
        set
    }

    /// Insert a record unless a newer record of the same kind is already present.
    pub fn insert(&mut self, record: StatRecord) {
        let slot = match record.kind {
            StatKind::Enrolled => &mut self.enrolled,
            StatKind::Accepted => &mut self.accepted,
            StatKind::Waiting => &mut self.waiting,
        };
        let replace = slot
            .as_ref()
            .is_none_or(|existing| existing.reported_on <= record.reported_on);
        if replace {
            *slot = Some(record);
        }
    }

    /// Record of the given kind, if reported.
    #[must_use]
    pub fn record(&self, kind: StatKind) -> Option<&StatRecord> {
        match kind {
            StatKind::Enrolled => self.enrolled.as_ref(),
            StatKind::Accepted => self.accepted.as_ref(),
            StatKind::Waiting => self.waiting.as_ref(),
        }
    }

    /// Count of a kind for an age class, zero when the kind is absent.
    #[must_use]
    pub fn count(&self, kind: StatKind, age: AgeClass) -> u32 {
        self.record(kind).map_or(0, |record| record.count(age))
    }

    /// Places the facility accepts in an age class.
    #[must_use]
    pub fn accepted(&self, age: AgeClass) -> u32 {
        self.count(StatKind::Accepted, age)
    }

    /// Children waiting in an age class.
    #[must_use]
    pub fn waiting(&self, age: AgeClass) -> u32 {
        self.count(StatKind::Waiting, age)
    }

    /// Children enrolled in an age class.
    #[must_use]
    pub fn enrolled(&self, age: AgeClass) -> u32 {
        self.count(StatKind::Enrolled, age)
    }

    /// Places still open for an age class: accepted minus waiting, floored at zero.
    #[must_use]
    pub fn available(&self, age: AgeClass) -> u32 {
        self.accepted(age).saturating_sub(self.waiting(age))
    }

    /// True when no record of any kind is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enrolled.is_none() && self.accepted.is_none() && self.waiting.is_none()
    }

    /// Latest reporting date across all records.
    #[must_use]
    pub fn reported_on(&self) -> Option<NaiveDate> {
        [&self.enrolled, &self.accepted, &self.waiting]
            .into_iter()
            .flatten()
            .map(|record| record.reported_on)
            .max()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// WGS84 point.
pub struct Coordinates {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Axis-aligned longitude/latitude rectangle.
pub struct Bounds {
    /// Western edge.
    pub min_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl Bounds {
    /// Construct bounds from the south-west and north-east corners.
    #[must_use]
    pub const fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Midpoint of the rectangle.
    #[must_use]
    pub fn center(&self) -> Coordinates {
        Coordinates {
            longitude: f64::midpoint(self.min_lon, self.max_lon),
            latitude: f64::midpoint(self.min_lat, self.max_lat),
        }
    }

    /// Whether the point lies inside or on the edge of the rectangle.
    #[must_use]
    pub fn contains(&self, point: Coordinates) -> bool {
        (self.min_lon..=self.max_lon).contains(&point.longitude)
            && (self.min_lat..=self.max_lat).contains(&point.latitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Childcare facility shown on the map.
pub struct Facility {
    /// Provider identifier.
    pub id: FacilityId,
    /// Display name.
    pub name: String,
    /// Location of the facility.
    pub location: Coordinates,
    /// Reported vacancy statistics.
    pub stats: StatisticsSet,
}

/// Shared, immutable facility snapshot as returned by the statistics cache.
pub type FacilityCollection = Arc<Vec<Facility>>;
