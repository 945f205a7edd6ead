//! Facility source for the Yokohama childcare vacancy open data.
//!
//! The endpoint serves a GeoJSON feature collection per area. Statistics come from the
//! city's monthly CSV releases, so counts may arrive as numbers, numeric strings, or `"-"`
//! for figures that were not reported.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use hoikudb_core::{
    model::{
        AGE_CLASS_COUNT, AreaKey, Coordinates, Facility, FacilityId, StatKind, StatRecord,
        StatisticsSet,
    },
    ports::{FacilitySource, PortError},
};

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Top level of the endpoint response.
#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    typ: String,
    features: Vec<Feature>,
    // "crs" is always CRS84, no need to model it
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: Properties,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Properties {
    id: i64,
    name: String,
    // kept raw so one bad record only empties this facility's statistics
    #[serde(default)]
    stats: Value,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

/// Single entry of `properties.stats`.
#[derive(Debug, Deserialize)]
struct StatEntry {
    kind: StatKind,
    reported_on: String,
    counts: Vec<Count>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
    Number(u32),
    Text(String),
}

/// HTTP implementation of [`FacilitySource`].
pub struct YokohamaFacilitySource {
    client: Client,
    endpoint: String,
}

impl YokohamaFacilitySource {
    /// Create a source that queries `endpoint` with the given HTTP client.
    #[must_use]
    pub fn new<S: Into<String>>(client: Client, endpoint: S) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl FacilitySource for YokohamaFacilitySource {
    async fn fetch_area(&self, area: &AreaKey) -> Result<Vec<Facility>, PortError> {
        debug!(%area, endpoint = %self.endpoint, "requesting facility data");
        let req = self
            .client
            .get(&self.endpoint)
            .query(&[("area", area.as_str())]);
        let body = fetch_body(req).await?;
        decode_facilities(&body)
    }
}

/// Build the source as a shareable port.
#[must_use]
pub fn source<S: Into<String>>(client: Client, endpoint: S) -> Arc<dyn FacilitySource> {
    Arc::new(YokohamaFacilitySource::new(client, endpoint))
}

/// Decode a feature collection into facilities.
///
/// # Errors
///
/// Returns [`PortError::Decode`] for invalid JSON and [`PortError::Schema`] when the document
/// is not a feature collection or a feature lacks a coordinate pair. Malformed statistics
/// never fail the decode; the facility gets an empty [`StatisticsSet`] instead.
pub fn decode_facilities(body: &[u8]) -> Result<Vec<Facility>, PortError> {
    let collection: FeatureCollection = serde_json::from_slice(body)?;
    if collection.typ != "FeatureCollection" {
        return Err(PortError::Schema(format!(
            "expected a FeatureCollection, got {}",
            collection.typ
        )));
    }

    collection
        .features
        .into_iter()
        .map(|feature| {
            let Feature {
                properties,
                geometry,
            } = feature;
            let &[longitude, latitude, ..] = geometry.coordinates.as_slice() else {
                return Err(PortError::Schema(format!(
                    "facility {} has no coordinate pair",
                    properties.id
                )));
            };
            let stats = decode_stats(&properties.stats).unwrap_or_else(|reason| {
                warn!(facility = properties.id, %reason, "ignoring malformed statistics");
                StatisticsSet::default()
            });
            Ok(Facility {
                id: FacilityId(properties.id),
                name: properties.name,
                location: Coordinates {
                    longitude,
                    latitude,
                },
                stats,
            })
        })
        .collect()
}

fn decode_stats(raw: &Value) -> Result<StatisticsSet, String> {
    if raw.is_null() {
        return Ok(StatisticsSet::default());
    }
    let entries: Vec<StatEntry> =
        serde_json::from_value(raw.clone()).map_err(|err| err.to_string())?;

    let records = entries
        .into_iter()
        .map(|entry| {
            let reported_on = parse_date(&entry.reported_on)?;
            let counts = parse_counts(&entry.counts)?;
            Ok(StatRecord {
                kind: entry.kind,
                reported_on,
                counts,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(StatisticsSet::from_records(records))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| format!("unrecognised reporting date {raw:?}"))
}

fn parse_counts(raw: &[Count]) -> Result<[u32; AGE_CLASS_COUNT], String> {
    if raw.len() != AGE_CLASS_COUNT {
        return Err(format!(
            "expected {AGE_CLASS_COUNT} age class counts, got {}",
            raw.len()
        ));
    }
    let mut counts = [0; AGE_CLASS_COUNT];
    for (slot, value) in counts.iter_mut().zip(raw) {
        *slot = match value {
            Count::Number(number) => *number,
            Count::Text(text) => match text.trim() {
                // the city publishes "-" for figures it did not report
                "" | "-" => 0,
                digits => digits
                    .parse()
                    .map_err(|err| format!("invalid count {text:?}: {err}"))?,
            },
        };
    }
    Ok(counts)
}

// Send the request and read the body, mapping failures onto transport errors.
async fn fetch_body(req: RequestBuilder) -> Result<Vec<u8>, PortError> {
    let resp = req.send().await.map_err(PortError::from)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(PortError::UpstreamStatus(status.as_u16()));
    }
    let bytes = resp.bytes().await.map_err(PortError::from)?;
    Ok(bytes.to_vec())
}
