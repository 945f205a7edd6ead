//! Static ward name to bounding box table used to re-center the map.

use std::collections::HashMap;
use std::iter;

use crate::model::{AreaKey, Bounds, CITY_WIDE_AREA};
use crate::ports::PortError;

/// The 18 wards of Yokohama with approximate bounding boxes, north to south.
const YOKOHAMA_WARDS: [(&str, Bounds); 18] = [
    ("青葉区", Bounds::new(139.46, 35.53, 139.54, 35.59)),
    ("都筑区", Bounds::new(139.54, 35.52, 139.61, 35.57)),
    ("港北区", Bounds::new(139.59, 35.50, 139.67, 35.55)),
    ("緑区", Bounds::new(139.49, 35.48, 139.57, 35.54)),
    ("鶴見区", Bounds::new(139.64, 35.47, 139.72, 35.53)),
    ("神奈川区", Bounds::new(139.58, 35.46, 139.67, 35.51)),
    ("瀬谷区", Bounds::new(139.47, 35.45, 139.52, 35.50)),
    ("旭区", Bounds::new(139.49, 35.44, 139.57, 35.50)),
    ("保土ケ谷区", Bounds::new(139.55, 35.43, 139.62, 35.48)),
    ("西区", Bounds::new(139.60, 35.44, 139.64, 35.47)),
    ("中区", Bounds::new(139.62, 35.41, 139.68, 35.46)),
    ("南区", Bounds::new(139.58, 35.41, 139.63, 35.45)),
    ("泉区", Bounds::new(139.47, 35.38, 139.53, 35.44)),
    ("戸塚区", Bounds::new(139.49, 35.37, 139.57, 35.43)),
    ("港南区", Bounds::new(139.56, 35.37, 139.62, 35.42)),
    ("磯子区", Bounds::new(139.59, 35.37, 139.66, 35.42)),
    ("栄区", Bounds::new(139.53, 35.33, 139.59, 35.38)),
    ("金沢区", Bounds::new(139.59, 35.31, 139.67, 35.38)),
];

/// Extent of the whole city, used for the city-wide area key.
const YOKOHAMA_BOUNDS: Bounds = Bounds::new(139.46, 35.31, 139.72, 35.59);

/// Read-only lookup from area name to its bounding box.
pub struct WardGazetteer {
    order: Vec<AreaKey>,
    bounds: HashMap<AreaKey, Bounds>,
}

impl WardGazetteer {
    /// Gazetteer for Yokohama: the city-wide key followed by its 18 wards.
    #[must_use]
    pub fn yokohama() -> Self {
        let entries = iter::once((CITY_WIDE_AREA, YOKOHAMA_BOUNDS)).chain(YOKOHAMA_WARDS);
        let mut order = Vec::with_capacity(YOKOHAMA_WARDS.len() + 1);
        let mut bounds = HashMap::with_capacity(YOKOHAMA_WARDS.len() + 1);
        for (name, extent) in entries {
            let key = AreaKey::new(name);
            order.push(key.clone());
            bounds.insert(key, extent);
        }
        Self { order, bounds }
    }

    /// Bounding box of an area.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::WardNotFound`] for names outside the table; callers treat this as
    /// "do not navigate".
    pub fn bounds_of(&self, name: &str) -> Result<Bounds, PortError> {
        self.bounds
            .get(&AreaKey::new(name))
            .copied()
            .ok_or_else(|| PortError::WardNotFound(name.to_owned()))
    }

    /// Area keys in display order, city-wide first.
    pub fn areas(&self) -> impl Iterator<Item = &AreaKey> {
        self.order.iter()
    }

    /// Number of areas, including the city-wide key.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_city_then_eighteen_wards() {
        let gazetteer = WardGazetteer::yokohama();
        assert_eq!(gazetteer.len(), 19);
        assert_eq!(gazetteer.areas().next(), Some(&AreaKey::city_wide()));
    }

    #[test]
    fn ward_bounds_lie_within_the_city() {
        let gazetteer = WardGazetteer::yokohama();
        let city = gazetteer.bounds_of(CITY_WIDE_AREA).expect("city bounds");
        for area in gazetteer.areas() {
            let ward = gazetteer.bounds_of(area.as_str()).expect("ward bounds");
            assert!(ward.min_lon < ward.max_lon && ward.min_lat < ward.max_lat);
            assert!(city.contains(ward.center()), "{area} center outside city");
        }
    }

    #[test]
    fn tsurumi_lookup() {
        let bounds = WardGazetteer::yokohama()
            .bounds_of("鶴見区")
            .expect("tsurumi bounds");
        assert!(bounds.min_lon > 139.6);
    }

    #[test]
    fn unknown_ward_is_not_found() {
        let err = WardGazetteer::yokohama()
            .bounds_of("川崎区")
            .expect_err("not a Yokohama ward");
        assert!(matches!(err, PortError::WardNotFound(name) if name == "川崎区"));
    }
}
