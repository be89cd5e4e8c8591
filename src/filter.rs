//! Query-side filtering of store records: prefecture, keyword, distance.
//!
//! Records without coordinates are never dropped by the radius filter; they
//! are listed after every located record.

use crate::address::PREFECTURES;
use crate::output::{Coordinate, StoreRecord};
use std::cmp::Ordering;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates in kilometres.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Filter and ordering applied to a record list.
#[derive(Debug, Clone, Default)]
pub struct StoreQuery {
    /// Keep only these prefectures (short form). Empty keeps all.
    pub prefectures: Vec<String>,
    /// Substring that must appear in the name or the address.
    pub keyword: Option<String>,
    /// Reference point for `distance_km`.
    pub origin: Option<Coordinate>,
    /// Drop located records farther than this from `origin`.
    pub radius_km: Option<f64>,
}

impl StoreQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefecture(mut self, pref: impl Into<String>) -> Self {
        self.prefectures.push(pref.into());
        self
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn origin(mut self, origin: Coordinate) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn radius_km(mut self, km: f64) -> Self {
        self.radius_km = Some(km);
        self
    }

    fn matches(&self, r: &StoreRecord) -> bool {
        if !self.prefectures.is_empty() {
            let Some(pref) = r.pref.as_deref() else {
                return false;
            };
            if !self.prefectures.iter().any(|p| p == pref) {
                return false;
            }
        }
        match self.keyword.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() => r.name.contains(k) || r.address.contains(k),
            _ => true,
        }
    }

    /// Filter `records`, annotate `distance_km` from the origin and sort.
    ///
    /// With an origin, located records come first by ascending distance and
    /// the rest follow in (prefecture, address) order. Without one, all
    /// records are in (prefecture, address) order.
    pub fn apply(&self, records: &[StoreRecord]) -> Vec<StoreRecord> {
        let mut out: Vec<StoreRecord> = records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .map(|mut r| {
                r.distance_km = match (self.origin, r.coordinate()) {
                    (Some(o), Some(c)) => Some(haversine_km(o, c)),
                    _ => None,
                };
                r
            })
            .filter(|r| match (self.radius_km, r.distance_km) {
                (Some(max), Some(d)) => d <= max,
                _ => true,
            })
            .collect();

        out.sort_by(|a, b| match (a.distance_km, b.distance_km) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => pref_rank(a)
                .cmp(&pref_rank(b))
                .then_with(|| a.address.cmp(&b.address)),
        });
        out
    }
}

fn pref_rank(r: &StoreRecord) -> usize {
    r.pref
        .as_deref()
        .and_then(|p| PREFECTURES.iter().position(|q| *q == p))
        .unwrap_or(PREFECTURES.len())
}

/// Distinct prefectures present in `records`, north to south.
pub fn prefectures(records: &[StoreRecord]) -> Vec<String> {
    PREFECTURES
        .iter()
        .filter(|p| records.iter().any(|r| r.pref.as_deref() == Some(**p)))
        .map(|p| p.to_string())
        .collect()
}

/// Google Maps search link for an address.
pub fn maps_search_url(address: &str) -> String {
    format!(
        "https://www.google.com/maps/search/?api=1&query={}",
        urlencoding::encode(address)
    )
}
