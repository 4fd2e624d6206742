//! URL query-parameter encoding of [`FilterState`].
//!
//! Sets are comma-joined, defaults are omitted, `lat`/`lng` only travel together.

use std::collections::BTreeSet;

use crate::models::domain::{FilterState, GeoPoint, DEFAULT_RADIUS_KM};

/// Filter state plus the page it was showing
#[derive(Debug, Clone, PartialEq)]
pub struct FilterQuery {
    pub filters: FilterState,
    pub page: u32,
}

impl Default for FilterQuery {
    fn default() -> Self {
        Self {
            filters: FilterState::default(),
            page: 1,
        }
    }
}

fn join_set(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

fn split_set(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Encode as ordered `(key, value)` pairs, unescaped
pub fn to_pairs(filters: &FilterState, page: u32) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();

    if let Some(q) = filters.trimmed_query() {
        pairs.push(("q", q.to_string()));
    }
    if filters.radius != DEFAULT_RADIUS_KM {
        pairs.push(("radius", filters.radius.to_string()));
    }
    for (key, set) in [
        ("architects", &filters.architects),
        ("buildingTypes", &filters.building_types),
        ("prefectures", &filters.prefectures),
        ("areas", &filters.areas),
    ] {
        if !set.is_empty() {
            pairs.push((key, join_set(set)));
        }
    }
    if filters.has_photos {
        pairs.push(("hasPhotos", "true".to_string()));
    }
    if filters.has_videos {
        pairs.push(("hasVideos", "true".to_string()));
    }
    if let Some(point) = filters.current_location {
        pairs.push(("lat", point.lat.to_string()));
        pairs.push(("lng", point.lng.to_string()));
    }
    if let Some(year) = filters.completion_year {
        pairs.push(("year", year.to_string()));
    }
    if page > 1 {
        pairs.push(("page", page.to_string()));
    }

    pairs
}

/// Encode as a percent-escaped query string (no leading `?`)
pub fn encode(filters: &FilterState, page: u32) -> String {
    to_pairs(filters, page)
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(&v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Decode from unescaped `(key, value)` pairs.
///
/// Malformed numbers are treated as absent. Unknown keys are ignored.
pub fn from_pairs<'a, I>(pairs: I) -> FilterQuery
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut filters = FilterState::default();
    let mut page = 1;
    let mut lat = None;
    let mut lng = None;

    for (key, value) in pairs {
        match key {
            "q" => filters.query = value.to_string(),
            "radius" => {
                if let Ok(r) = value.trim().parse::<u32>() {
                    filters.radius = r;
                }
            }
            "architects" => filters.architects = split_set(value),
            "buildingTypes" => filters.building_types = split_set(value),
            "prefectures" => filters.prefectures = split_set(value),
            "areas" => filters.areas = split_set(value),
            "hasPhotos" => filters.has_photos = value == "true",
            "hasVideos" => filters.has_videos = value == "true",
            "lat" => lat = value.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            "lng" => lng = value.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            "year" => filters.completion_year = value.trim().parse::<i32>().ok(),
            "page" => {
                page = value
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|p| *p >= 1)
                    .unwrap_or(1)
            }
            _ => {}
        }
    }

    if let (Some(lat), Some(lng)) = (lat, lng) {
        filters.current_location = Some(GeoPoint { lat, lng });
    }

    FilterQuery { filters, page }
}

/// Decode a raw query string such as `q=%E5%AE%89%E8%97%A4&page=2`
pub fn decode(query_string: &str) -> FilterQuery {
    let decoded: Vec<(String, String)> = decode_raw(query_string);
    from_pairs(decoded.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

/// Split and percent-decode a query string. `+` is read as a space.
pub fn decode_raw(query_string: &str) -> Vec<(String, String)> {
    query_string
        .trim_start_matches('?')
        .split('&')
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            let key = urlencoding::decode(&key.replace('+', " ")).ok()?.into_owned();
            let value = urlencoding::decode(&value.replace('+', " ")).ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}
