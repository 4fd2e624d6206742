use std::collections::HashSet;
use thiserror::Error;

use crate::models::{
    ArchitectMembers, Building, BuildingRow, CompositeArchitect, CompositionRow, CreditRow,
    IndividualArchitect, Photo,
};

/// Reasons a single backend record cannot become a [`Building`]
#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    #[error("building {0} has no usable coordinates")]
    MissingCoordinates(i64),

    #[error("building {id} has out-of-range coordinates ({lat}, {lng})")]
    CoordinatesOutOfRange { id: i64, lat: f64, lng: f64 },
}

/// Building types are slash-delimited
pub fn split_building_types(raw: Option<&str>) -> Vec<String> {
    split_on(raw, '/')
}

/// Structural categories are comma-delimited
pub fn split_categories(raw: Option<&str>) -> Vec<String> {
    split_on(raw, ',')
}

fn split_on(raw: Option<&str>, delimiter: char) -> Vec<String> {
    raw.map(|s| {
        s.split(delimiter)
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Completion year as stored (nullable text). Non-numeric means unknown.
pub fn parse_year(raw: Option<&str>) -> Option<i32> {
    raw.and_then(|s| s.trim().parse::<i32>().ok())
}

/// Order composition rows by `order_index` and keep the first row per individual
pub fn dedupe_individuals(rows: &[CompositionRow]) -> Vec<IndividualArchitect> {
    let mut sorted: Vec<&CompositionRow> = rows.iter().collect();
    sorted.sort_by_key(|r| r.order_index);

    let mut seen = HashSet::new();
    sorted
        .into_iter()
        .filter_map(|r| r.individual.as_ref())
        .filter(|a| seen.insert(a.individual_architect_id))
        .cloned()
        .collect()
}

/// Build the ordered composite credit list of one building
pub fn composite_architects(credits: &[CreditRow]) -> Vec<CompositeArchitect> {
    let mut ordered: Vec<&CreditRow> = credits.iter().collect();
    ordered.sort_by_key(|c| c.architect_order);

    ordered
        .into_iter()
        .filter_map(|credit| {
            let composite = credit.architect.as_ref()?;
            let members = if composite.compositions.is_empty() {
                ArchitectMembers::LegacyDelimited
            } else {
                ArchitectMembers::Composed(dedupe_individuals(&composite.compositions))
            };
            Some(CompositeArchitect {
                architect_id: composite.architect_id,
                name_ja: composite.name_ja.clone(),
                name_en: composite.name_en.clone(),
                slug: composite.slug.clone(),
                order: credit.architect_order,
                members,
            })
        })
        .collect()
}

/// Turn one backend row into a validated building
pub fn transform_row(row: BuildingRow) -> Result<Building, TransformError> {
    let (lat, lng) = row
        .coordinates()
        .ok_or(TransformError::MissingCoordinates(row.building_id))?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(TransformError::CoordinatesOutOfRange {
            id: row.building_id,
            lat,
            lng,
        });
    }

    let architects = composite_architects(&row.building_architects);

    let photos = row
        .photos
        .into_iter()
        .map(|p| Photo {
            id: p.id,
            url: p.url,
            likes: p.likes.unwrap_or(0),
        })
        .collect();

    Ok(Building {
        id: row.building_id,
        slug: row.slug,
        title: row.title,
        title_en: row.title_en,
        location: row.location,
        location_en: row.location_en,
        prefecture: row.prefecture,
        prefecture_en: row.prefecture_en,
        area: row.area,
        building_types: split_building_types(row.building_types.as_deref()),
        building_types_en: split_building_types(row.building_types_en.as_deref()),
        structures: split_categories(row.structures.as_deref()),
        structures_en: split_categories(row.structures_en.as_deref()),
        completion_year: parse_year(row.completion_years.as_deref()),
        latitude: lat,
        longitude: lng,
        architects,
        photos,
        thumbnail_url: row.thumbnail_url,
        youtube_url: row.youtube_url,
        likes: row.likes.unwrap_or(0),
        distance: row.distance,
    })
}

/// Transform a batch, skipping (and logging) records that fail validation
pub fn transform_rows(rows: Vec<BuildingRow>) -> Vec<Building> {
    let total = rows.len();
    let buildings: Vec<Building> = rows
        .into_iter()
        .filter_map(|row| match transform_row(row) {
            Ok(building) => Some(building),
            Err(e) => {
                tracing::warn!("Skipping invalid building record: {}", e);
                None
            }
        })
        .collect();

    if buildings.len() < total {
        tracing::debug!("Transformed {} of {} records", buildings.len(), total);
    }

    buildings
}
