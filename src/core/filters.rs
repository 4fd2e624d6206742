use crate::core::architects::legacy_name_matches;
use crate::core::distance::distance_from;
use crate::models::{Building, FilterState, Language, SearchPage};

/// Residential category literal, Japanese type list
pub const RESIDENTIAL_JA: &str = "住宅";
/// Residential category literal, English type list
pub const RESIDENTIAL_EN: &str = "housing";

/// Case-insensitive substring test
#[inline]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Free-text match over titles, location and every architect name
#[inline]
pub fn matches_text(building: &Building, query: &str) -> bool {
    let fields = [
        Some(building.title.as_str()),
        building.title_en.as_deref(),
        building.location.as_deref(),
    ];
    if fields.iter().flatten().any(|f| contains_ignore_case(f, query)) {
        return true;
    }

    [Language::Ja, Language::En].iter().any(|lang| {
        building
            .architect_names(*lang)
            .iter()
            .any(|name| contains_ignore_case(name, query))
    })
}

/// Any selected architect name overlaps any credited name, in either direction
#[inline]
pub fn matches_architects(building: &Building, selected: &[&str], language: Language) -> bool {
    if selected.is_empty() {
        return true;
    }
    let names = building.architect_names(language);
    selected
        .iter()
        .any(|s| names.iter().any(|name| legacy_name_matches(s, name)))
}

/// Any selected type is contained in the building's type list
#[inline]
pub fn matches_building_types(building: &Building, selected: &[&str], language: Language) -> bool {
    if selected.is_empty() {
        return true;
    }
    let types = building.building_types_for(language);
    selected
        .iter()
        .any(|s| types.iter().any(|t| contains_ignore_case(t, s)))
}

/// Residential in either language
#[inline]
pub fn is_residential(building: &Building) -> bool {
    building
        .building_types
        .iter()
        .any(|t| t.contains(RESIDENTIAL_JA))
        || building
            .building_types_en
            .iter()
            .any(|t| contains_ignore_case(t, RESIDENTIAL_EN))
}

/// Every non-geo facet, in the same precedence the backend plan uses
pub fn matches_facets(building: &Building, filters: &FilterState, language: Language) -> bool {
    if let Some(query) = filters.trimmed_query() {
        if !matches_text(building, query) {
            return false;
        }
    }

    let architects: Vec<&str> = filters.architects.iter().map(String::as_str).collect();
    if !matches_architects(building, &architects, language) {
        return false;
    }

    let types: Vec<&str> = filters.building_types.iter().map(String::as_str).collect();
    if !matches_building_types(building, &types, language) {
        return false;
    }

    if !filters.prefectures.is_empty() {
        match building.prefecture_for(language) {
            Some(p) if filters.prefectures.contains(p) => {}
            _ => return false,
        }
    }

    if !filters.areas.is_empty() {
        match building.area.as_deref() {
            Some(a) if filters.areas.contains(a) => {}
            _ => return false,
        }
    }

    if filters.has_photos && !building.has_photos() {
        return false;
    }
    if filters.has_videos && !building.has_video() {
        return false;
    }

    if let Some(year) = filters.completion_year {
        if building.completion_year != Some(year) {
            return false;
        }
    }

    if filters.exclude_residential && is_residential(building) {
        return false;
    }

    true
}

/// Filter an in-memory collection with no backend involved.
///
/// With a current location set, buildings outside the radius are dropped,
/// `distance` is attached and the result is stably sorted nearest first.
pub fn filter_buildings(buildings: &[Building], filters: &FilterState, language: Language) -> Vec<Building> {
    let mut matched: Vec<Building> = buildings
        .iter()
        .filter(|b| matches_facets(b, filters, language))
        .cloned()
        .collect();

    if let Some(center) = filters.current_location {
        let radius = f64::from(filters.radius);
        matched = matched
            .into_iter()
            .filter_map(|mut b| {
                let distance = distance_from(center, b.latitude, b.longitude);
                (distance <= radius).then(|| {
                    b.distance = Some(distance);
                    b
                })
            })
            .collect();

        // sort_by is stable: equal distances keep collection order
        matched.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    matched
}

/// Filter then slice one page (1-based)
pub fn search_local(
    buildings: &[Building],
    filters: &FilterState,
    language: Language,
    page: u32,
    page_size: usize,
) -> SearchPage {
    let matched = filter_buildings(buildings, filters, language);
    let total = matched.len();
    let offset = (page.max(1) as usize - 1) * page_size;

    SearchPage {
        buildings: matched.into_iter().skip(offset).take(page_size).collect(),
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArchitectMembers, CompositeArchitect, GeoPoint, Photo};

    fn create_test_building(id: i64, title: &str, types: &[&str]) -> Building {
        Building {
            id,
            slug: None,
            title: title.to_string(),
            title_en: None,
            location: Some("東京都渋谷区".to_string()),
            location_en: None,
            prefecture: Some("東京都".to_string()),
            prefecture_en: Some("Tokyo".to_string()),
            area: Some("関東".to_string()),
            building_types: types.iter().map(|t| t.to_string()).collect(),
            building_types_en: vec![],
            structures: vec![],
            structures_en: vec![],
            completion_year: Some(2001),
            latitude: 35.68,
            longitude: 139.65,
            architects: vec![],
            photos: vec![],
            thumbnail_url: None,
            youtube_url: None,
            likes: 0,
            distance: None,
        }
    }

    fn legacy_credit(name: &str) -> CompositeArchitect {
        CompositeArchitect {
            architect_id: 1,
            name_ja: name.to_string(),
            name_en: None,
            slug: None,
            order: 1,
            members: ArchitectMembers::LegacyDelimited,
        }
    }

    #[test]
    fn test_residential_exclusion() {
        let house = create_test_building(1, "House", &["住宅", "美術館"]);
        let museum = create_test_building(2, "Museum", &["美術館"]);
        let state = FilterState::default();

        assert!(!matches_facets(&house, &state, Language::Ja));
        assert!(matches_facets(&museum, &state, Language::Ja));

        let mut en_house = create_test_building(3, "Villa", &[]);
        en_house.building_types_en = vec!["Private Housing".to_string()];
        assert!(is_residential(&en_house));
    }

    #[test]
    fn test_legacy_names_filter_by_segment() {
        let mut building = create_test_building(1, "Pavilion", &["展示施設"]);
        building.architects = vec![legacy_credit("安藤忠雄　隈研吾")];

        assert!(matches_architects(&building, &["隈研吾"], Language::Ja));
        assert!(matches_architects(&building, &["安藤忠雄"], Language::Ja));
        assert!(matches_architects(&building, &["安藤"], Language::Ja));
        assert!(!matches_architects(&building, &["丹下健三"], Language::Ja));
    }

    #[test]
    fn test_media_and_year_facets() {
        let mut building = create_test_building(1, "Gallery", &["美術館"]);
        let mut state = FilterState::default();
        state.has_photos = true;
        assert!(!matches_facets(&building, &state, Language::Ja));

        building.photos.push(Photo { id: 1, url: "p.jpg".into(), likes: 0 });
        assert!(matches_facets(&building, &state, Language::Ja));

        state.completion_year = Some(1999);
        assert!(!matches_facets(&building, &state, Language::Ja));
    }

    #[test]
    fn test_radius_filter_sorts_by_distance() {
        let mut far = create_test_building(1, "Far", &[]);
        far.latitude = 35.72;
        let near = create_test_building(2, "Near", &[]);
        let mut outside = create_test_building(3, "Outside", &[]);
        outside.latitude = 36.5;

        let mut state = FilterState::cleared();
        state.current_location = Some(GeoPoint { lat: 35.68, lng: 139.65 });

        let result = filter_buildings(&[far, near, outside], &state, Language::Ja);
        let ids: Vec<i64> = result.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(result[0].distance.unwrap() <= result[1].distance.unwrap());
    }

    #[test]
    fn test_search_local_pages() {
        let buildings: Vec<Building> = (0..5)
            .map(|i| create_test_building(i, &format!("B{}", i), &["美術館"]))
            .collect();
        let page = search_local(&buildings, &FilterState::cleared(), Language::Ja, 2, 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.buildings.iter().map(|b| b.id).collect::<Vec<_>>(), vec![2, 3]);
    }
}
