// Integration tests for Archi Search

use actix_web::{test, web, App};
use archi_search::core::debounce::LiveFilter;
use archi_search::core::transform::transform_rows;
use archi_search::core::{search_local, EngineOptions, SearchEngine, SearchHistory};
use archi_search::models::{
    Building, BuildingRow, CompositeRow, CompositionRow, CreditRow, FilterState, GeoPoint,
    IndividualArchitect, Language, PhotoRow, RawNumber, RowPage, SearchPage,
};
use archi_search::core::planner::QueryPlan;
use archi_search::routes::{configure_routes, AppState};
use archi_search::services::{
    BuildingStore, CacheKey, CacheManager, DistanceRankParams, HistoryError, HistoryStore, MemoryStore,
    RankingMode, StoreError,
};
use archi_search::models::{HistoryKind, RecordHistoryRequest};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CENTER: GeoPoint = GeoPoint { lat: 35.68, lng: 139.65 };

/// Latitude `km` due north of the center
fn north(km: f64) -> f64 {
    CENTER.lat + km / 6371.0_f64.to_radians()
}

fn individual(id: i64, ja: &str, en: &str) -> IndividualArchitect {
    IndividualArchitect {
        individual_architect_id: id,
        name_ja: ja.to_string(),
        name_en: Some(en.to_string()),
        slug: en.to_lowercase().replace(' ', "-"),
    }
}

fn composite(id: i64, name_ja: &str, members: Vec<(IndividualArchitect, i32)>) -> CompositeRow {
    CompositeRow {
        architect_id: id,
        name_ja: name_ja.to_string(),
        name_en: None,
        slug: None,
        compositions: members
            .into_iter()
            .map(|(person, order)| CompositionRow {
                architect_id: id,
                individual_architect_id: person.individual_architect_id,
                order_index: order,
                individual: Some(person),
            })
            .collect(),
    }
}

fn credit(building_id: i64, architect: CompositeRow, order: i32) -> CreditRow {
    CreditRow {
        building_id,
        architect_id: architect.architect_id,
        architect_order: order,
        architect: Some(architect),
    }
}

fn row(id: i64, title: &str, types: &str, prefecture: &str, lat: f64, lng: f64) -> BuildingRow {
    BuildingRow {
        building_id: id,
        slug: Some(format!("building-{}", id)),
        title: title.to_string(),
        prefecture: Some(prefecture.to_string()),
        building_types: Some(types.to_string()),
        lat: Some(RawNumber::Number(lat)),
        lng: Some(RawNumber::Number(lng)),
        ..BuildingRow::default()
    }
}

/// Six buildings around central Tokyo:
///
/// 1. 4.9 km north, Tange office, with photos
/// 2. 1.0 km north, Ando office, residential
/// 3. 5.1 km north, Ando office plus a joint Ando/Tange team
/// 4. box corner (6.3 km), legacy credit "磯崎新　黒川紀章"
/// 5. unusable latitude
/// 6. Osaka, with a video
fn catalogue() -> Vec<BuildingRow> {
    let tange = individual(100, "丹下健三", "Kenzo Tange");
    let ando = individual(101, "安藤忠雄", "Tadao Ando");

    let tange_office = composite(10, "丹下健三・都市・建築設計研究所", vec![(tange.clone(), 0)]);
    let ando_office = composite(11, "安藤忠雄建築研究所", vec![(ando.clone(), 0)]);
    let joint = composite(12, "安藤・丹下共同設計", vec![(ando, 0), (tange, 1)]);
    let legacy = composite(20, "磯崎新\u{3000}黒川紀章", vec![]);

    let mut b1 = row(1, "国立代々木競技場", "体育館", "東京都", north(4.9), CENTER.lng);
    b1.building_architects = vec![credit(1, tange_office, 1)];
    b1.photos = vec![PhotoRow {
        id: 1,
        url: "https://img.test/1.jpg".into(),
        likes: Some(3),
    }];
    b1.completion_years = Some("1964".into());

    let mut b2 = row(2, "住吉の長屋", "住宅", "東京都", north(1.0), CENTER.lng);
    b2.building_types_en = Some("Housing".into());
    b2.building_architects = vec![credit(2, ando_office.clone(), 1)];

    let mut b3 = row(3, "水の教会", "教会", "東京都", north(5.1), CENTER.lng);
    b3.building_architects = vec![credit(3, ando_office, 1), credit(3, joint, 2)];

    let mut b4 = row(4, "旧美術館", "美術館", "東京都", 35.72, 139.70);
    b4.building_architects = vec![credit(4, legacy, 1)];

    let mut b5 = row(5, "座標不明の美術館", "美術館", "東京都", 0.0, 0.0);
    b5.lat = Some(RawNumber::Text("n/a".into()));

    let mut b6 = row(6, "大阪の美術館", "美術館", "大阪府", 34.69, 135.50);
    b6.youtube_url = Some("https://youtube.test/watch".into());

    vec![b1, b2, b3, b4, b5, b6]
}

fn engine_with(ranking: RankingMode, options: EngineOptions) -> SearchEngine {
    let store = MemoryStore::new(catalogue()).with_ranking(ranking);
    SearchEngine::new(Arc::new(store), options, None)
}

fn engine() -> SearchEngine {
    engine_with(RankingMode::Enabled, EngineOptions::default())
}

fn ids(page: &SearchPage) -> Vec<i64> {
    page.buildings.iter().map(|b| b.id).collect()
}

fn sorted_ids(buildings: &[Building]) -> Vec<i64> {
    let mut ids: Vec<i64> = buildings.iter().map(|b| b.id).collect();
    ids.sort_unstable();
    ids
}

fn near_center(radius: u32) -> FilterState {
    FilterState {
        current_location: Some(CENTER),
        radius,
        ..FilterState::cleared()
    }
}

#[tokio::test]
async fn test_unfiltered_search_returns_everything_valid() {
    let result = engine()
        .search_with_size(&FilterState::cleared(), 1, 100, Language::Ja)
        .await
        .unwrap();

    // total counts the record that failed validation
    assert_eq!(result.total, 6);
    assert_eq!(ids(&result), vec![6, 4, 3, 2, 1]);
}

#[tokio::test]
async fn test_residential_excluded_by_default() {
    let result = engine()
        .search_with_size(&FilterState::default(), 1, 100, Language::Ja)
        .await
        .unwrap();

    assert_eq!(ids(&result), vec![6, 4, 3, 1]);
}

#[tokio::test]
async fn test_individual_name_reaches_every_composite() {
    let mut filters = FilterState::cleared();
    filters.architects.insert("安藤忠雄".into());

    let result = engine()
        .search_with_size(&filters, 1, 100, Language::Ja)
        .await
        .unwrap();
    assert_eq!(ids(&result), vec![3, 2]);

    filters.exclude_residential = true;
    let result = engine()
        .search_with_size(&filters, 1, 100, Language::Ja)
        .await
        .unwrap();
    assert_eq!(ids(&result), vec![3]);
}

#[tokio::test]
async fn test_english_architect_names() {
    let mut filters = FilterState::cleared();
    filters.architects.insert("kenzo tange".into());

    let result = engine()
        .search_with_size(&filters, 1, 100, Language::En)
        .await
        .unwrap();
    assert_eq!(ids(&result), vec![3, 1]);
}

#[tokio::test]
async fn test_legacy_credit_matches_one_segment() {
    let mut filters = FilterState::cleared();
    filters.architects.insert("黒川紀章".into());

    let result = engine()
        .search_with_size(&filters, 1, 100, Language::Ja)
        .await
        .unwrap();
    assert_eq!(ids(&result), vec![4]);
}

#[tokio::test]
async fn test_legacy_credit_matches_longer_selected_name() {
    let mut filters = FilterState::cleared();
    filters.architects.insert("磯崎新アトリエ".into());

    let result = engine()
        .search_with_size(&filters, 1, 100, Language::Ja)
        .await
        .unwrap();
    assert_eq!(ids(&result), vec![4]);
}

#[tokio::test]
async fn test_unknown_architect_matches_nothing() {
    let mut filters = FilterState::cleared();
    filters.architects.insert("存在しない建築家".into());

    let result = engine()
        .search_with_size(&filters, 1, 100, Language::Ja)
        .await
        .unwrap();
    assert_eq!(result, SearchPage::empty());
}

#[tokio::test]
async fn test_free_text_reaches_architect_names() {
    let filters = FilterState {
        query: "丹下健三".into(),
        ..FilterState::cleared()
    };

    let result = engine()
        .search_with_size(&filters, 1, 100, Language::Ja)
        .await
        .unwrap();
    assert_eq!(ids(&result), vec![3, 1]);
}

#[tokio::test]
async fn test_has_photos_and_has_videos() {
    let photos = FilterState {
        has_photos: true,
        ..FilterState::cleared()
    };
    let result = engine()
        .search_with_size(&photos, 1, 100, Language::Ja)
        .await
        .unwrap();
    assert_eq!(ids(&result), vec![1]);

    let videos = FilterState {
        has_videos: true,
        ..FilterState::cleared()
    };
    let result = engine()
        .search_with_size(&videos, 1, 100, Language::Ja)
        .await
        .unwrap();
    assert_eq!(ids(&result), vec![6]);
}

#[tokio::test]
async fn test_pages_are_disjoint() {
    let engine = engine();
    let filters = FilterState::cleared();

    let first = engine.search_with_size(&filters, 1, 2, Language::Ja).await.unwrap();
    let second = engine.search_with_size(&filters, 2, 2, Language::Ja).await.unwrap();

    // building 5 is skipped from the first backend page, so it comes back short
    assert_eq!(ids(&first), vec![6]);
    assert_eq!(ids(&second), vec![4, 3]);
    assert_eq!(first.total, 6);
    assert_eq!(first.total, second.total);
}

#[tokio::test]
async fn test_ranked_radius_boundary() {
    let engine = engine();
    let result = engine
        .search(&near_center(5), 1, Language::Ja)
        .await
        .unwrap();

    // 1.0 km and 4.9 km in, 5.1 km and the 6.3 km corner out
    assert_eq!(ids(&result), vec![2, 1]);
    assert_eq!(result.total, 2);
    let distances: Vec<f64> = result.buildings.iter().filter_map(|b| b.distance).collect();
    assert!((distances[0] - 1.0).abs() < 1e-6);
    assert!((distances[1] - 4.9).abs() < 1e-6);
    assert!(engine.primary_geo_healthy());
}

#[tokio::test]
async fn test_fallback_radius_boundary_matches_ranked() {
    let engine = engine_with(RankingMode::Disabled, EngineOptions::default());
    let result = engine
        .search(&near_center(5), 1, Language::Ja)
        .await
        .unwrap();

    assert_eq!(ids(&result), vec![2, 1]);
    assert_eq!(result.total, 2);
    assert!(!engine.primary_geo_healthy());
}

#[tokio::test]
async fn test_fallback_keeps_box_corners_when_not_strict() {
    let options = EngineOptions {
        strict_radius: false,
        ..EngineOptions::default()
    };
    let engine = engine_with(RankingMode::Disabled, options);
    let result = engine
        .search(&near_center(5), 1, Language::Ja)
        .await
        .unwrap();

    assert_eq!(ids(&result), vec![2, 1, 4]);
    let corner = result.buildings[2].distance.unwrap();
    assert!(corner > 5.0 && corner < 7.0, "corner distance {}", corner);
}

#[tokio::test(start_paused = true)]
async fn test_slow_ranking_falls_back_after_timeout() {
    let engine = engine_with(
        RankingMode::Delayed(Duration::from_secs(60)),
        EngineOptions::default(),
    );

    let started = tokio::time::Instant::now();
    let result = engine
        .search(&near_center(5), 1, Language::Ja)
        .await
        .unwrap();

    assert_eq!(ids(&result), vec![2, 1]);
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert!(started.elapsed() < Duration::from_secs(60));
    assert!(!engine.primary_geo_healthy());
}

#[tokio::test]
async fn test_geo_search_applies_facets() {
    let mut filters = near_center(5);
    filters.architects.insert("丹下健三".into());

    for ranking in [RankingMode::Enabled, RankingMode::Disabled] {
        let result = engine_with(ranking, EngineOptions::default())
            .search(&filters, 1, Language::Ja)
            .await
            .unwrap();
        assert_eq!(ids(&result), vec![1], "ranking mode {:?}", ranking);
    }
}

#[tokio::test]
async fn test_geo_area_facet_is_applied_before_paging() {
    let mut rows = catalogue();
    rows[2].area = Some("関東".into());

    let mut filters = near_center(10);
    filters.areas.insert("関東".into());

    for ranking in [RankingMode::Enabled, RankingMode::Disabled] {
        let engine = SearchEngine::new(
            Arc::new(MemoryStore::new(rows.clone()).with_ranking(ranking)),
            EngineOptions::default(),
            None,
        );

        let first = engine.search_with_size(&filters, 1, 1, Language::Ja).await.unwrap();
        assert_eq!(ids(&first), vec![3], "ranking mode {:?}", ranking);
        assert_eq!(first.total, 1, "ranking mode {:?}", ranking);

        let second = engine.search_with_size(&filters, 2, 1, Language::Ja).await.unwrap();
        assert!(second.buildings.is_empty(), "ranking mode {:?}", ranking);
    }
}

#[tokio::test]
async fn test_geo_photo_filter_pages_like_fallback() {
    let filters = FilterState {
        has_photos: true,
        ..near_center(10)
    };

    for ranking in [RankingMode::Enabled, RankingMode::Disabled] {
        let engine = engine_with(ranking, EngineOptions::default());

        let first = engine.search_with_size(&filters, 1, 1, Language::Ja).await.unwrap();
        assert_eq!(ids(&first), vec![1], "ranking mode {:?}", ranking);
        assert_eq!(first.total, 1, "ranking mode {:?}", ranking);

        let second = engine.search_with_size(&filters, 2, 1, Language::Ja).await.unwrap();
        assert!(second.buildings.is_empty(), "ranking mode {:?}", ranking);
    }
}

#[tokio::test]
async fn test_local_and_backend_agree() {
    let engine = engine();
    let local = transform_rows(catalogue());

    let mut cases = vec![FilterState::default(), FilterState::cleared()];

    let mut architects = FilterState::cleared();
    architects.architects.insert("安藤忠雄".into());
    cases.push(architects);

    let mut legacy = FilterState::default();
    legacy.architects.insert("磯崎新".into());
    cases.push(legacy);

    // selected name longer than the stored segment
    let mut atelier = FilterState::default();
    atelier.architects.insert("磯崎新アトリエ".into());
    cases.push(atelier);

    let mut types = FilterState::default();
    types.building_types.insert("美術館".into());
    types.prefectures.insert("東京都".into());
    cases.push(types);

    cases.push(FilterState {
        query: "丹下健三".into(),
        ..FilterState::default()
    });
    cases.push(FilterState {
        completion_year: Some(1964),
        ..FilterState::default()
    });

    for filters in cases {
        let backend = engine
            .search_with_size(&filters, 1, 100, Language::Ja)
            .await
            .unwrap();
        let local = search_local(&local, &filters, Language::Ja, 1, 100);
        assert_eq!(
            sorted_ids(&backend.buildings),
            sorted_ids(&local.buildings),
            "filters {:?}",
            filters
        );
    }
}

#[tokio::test]
async fn test_local_radius_search() {
    let local = transform_rows(catalogue());
    let result = search_local(&local, &near_center(5), Language::Ja, 1, 20);
    assert_eq!(ids(&result), vec![2, 1]);
}

#[tokio::test]
async fn test_architects_for_building_deduplicates() {
    let engine = engine();

    let architects = engine
        .architects_for_building(3, Language::Ja)
        .await
        .unwrap();
    let people: Vec<i64> = architects
        .individuals
        .iter()
        .map(|a| a.individual_architect_id)
        .collect();
    assert_eq!(people, vec![101, 100]);
    assert!(architects.legacy_names.is_empty());

    let legacy = engine
        .architects_for_building(4, Language::Ja)
        .await
        .unwrap();
    assert!(legacy.individuals.is_empty());
    assert_eq!(legacy.legacy_names, vec!["磯崎新", "黒川紀章"]);
}

#[tokio::test]
async fn test_prefetch_fills_cache() {
    let cache = Arc::new(CacheManager::in_memory(100, 60));
    let store = MemoryStore::new(catalogue());
    let engine = Arc::new(SearchEngine::new(
        Arc::new(store),
        EngineOptions::default(),
        Some(Arc::clone(&cache)),
    ));
    let filters = FilterState::cleared();

    engine
        .prefetch(filters.clone(), 2, 2, Language::Ja)
        .await
        .unwrap();

    let key = CacheKey::search(&filters, 2, 2, true, Language::Ja);
    let cached: SearchPage = cache.get(&key).await.unwrap();
    assert_eq!(ids(&cached), vec![4, 3]);

    // Page one was never requested
    let first = CacheKey::search(&filters, 1, 2, true, Language::Ja);
    assert!(cache.get::<SearchPage>(&first).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_live_filter_publishes_latest_only() {
    let live = LiveFilter::new(Arc::new(transform_rows(catalogue())), Duration::from_millis(500));
    let receiver = live.subscribe();

    let mut first = FilterState::cleared();
    first.prefectures.insert("大阪府".into());
    live.update(first, Language::Ja);

    let mut second = FilterState::cleared();
    second.architects.insert("安藤忠雄".into());
    let generation = live.update(second, Language::Ja);

    tokio::time::sleep(Duration::from_millis(600)).await;

    let latest = receiver.borrow().clone();
    assert_eq!(latest.generation, generation);
    assert_eq!(sorted_ids(&latest.buildings), vec![2, 3]);
}

/// Store whose every call fails
struct FailingStore;

#[async_trait]
impl BuildingStore for FailingStore {
    async fn find_individuals(&self, _: &[String], _: Language) -> Result<Vec<IndividualArchitect>, StoreError> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn find_legacy_composites(&self, _: &[String], _: Language) -> Result<Vec<i64>, StoreError> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn compositions_for_individuals(&self, _: &[i64]) -> Result<Vec<CompositionRow>, StoreError> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn credits_for_composites(&self, _: &[i64]) -> Result<Vec<CreditRow>, StoreError> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn credits_for_building(&self, _: i64) -> Result<Vec<CreditRow>, StoreError> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn compositions_for_composites(&self, _: &[i64]) -> Result<Vec<CompositionRow>, StoreError> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn individuals_by_ids(&self, _: &[i64]) -> Result<Vec<IndividualArchitect>, StoreError> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn fetch_page(&self, _: &QueryPlan, _: usize, _: usize) -> Result<RowPage, StoreError> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn fetch_all(&self, _: &QueryPlan) -> Result<RowPage, StoreError> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn rank_by_distance(&self, _: &DistanceRankParams) -> Result<RowPage, StoreError> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(false)
    }
}

/// History kept in process, one list per session
#[derive(Default)]
struct InMemoryHistory {
    sessions: Mutex<HashMap<String, SearchHistory>>,
}

impl InMemoryHistory {
    fn update(&self, session_id: &str, apply: impl FnOnce(&mut SearchHistory)) -> SearchHistory {
        let mut sessions = self.sessions.lock().unwrap();
        let history = sessions.entry(session_id.to_string()).or_default();
        apply(history);
        history.clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn load(&self, session_id: &str) -> Result<SearchHistory, HistoryError> {
        Ok(self.update(session_id, |_| {}))
    }

    async fn record_text(&self, session_id: &str, query: &str) -> Result<SearchHistory, HistoryError> {
        Ok(self.update(session_id, |history| history.record(query, Utc::now())))
    }

    async fn record(&self, session_id: &str, request: RecordHistoryRequest) -> Result<SearchHistory, HistoryError> {
        let kind = request.kind.unwrap_or(HistoryKind::Text);
        Ok(self.update(session_id, |history| {
            history.record_facet(kind, &request.query, request.filters.unwrap_or_default(), Utc::now())
        }))
    }

    async fn health_check(&self) -> Result<bool, HistoryError> {
        Ok(true)
    }
}

fn app_state(store: Arc<dyn BuildingStore>, local: Option<Vec<Building>>) -> AppState {
    AppState {
        engine: Arc::new(SearchEngine::new(store, EngineOptions::default(), None)),
        local: local.map(Arc::new),
        history: None,
        default_radius_km: 5,
    }
}

#[actix_web::test]
async fn test_search_endpoint() {
    let state = app_state(Arc::new(MemoryStore::new(catalogue())), None);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let uri = format!(
        "/api/v1/buildings/search?architects={}&pageSize=1",
        urlencoding::encode("安藤忠雄")
    );
    let req = test::TestRequest::get().uri(&uri).to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    // residential building 2 is excluded by default
    assert_eq!(body["total"], 1);
    assert_eq!(body["page"], 1);
    assert_eq!(body["totalPages"], 1);
    assert_eq!(body["pagination"], serde_json::json!([1]));
    assert_eq!(body["buildings"][0]["id"], 3);

    let uri = format!(
        "/api/v1/buildings/search?architects={}&includeResidential=true&lang=ja",
        urlencoding::encode("安藤忠雄")
    );
    let req = test::TestRequest::get().uri(&uri).to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 2);
}

#[actix_web::test]
async fn test_search_endpoint_rejects_bad_page_size() {
    let state = app_state(Arc::new(MemoryStore::new(catalogue())), None);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/buildings/search?pageSize=500")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_search_endpoint_serves_local_when_backend_fails() {
    let local = transform_rows(catalogue());
    let state = app_state(Arc::new(FailingStore), Some(local));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let uri = format!("/api/v1/buildings/search?prefectures={}", urlencoding::encode("大阪府"));
    let req = test::TestRequest::get().uri(&uri).to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["buildings"][0]["id"], 6);
}

#[actix_web::test]
async fn test_search_endpoint_without_local_reports_bad_gateway() {
    let state = app_state(Arc::new(FailingStore), None);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/buildings/search")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 502);
}

#[actix_web::test]
async fn test_architects_endpoint() {
    let state = app_state(Arc::new(MemoryStore::new(catalogue())), None);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/buildings/3/architects?lang=en")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["buildingId"], 3);
    assert_eq!(body["individuals"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["individuals"][0]["name_en"], "Tadao Ando");
}

#[actix_web::test]
async fn test_history_endpoints_unavailable_without_database() {
    let state = app_state(Arc::new(MemoryStore::new(catalogue())), None);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/history/session-1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);
}

#[actix_web::test]
async fn test_health_endpoint() {
    let state = app_state(Arc::new(MemoryStore::new(catalogue())), None);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["cache"].is_null());
}

#[actix_web::test]
async fn test_paging_records_a_search_once() {
    let history = Arc::new(InMemoryHistory::default());
    let state = AppState {
        history: Some(Arc::clone(&history) as Arc<dyn HistoryStore>),
        ..app_state(Arc::new(MemoryStore::new(catalogue())), None)
    };
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let query = urlencoding::encode("美術館");
    for page in [1, 2, 3] {
        let uri = format!(
            "/api/v1/buildings/search?q={}&page={}&pageSize=1&sessionId=s1",
            query, page
        );
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert!(resp.status().is_success());
    }

    let req = test::TestRequest::get().uri("/api/v1/history/s1").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let entries = body["entries"].as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["query"], "美術館");
    assert_eq!(entries[0]["count"], 1);

    // a fresh search of the same query counts again
    let uri = format!("/api/v1/buildings/search?q={}&sessionId=s1", query);
    test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    let history = history.load("s1").await.unwrap();
    assert_eq!(history.entries()[0].count, 2);
}

#[actix_web::test]
async fn test_history_endpoints_record_facets() {
    let state = AppState {
        history: Some(Arc::new(InMemoryHistory::default()) as Arc<dyn HistoryStore>),
        ..app_state(Arc::new(MemoryStore::new(catalogue())), None)
    };
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/history/s2")
        .set_json(serde_json::json!({
            "query": "安藤忠雄",
            "kind": "architect",
            "filters": { "architects": ["安藤忠雄"] }
        }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["sessionId"], "s2");
    assert_eq!(body["entries"][0]["kind"], "architect");
    assert_eq!(body["popular"][0]["query"], "安藤忠雄");
}
