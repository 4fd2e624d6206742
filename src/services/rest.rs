use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::core::architects::legacy_composite_matches;
use crate::core::filters::{RESIDENTIAL_EN, RESIDENTIAL_JA};
use crate::core::planner::{Clause, QueryPlan, TEXT_COLUMNS};
use crate::models::{BuildingRow, CompositeRow, CompositionRow, CreditRow, IndividualArchitect, Language, RowPage};
use crate::services::store::{BuildingStore, DistanceRankParams, StoreError};

/// Nested select that returns a building with photos and its full credit hierarchy
const BUILDING_SELECT: &str = "*,photos(id,url,likes),\
building_architects(building_id,architect_id,architect_order,\
architect:architects(architect_id,name_ja,name_en,slug,\
compositions:architect_compositions(architect_id,individual_architect_id,order_index,\
individual:individual_architects(individual_architect_id,name_ja,name_en,slug))))";

const INDIVIDUAL_SELECT: &str = "individual_architect_id,name_ja,name_en,slug";
const COMPOSITION_SELECT: &str = "architect_id,individual_architect_id,order_index";
const RANKING_FUNCTION: &str = "search_buildings_with_distance";

/// Table names on the REST backend
#[derive(Debug, Clone)]
pub struct RestTables {
    pub buildings: String,
    pub architects: String,
    pub compositions: String,
    pub individuals: String,
    pub credits: String,
}

impl Default for RestTables {
    fn default() -> Self {
        Self {
            buildings: "buildings".to_string(),
            architects: "architects".to_string(),
            compositions: "architect_compositions".to_string(),
            individuals: "individual_architects".to_string(),
            credits: "building_architects".to_string(),
        }
    }
}

/// PostgREST-style HTTP backend
///
/// Handles all communication with the data store:
/// - Architect hierarchy lookups
/// - Filtered building pages
/// - The distance ranking function
pub struct RestStore {
    base_url: String,
    api_key: String,
    client: Client,
    tables: RestTables,
}

/// Ranking function row: a flat building plus the window total
#[derive(Debug, Deserialize)]
struct RankedRow {
    #[serde(flatten)]
    row: BuildingRow,
    #[serde(default)]
    total_count: Option<i64>,
}

#[derive(Debug, Serialize)]
struct RankingBody<'a> {
    p_lat: f64,
    p_lng: f64,
    p_radius_km: f64,
    p_query: Option<&'a str>,
    p_architects: Option<&'a [String]>,
    p_building_types: Option<&'a [String]>,
    p_prefectures: Option<&'a [String]>,
    p_areas: Option<&'a [String]>,
    p_has_videos: bool,
    p_completion_year: Option<i32>,
    p_exclude_residential: bool,
    p_language: &'a str,
    p_offset: usize,
    p_limit: Option<usize>,
}

/// Quote a value for a PostgREST filter if it contains reserved characters
pub fn quote_value(value: &str) -> String {
    let reserved = [',', '.', ':', '(', ')', '"', '\\', ' '];
    if value.chars().any(|c| reserved.contains(&c)) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

fn ilike(column: &str, term: &str) -> String {
    format!("{}.ilike.{}", column, quote_value(&format!("*{}*", term)))
}

fn in_list<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    let joined = values
        .into_iter()
        .map(|v| quote_value(&v.to_string()))
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({})", joined)
}

fn names_filter(column: &str, names: &[String]) -> String {
    let conditions = names
        .iter()
        .map(|n| ilike(column, n.trim()))
        .collect::<Vec<_>>()
        .join(",");
    format!("({})", conditions)
}

fn language_column(base: &str, language: Language) -> String {
    match language {
        Language::Ja => base.to_string(),
        Language::En => format!("{}_en", base),
    }
}

fn name_column(language: Language) -> &'static str {
    match language {
        Language::Ja => "name_ja",
        Language::En => "name_en",
    }
}

/// Render a plan as PostgREST query parameters.
///
/// OR-groups are nested inside a single `and=(...)`; plain column filters
/// are separate parameters, which PostgREST also ANDs.
pub fn plan_params(plan: &QueryPlan) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = Vec::new();
    let mut groups: Vec<String> = Vec::new();

    for clause in &plan.clauses {
        match clause {
            Clause::Text {
                term,
                associated_ids,
            } => {
                let mut conditions: Vec<String> = TEXT_COLUMNS.iter().map(|c| ilike(c, term)).collect();
                if !associated_ids.is_empty() {
                    conditions.push(format!("building_id.{}", in_list(associated_ids.iter())));
                }
                groups.push(format!("or({})", conditions.join(",")));
            }
            Clause::IdIn(ids) => {
                params.push(("building_id".into(), in_list(ids.iter())));
            }
            Clause::BuildingTypesAny { language, values } => {
                let column = language_column("building_types", *language);
                let conditions: Vec<String> = values.iter().map(|v| ilike(&column, v)).collect();
                groups.push(format!("or({})", conditions.join(",")));
            }
            Clause::PrefectureIn { language, values } => {
                params.push((language_column("prefecture", *language), in_list(values.iter())));
            }
            Clause::AreaIn(values) => {
                params.push(("area".into(), in_list(values.iter())));
            }
            Clause::HasVideo => {
                // blank URLs count as no video
                params.push(("youtube_url".into(), "not.is.null".into()));
                params.push(("youtube_url".into(), r"not.match.^\s*$".into()));
            }
            Clause::CompletionYear(year) => {
                params.push(("completion_years".into(), format!("eq.{}", year)));
            }
            Clause::ExcludeResidential => {
                // NULL type lists are not residential
                for (column, literal) in [("building_types", RESIDENTIAL_JA), ("building_types_en", RESIDENTIAL_EN)] {
                    groups.push(format!(
                        "or({}.is.null,{}.not.ilike.{})",
                        column,
                        column,
                        quote_value(&format!("*{}*", literal))
                    ));
                }
            }
            Clause::Within(bbox) => {
                params.push(("lat".into(), format!("gte.{}", bbox.min_lat)));
                params.push(("lat".into(), format!("lte.{}", bbox.max_lat)));
                params.push(("lng".into(), format!("gte.{}", bbox.min_lon)));
                params.push(("lng".into(), format!("lte.{}", bbox.max_lon)));
            }
        }
    }

    if !groups.is_empty() {
        params.push(("and".into(), format!("({})", groups.join(","))));
    }

    params
}

/// Total from a `Content-Range: 0-19/342` header
pub fn parse_content_range(header: Option<&str>) -> Option<usize> {
    header?.rsplit_once('/')?.1.trim().parse().ok()
}

impl RestStore {
    /// Create a new REST store client
    pub fn new(base_url: String, api_key: String, timeout: Duration, tables: RestTables) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
            tables,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response, StoreError> {
        let response = request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Failed to {}: {} - {}", what, status, body);
            return Err(StoreError::ApiError(format!("Failed to {}: {}", what, status)));
        }

        Ok(response)
    }

    async fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        params: &[(String, String)],
    ) -> Result<Vec<T>, StoreError> {
        let request = self
            .client
            .get(self.url(table))
            .query(&[("select", select)])
            .query(params);

        let response = self.send(request, &format!("query {}", table)).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse {} rows: {}", table, e)))
    }

    async fn get_counted_buildings(&self, params: &[(String, String)]) -> Result<RowPage, StoreError> {
        let request = self
            .client
            .get(self.url(&self.tables.buildings))
            .header("Prefer", "count=exact")
            .query(&[("select", BUILDING_SELECT)])
            .query(params);

        let response = self.send(request, "query buildings").await?;
        let total = parse_content_range(
            response
                .headers()
                .get("content-range")
                .and_then(|v| v.to_str().ok()),
        );

        let rows: Vec<BuildingRow> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse buildings: {}", e)))?;

        let total = total.unwrap_or(rows.len());
        tracing::debug!("Fetched {} buildings (total: {})", rows.len(), total);

        Ok(RowPage { rows, total })
    }

    async fn fetch_by_ids(&self, ids: &[i64]) -> Result<Vec<BuildingRow>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = vec![("building_id".to_string(), in_list(ids.iter()))];
        self.get_rows(&self.tables.buildings, BUILDING_SELECT, &params)
            .await
    }
}

#[async_trait]
impl BuildingStore for RestStore {
    async fn find_individuals(
        &self,
        names: &[String],
        language: Language,
    ) -> Result<Vec<IndividualArchitect>, StoreError> {
        let params = vec![("or".to_string(), names_filter(name_column(language), names))];
        self.get_rows(&self.tables.individuals, INDIVIDUAL_SELECT, &params)
            .await
    }

    async fn find_legacy_composites(&self, names: &[String], language: Language) -> Result<Vec<i64>, StoreError> {
        // Segment matching is bidirectional, so it cannot be expressed as ilike;
        // fetch the composites without composition rows and match here.
        let select = format!("architect_id,name_ja,name_en,slug,{}()", self.tables.compositions);
        let params = vec![(self.tables.compositions.clone(), "is.null".to_string())];
        let legacy: Vec<CompositeRow> = self
            .get_rows(&self.tables.architects, &select, &params)
            .await?;

        let mut ids: Vec<i64> = legacy
            .iter()
            .filter(|c| legacy_composite_matches(c, names, language))
            .map(|c| c.architect_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn compositions_for_individuals(&self, individual_ids: &[i64]) -> Result<Vec<CompositionRow>, StoreError> {
        let params = vec![("individual_architect_id".to_string(), in_list(individual_ids.iter()))];
        self.get_rows(&self.tables.compositions, COMPOSITION_SELECT, &params)
            .await
    }

    async fn credits_for_composites(&self, composite_ids: &[i64]) -> Result<Vec<CreditRow>, StoreError> {
        let params = vec![("architect_id".to_string(), in_list(composite_ids.iter()))];
        self.get_rows(
            &self.tables.credits,
            "building_id,architect_id,architect_order",
            &params,
        )
        .await
    }

    async fn credits_for_building(&self, building_id: i64) -> Result<Vec<CreditRow>, StoreError> {
        let params = vec![
            ("building_id".to_string(), format!("eq.{}", building_id)),
            ("order".to_string(), "architect_order.asc".to_string()),
        ];
        let select = format!(
            "building_id,architect_id,architect_order,architect:{}(architect_id,name_ja,name_en,slug)",
            self.tables.architects
        );
        self.get_rows(&self.tables.credits, &select, &params).await
    }

    async fn compositions_for_composites(&self, composite_ids: &[i64]) -> Result<Vec<CompositionRow>, StoreError> {
        let params = vec![
            ("architect_id".to_string(), in_list(composite_ids.iter())),
            ("order".to_string(), "order_index.asc".to_string()),
        ];
        self.get_rows(&self.tables.compositions, COMPOSITION_SELECT, &params)
            .await
    }

    async fn individuals_by_ids(&self, ids: &[i64]) -> Result<Vec<IndividualArchitect>, StoreError> {
        let params = vec![("individual_architect_id".to_string(), in_list(ids.iter()))];
        self.get_rows(&self.tables.individuals, INDIVIDUAL_SELECT, &params)
            .await
    }

    async fn fetch_page(&self, plan: &QueryPlan, offset: usize, limit: usize) -> Result<RowPage, StoreError> {
        let mut params = plan_params(plan);
        params.push(("order".into(), "building_id.desc".into()));
        params.push(("offset".into(), offset.to_string()));
        params.push(("limit".into(), limit.to_string()));
        self.get_counted_buildings(&params).await
    }

    async fn fetch_all(&self, plan: &QueryPlan) -> Result<RowPage, StoreError> {
        let mut params = plan_params(plan);
        params.push(("order".into(), "building_id.desc".into()));
        self.get_counted_buildings(&params).await
    }

    async fn rank_by_distance(&self, params: &DistanceRankParams) -> Result<RowPage, StoreError> {
        let body = RankingBody {
            p_lat: params.lat,
            p_lng: params.lng,
            p_radius_km: params.radius_km,
            p_query: params.query.as_deref(),
            p_architects: params.architects.as_deref(),
            p_building_types: params.building_types.as_deref(),
            p_prefectures: params.prefectures.as_deref(),
            p_areas: params.areas.as_deref(),
            p_has_videos: params.has_videos,
            p_completion_year: params.completion_year,
            p_exclude_residential: params.exclude_residential,
            p_language: params.language.as_str(),
            p_offset: params.offset,
            p_limit: params.limit,
        };

        let request = self
            .client
            .post(self.url(&format!("rpc/{}", RANKING_FUNCTION)))
            .json(&body);
        let response = self.send(request, "rank buildings by distance").await?;

        let ranked: Vec<RankedRow> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse ranked rows: {}", e)))?;

        let total = ranked
            .first()
            .and_then(|r| r.total_count)
            .map(|t| t.max(0) as usize)
            .unwrap_or(ranked.len());

        // The ranking function returns flat rows: re-attach credits and photos
        let ids: Vec<i64> = ranked.iter().map(|r| r.row.building_id).collect();
        let mut hydrated: HashMap<i64, BuildingRow> = self
            .fetch_by_ids(&ids)
            .await?
            .into_iter()
            .map(|row| (row.building_id, row))
            .collect();

        let rows = ranked
            .into_iter()
            .map(|r| {
                let distance = r.row.distance;
                let mut row = hydrated.remove(&r.row.building_id).unwrap_or(r.row);
                row.distance = distance;
                row
            })
            .collect();

        Ok(RowPage { rows, total })
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        let params = vec![("limit".to_string(), "1".to_string())];
        self.get_rows::<serde_json::Value>(&self.tables.buildings, "building_id", &params)
            .await
            .map(|_| true)
    }
}
