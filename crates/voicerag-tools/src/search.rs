// Listing search: the `search` tool, OData filters, and the Azure AI Search
// backend reached over its REST API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use voicerag_core::{Feature, Listing, Preferences};

use crate::registry::{Tool, ToolError};
use crate::result::ToolResult;
use crate::update_preferences::PreferenceStore;

/// Nearest neighbours requested per spoken query.
pub const SEARCH_K: usize = 5;

/// Page size for filter-only queries.
pub const FILTER_TOP: usize = 50;

const DEFAULT_SEARCH_API_VERSION: &str = "2023-11-01";

/// Output size of `text-embedding-3-large`.
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 3072;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {service}: {message}")]
    UnexpectedResponse {
        service: &'static str,
        message: String,
    },

    #[error("failed to parse search config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to read search config {path}: {source}")]
    ReadConfig {
        path: String,
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for the search index and the embeddings deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub service_name: String,
    pub index_name: String,
    pub embedding_model: String,
    pub openai_endpoint: String,
    /// API version of the embeddings endpoint.
    pub api_version: String,
    pub search_api_key: String,
    pub openai_api_key: String,
    #[serde(default = "default_search_api_version")]
    pub search_api_version: String,
    /// Length of the vectors the embeddings deployment returns.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
}

fn default_search_api_version() -> String {
    DEFAULT_SEARCH_API_VERSION.to_string()
}

fn default_embedding_dimensions() -> usize {
    DEFAULT_EMBEDDING_DIMENSIONS
}

impl SearchConfig {
    /// Parse a `[search]`-less TOML table holding the fields above.
    pub fn from_toml_str(text: &str) -> Result<Self, SearchError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a config file from disk.
    pub fn load(path: &std::path::Path) -> Result<Self, SearchError> {
        let text = std::fs::read_to_string(path).map_err(|source| SearchError::ReadConfig {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    fn search_service(&self) -> String {
        format!("https://{}.search.windows.net", self.service_name)
    }

    fn search_endpoint(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.search_service(),
            self.index_name,
            self.search_api_version
        )
    }

    /// The index definition itself.
    pub(crate) fn index_endpoint(&self) -> String {
        format!(
            "{}/indexes/{}?api-version={}",
            self.search_service(),
            self.index_name,
            self.search_api_version
        )
    }

    /// Batch document upload into the index.
    pub(crate) fn upload_endpoint(&self) -> String {
        format!(
            "{}/indexes/{}/docs/index?api-version={}",
            self.search_service(),
            self.index_name,
            self.search_api_version
        )
    }

    fn embeddings_endpoint(&self) -> String {
        format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            self.openai_endpoint.trim_end_matches('/'),
            self.embedding_model,
            self.api_version
        )
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Structured constraints on listing fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    pub location: Option<String>,
    pub max_price: Option<f64>,
    pub min_rooms: Option<u32>,
    pub furnished: Option<bool>,
    pub pets_allowed: Option<bool>,
}

impl ListingFilter {
    /// Constraints implied by the user's preferences. Features only narrow
    /// the search when they are enabled.
    pub fn from_preferences(prefs: &Preferences) -> Self {
        ListingFilter {
            location: prefs.location.clone(),
            max_price: prefs.budget.and_then(|b| b.max),
            min_rooms: prefs.rooms,
            furnished: prefs.feature_enabled(Feature::Furnished).then_some(true),
            pets_allowed: prefs.feature_enabled(Feature::Pets).then_some(true),
        }
    }

    /// OData `$filter` expression, or `None` when nothing constrains the query.
    pub fn to_odata(&self) -> Option<String> {
        let mut clauses = Vec::new();
        if let Some(location) = &self.location {
            clauses.push(format!(
                "search.in(location, '{}', ',')",
                escape_odata(location)
            ));
        }
        if let Some(max_price) = self.max_price {
            clauses.push(format!("price le {max_price}"));
        }
        if let Some(min_rooms) = self.min_rooms {
            clauses.push(format!("rooms ge {min_rooms}"));
        }
        if let Some(furnished) = self.furnished {
            clauses.push(format!("furnished eq {furnished}"));
        }
        if let Some(pets_allowed) = self.pets_allowed {
            clauses.push(format!("pets_allowed eq {pets_allowed}"));
        }

        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" and "))
        }
    }
}

fn escape_odata(s: &str) -> String {
    s.replace('\'', "''")
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// A store of listing documents.
#[async_trait]
pub trait ListingSearch: Send + Sync {
    /// The `k` documents closest to `query` in embedding space.
    async fn search_by_embedding(&self, query: &str, k: usize) -> Result<Vec<Value>, SearchError>;

    async fn search_by_filters(&self, filter: &ListingFilter) -> Result<Vec<Value>, SearchError>;

    /// Nearest neighbours of `query` among the documents matching `filter`.
    async fn search_with_filters(
        &self,
        query: &str,
        k: usize,
        filter: &ListingFilter,
    ) -> Result<Vec<Value>, SearchError>;
}

/// Azure AI Search index with an Azure OpenAI embeddings deployment.
pub struct AzureSearch {
    http: reqwest::Client,
    config: SearchConfig,
}

impl AzureSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub(crate) async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let response = self
            .http
            .post(self.config.embeddings_endpoint())
            .header("api-key", &self.config.openai_api_key)
            .json(&json!({ "input": text }))
            .send()
            .await?;
        let body = read_json(response, "embeddings").await?;
        parse_embedding(&body)
    }

    async fn query(&self, body: Value) -> Result<Vec<Value>, SearchError> {
        let response = self
            .http
            .post(self.config.search_endpoint())
            .header("api-key", &self.config.search_api_key)
            .json(&body)
            .send()
            .await?;
        let body = read_json(response, "search").await?;
        parse_documents(body)
    }
}

#[async_trait]
impl ListingSearch for AzureSearch {
    async fn search_by_embedding(&self, query: &str, k: usize) -> Result<Vec<Value>, SearchError> {
        let embedding = self.embed(query).await?;
        debug!("Embedded query into {} dimensions", embedding.len());
        self.query(vector_query_body(&embedding, k)).await
    }

    async fn search_by_filters(&self, filter: &ListingFilter) -> Result<Vec<Value>, SearchError> {
        self.query(filter_query_body(filter)).await
    }

    async fn search_with_filters(
        &self,
        query: &str,
        k: usize,
        filter: &ListingFilter,
    ) -> Result<Vec<Value>, SearchError> {
        let embedding = self.embed(query).await?;
        self.query(filtered_vector_query_body(&embedding, k, filter))
            .await
    }
}

pub(crate) async fn read_json(response: reqwest::Response, service: &'static str) -> Result<Value, SearchError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SearchError::Status {
            service,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

fn vector_query_body(embedding: &[f32], k: usize) -> Value {
    json!({
        "vectorQueries": [{
            "kind": "vector",
            "vector": embedding,
            "fields": "embedding",
            "k": k,
            "exhaustive": false
        }]
    })
}

/// Vector query restricted to documents matching `filter` before ranking.
fn filtered_vector_query_body(embedding: &[f32], k: usize, filter: &ListingFilter) -> Value {
    let mut body = vector_query_body(embedding, k);
    if let Some(expr) = filter.to_odata() {
        body["filter"] = Value::String(expr);
        body["vectorFilterMode"] = Value::String("preFilter".into());
    }
    body
}

fn filter_query_body(filter: &ListingFilter) -> Value {
    let mut body = json!({
        "search": "",
        "queryType": "simple",
        "top": FILTER_TOP
    });
    if let Some(expr) = filter.to_odata() {
        body["filter"] = Value::String(expr);
    }
    body
}

fn parse_embedding(body: &Value) -> Result<Vec<f32>, SearchError> {
    let values = body["data"][0]["embedding"].as_array().ok_or_else(|| {
        SearchError::UnexpectedResponse {
            service: "embeddings",
            message: "missing data[0].embedding".into(),
        }
    })?;
    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| SearchError::UnexpectedResponse {
                    service: "embeddings",
                    message: format!("non-numeric embedding component {v}"),
                })
        })
        .collect()
}

fn parse_documents(body: Value) -> Result<Vec<Value>, SearchError> {
    match body {
        Value::Object(mut obj) => match obj.remove("value") {
            Some(Value::Array(docs)) => Ok(docs),
            _ => Err(SearchError::UnexpectedResponse {
                service: "search",
                message: "missing `value` array".into(),
            }),
        },
        _ => Err(SearchError::UnexpectedResponse {
            service: "search",
            message: "response is not an object".into(),
        }),
    }
}

/// Build a listing from an index document, defaulting absent fields.
pub fn listing_from_document(doc: &Value) -> Listing {
    let text = |key: &str| doc[key].as_str().unwrap_or_default().to_string();
    let number = |key: &str| doc[key].as_f64().unwrap_or(0.0);

    let id = match &doc["id"] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => "unknown_id".to_string(),
    };

    Listing {
        id,
        title: text("title"),
        description: text("description"),
        location: text("location"),
        contact: text("contact"),
        price: number("price"),
        rooms: number("rooms").max(0.0) as u32,
        size: number("size"),
        floor: number("floor") as i32,
        availability: text("availability"),
        lat: number("lat"),
        lng: number("lng"),
    }
}

// ---------------------------------------------------------------------------
// The `search` tool
// ---------------------------------------------------------------------------

pub struct SearchTool {
    backend: Arc<dyn ListingSearch>,
    preferences: Option<PreferenceStore>,
}

impl SearchTool {
    pub fn new(backend: Arc<dyn ListingSearch>) -> Self {
        Self {
            backend,
            preferences: None,
        }
    }

    /// Narrow every search by the preferences `update_preferences` recorded.
    pub fn with_preferences(mut self, store: PreferenceStore) -> Self {
        self.preferences = Some(store);
        self
    }

    fn current_filter(&self) -> ListingFilter {
        self.preferences
            .as_ref()
            .map(|store| ListingFilter::from_preferences(&store.snapshot()))
            .unwrap_or_default()
    }

    fn invalid(&self, message: &str) -> ToolError {
        ToolError::InvalidArguments {
            tool: self.name().to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &'static str {
        "search"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "function",
            "name": "search",
            "description": "Search the knowledge base for flat listings. The knowledge base \
                will be searched for the query and the results will be returned. Results \
                are narrowed by the preferences the user has stated so far.",
            "parameters": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }
        })
    }

    async fn invoke(&self, args: Value) -> Result<ToolResult, ToolError> {
        let Some(query) = args["query"].as_str() else {
            return Err(self.invalid("`query` must be a string"));
        };
        let query = query.trim();
        let filter = self.current_filter();
        let constrained = filter != ListingFilter::default();

        let docs = match (query.is_empty(), constrained) {
            (false, true) => {
                info!("Searching listings for '{}' within {:?}", query, filter);
                self.backend
                    .search_with_filters(query, SEARCH_K, &filter)
                    .await?
            }
            (false, false) => {
                info!("Searching listings for '{}'", query);
                self.backend.search_by_embedding(query, SEARCH_K).await?
            }
            (true, true) => {
                info!("Listing everything matching {:?}", filter);
                self.backend.search_by_filters(&filter).await?
            }
            (true, false) => {
                return Err(self.invalid("`query` is empty and no preferences are set"));
            }
        };
        if docs.is_empty() {
            warn!("Search for '{}' returned no listings", query);
        }

        let listings: Vec<Value> = docs
            .iter()
            .map(listing_from_document)
            .map(|l| serde_json::to_value(l).unwrap_or(Value::Null))
            .collect();

        Ok(ToolResult::to_client(json!({ "listings": listings })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use voicerag_core::{PreferencesUpdate, Range, ToolAction};

    /// Backend returning canned documents and recording queries.
    #[derive(Default)]
    struct FakeIndex {
        docs: Vec<Value>,
        queries: Mutex<Vec<(String, usize)>>,
        filters: Mutex<Vec<(Option<String>, ListingFilter)>>,
    }

    #[async_trait]
    impl ListingSearch for FakeIndex {
        async fn search_by_embedding(
            &self,
            query: &str,
            k: usize,
        ) -> Result<Vec<Value>, SearchError> {
            self.queries.lock().unwrap().push((query.to_string(), k));
            Ok(self.docs.iter().take(k).cloned().collect())
        }

        async fn search_by_filters(
            &self,
            filter: &ListingFilter,
        ) -> Result<Vec<Value>, SearchError> {
            self.filters.lock().unwrap().push((None, filter.clone()));
            Ok(self.docs.clone())
        }

        async fn search_with_filters(
            &self,
            query: &str,
            k: usize,
            filter: &ListingFilter,
        ) -> Result<Vec<Value>, SearchError> {
            self.filters
                .lock()
                .unwrap()
                .push((Some(query.to_string()), filter.clone()));
            Ok(self.docs.iter().take(k).cloned().collect())
        }
    }

    fn flats(n: usize) -> Vec<Value> {
        (1..=n)
            .map(|i| json!({"id": format!("L{i}"), "title": format!("Flat {i}"), "price": 900}))
            .collect()
    }

    fn sample_config() -> SearchConfig {
        SearchConfig::from_toml_str(
            r#"
            service_name = "flats"
            index_name = "vienna-listings"
            embedding_model = "text-embedding-3-large"
            openai_endpoint = "https://example.openai.azure.com/"
            api_version = "2024-06-01"
            search_api_key = "s-key"
            openai_api_key = "o-key"
            "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn search_returns_listings_to_client() {
        let index = Arc::new(FakeIndex {
            docs: flats(7),
            ..Default::default()
        });
        let tool = SearchTool::new(index.clone());

        let result = tool
            .invoke(json!({"query": "two rooms near Naschmarkt"}))
            .await
            .unwrap();

        assert_eq!(
            index.queries.lock().unwrap().as_slice(),
            &[("two rooms near Naschmarkt".to_string(), SEARCH_K)]
        );
        let ToolAction::ShowListings(listings) = ToolAction::parse(&result.to_text()).unwrap()
        else {
            panic!("expected ShowListings");
        };
        assert_eq!(listings.len(), SEARCH_K);
        assert_eq!(listings[0].id, "L1");
        assert_eq!(listings[0].title, "Flat 1");
    }

    #[tokio::test]
    async fn search_requires_query() {
        let tool = SearchTool::new(Arc::new(FakeIndex::default()));
        let err = tool.invoke(json!({"q": "x"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn stated_preferences_narrow_the_vector_search() {
        let index = Arc::new(FakeIndex {
            docs: flats(7),
            ..Default::default()
        });
        let store = PreferenceStore::default();
        store.apply(&PreferencesUpdate {
            location: Some("Leopoldstadt".into()),
            budget: Some(Range::new(0.0, 1100.0)),
            ..Default::default()
        });
        let tool = SearchTool::new(index.clone()).with_preferences(store);

        let result = tool.invoke(json!({"query": "bright flat"})).await.unwrap();

        assert!(index.queries.lock().unwrap().is_empty());
        let filters = index.filters.lock().unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].0.as_deref(), Some("bright flat"));
        assert_eq!(filters[0].1.location.as_deref(), Some("Leopoldstadt"));
        assert_eq!(filters[0].1.max_price, Some(1100.0));

        let ToolAction::ShowListings(listings) = ToolAction::parse(&result.to_text()).unwrap()
        else {
            panic!("expected ShowListings");
        };
        assert_eq!(listings.len(), SEARCH_K);
    }

    #[tokio::test]
    async fn empty_query_lists_by_preferences_alone() {
        let index = Arc::new(FakeIndex {
            docs: flats(8),
            ..Default::default()
        });
        let store = PreferenceStore::default();
        store.apply(&PreferencesUpdate {
            rooms: Some(2),
            ..Default::default()
        });
        let tool = SearchTool::new(index.clone()).with_preferences(store);

        let result = tool.invoke(json!({"query": "  "})).await.unwrap();

        let filters = index.filters.lock().unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].0, None);
        assert_eq!(filters[0].1.min_rooms, Some(2));
        let ToolAction::ShowListings(listings) = ToolAction::parse(&result.to_text()).unwrap()
        else {
            panic!("expected ShowListings");
        };
        assert_eq!(listings.len(), 8);
    }

    #[tokio::test]
    async fn empty_query_without_preferences_is_rejected() {
        let index = Arc::new(FakeIndex::default());
        let tool = SearchTool::new(index.clone()).with_preferences(PreferenceStore::default());
        let err = tool.invoke(json!({"query": ""})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        assert!(index.filters.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unset_preferences_keep_plain_vector_search() {
        let index = Arc::new(FakeIndex {
            docs: flats(2),
            ..Default::default()
        });
        let tool = SearchTool::new(index.clone()).with_preferences(PreferenceStore::default());
        tool.invoke(json!({"query": "loft"})).await.unwrap();
        assert_eq!(index.queries.lock().unwrap().len(), 1);
        assert!(index.filters.lock().unwrap().is_empty());
    }

    #[test]
    fn documents_default_missing_fields() {
        let listing = listing_from_document(&json!({"title": "Loft", "rooms": 2, "lat": 48.2}));
        assert_eq!(listing.id, "unknown_id");
        assert_eq!(listing.title, "Loft");
        assert_eq!(listing.rooms, 2);
        assert_eq!(listing.contact, "");
        assert!((listing.lat - 48.2).abs() < 1e-9);
        assert_eq!(listing.floor, 0);
    }

    #[test]
    fn odata_filter_joins_clauses() {
        let filter = ListingFilter {
            location: Some("Wieden".into()),
            max_price: Some(1200.0),
            min_rooms: Some(2),
            furnished: Some(true),
            pets_allowed: Some(false),
        };
        assert_eq!(
            filter.to_odata().unwrap(),
            "search.in(location, 'Wieden', ',') and price le 1200 and rooms ge 2 \
             and furnished eq true and pets_allowed eq false"
        );
    }

    #[test]
    fn odata_escapes_quotes_and_handles_empty() {
        assert_eq!(ListingFilter::default().to_odata(), None);
        let filter = ListingFilter {
            location: Some("Saint Mary's".into()),
            ..Default::default()
        };
        assert_eq!(
            filter.to_odata().unwrap(),
            "search.in(location, 'Saint Mary''s', ',')"
        );
    }

    #[test]
    fn filter_from_preferences() {
        let mut prefs = Preferences::default();
        prefs.apply(&PreferencesUpdate {
            budget: Some(Range::new(600.0, 1000.0)),
            rooms: Some(3),
            features: [("pets".to_string(), true)].into_iter().collect(),
            ..Default::default()
        });
        let filter = ListingFilter::from_preferences(&prefs);
        assert_eq!(filter.max_price, Some(1000.0));
        assert_eq!(filter.min_rooms, Some(3));
        assert_eq!(filter.pets_allowed, Some(true));
        assert_eq!(filter.furnished, None);
        assert_eq!(filter.location, None);
    }

    #[test]
    fn request_bodies() {
        let body = vector_query_body(&[0.5, -0.25], 5);
        assert_eq!(body["vectorQueries"][0]["fields"], "embedding");
        assert_eq!(body["vectorQueries"][0]["k"], 5);
        assert_eq!(body["vectorQueries"][0]["vector"], json!([0.5, -0.25]));

        let body = filter_query_body(&ListingFilter {
            min_rooms: Some(1),
            ..Default::default()
        });
        assert_eq!(body["top"], FILTER_TOP);
        assert_eq!(body["filter"], "rooms ge 1");
        assert!(filter_query_body(&ListingFilter::default())
            .get("filter")
            .is_none());
    }

    #[test]
    fn filtered_vector_body_prefilters() {
        let filter = ListingFilter {
            location: Some("Wieden".into()),
            max_price: Some(900.0),
            ..Default::default()
        };
        let body = filtered_vector_query_body(&[0.1], 3, &filter);
        assert_eq!(body["vectorQueries"][0]["k"], 3);
        assert_eq!(
            body["filter"],
            "search.in(location, 'Wieden', ',') and price le 900"
        );
        assert_eq!(body["vectorFilterMode"], "preFilter");

        let body = filtered_vector_query_body(&[0.1], 3, &ListingFilter::default());
        assert!(body.get("filter").is_none());
        assert!(body.get("vectorFilterMode").is_none());
    }

    #[test]
    fn endpoints_from_config() {
        let config = sample_config();
        assert_eq!(
            config.search_endpoint(),
            "https://flats.search.windows.net/indexes/vienna-listings/docs/search?api-version=2023-11-01"
        );
        assert_eq!(
            config.embeddings_endpoint(),
            "https://example.openai.azure.com/openai/deployments/text-embedding-3-large/embeddings?api-version=2024-06-01"
        );
        assert_eq!(
            config.index_endpoint(),
            "https://flats.search.windows.net/indexes/vienna-listings?api-version=2023-11-01"
        );
        assert_eq!(
            config.upload_endpoint(),
            "https://flats.search.windows.net/indexes/vienna-listings/docs/index?api-version=2023-11-01"
        );
        assert_eq!(config.embedding_dimensions, 3072);
    }

    #[test]
    fn config_requires_keys() {
        assert!(matches!(
            SearchConfig::from_toml_str("service_name = \"x\""),
            Err(SearchError::Config(_))
        ));
    }

    #[test]
    fn response_parsing() {
        assert_eq!(
            parse_embedding(&json!({"data": [{"embedding": [1.0, 2.5]}]})).unwrap(),
            vec![1.0, 2.5]
        );
        assert!(parse_embedding(&json!({"data": []})).is_err());

        let docs = parse_documents(json!({"value": [{"id": "L1"}], "@odata.count": 1})).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(parse_documents(json!({"error": "nope"})).is_err());
    }
}
