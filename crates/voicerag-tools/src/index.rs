// Listing index management: the index schema the search tool queries, and
// bulk upload of listing documents with their embeddings.

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::search::{read_json, AzureSearch, SearchConfig, SearchError};

const VECTOR_PROFILE: &str = "embedding_config";
const HNSW_CONFIG: &str = "hnsw_config";

/// Documents sent per upload request.
pub const UPLOAD_BATCH: usize = 100;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

fn field(name: &str, kind: &str) -> Value {
    json!({ "name": name, "type": kind })
}

fn searchable(name: &str) -> Value {
    json!({ "name": name, "type": "Edm.String", "searchable": true })
}

/// Text fields the filters constrain as well as match.
fn filterable_text(name: &str) -> Value {
    json!({
        "name": name,
        "type": "Edm.String",
        "searchable": true,
        "filterable": true,
        "facetable": true
    })
}

/// Plain values that filters may constrain.
fn filterable(name: &str, kind: &str) -> Value {
    json!({ "name": name, "type": kind, "filterable": true })
}

/// The index definition: listing fields, the HNSW vector profile over
/// `embedding`, an Azure OpenAI vectorizer and a semantic configuration.
pub fn index_definition(config: &SearchConfig) -> Value {
    let vectorizer = format!("{}-vectorizer", config.index_name);
    let fields = vec![
        json!({
            "name": "id",
            "type": "Edm.String",
            "key": true,
            "filterable": true,
            "analyzer": "keyword"
        }),
        searchable("title"),
        searchable("description"),
        filterable_text("location"),
        filterable_text("contact"),
        filterable("price", "Edm.Double"),
        filterable("rooms", "Edm.Int32"),
        field("size", "Edm.Int32"),
        field("floor", "Edm.Int32"),
        field("built_year", "Edm.Int32"),
        filterable("furnished", "Edm.Boolean"),
        filterable("pets_allowed", "Edm.Boolean"),
        field("elevator", "Edm.Boolean"),
        field("balcony", "Edm.Boolean"),
        field("smoking_allowed", "Edm.Boolean"),
        field("availability", "Edm.String"),
        field("lat", "Edm.Double"),
        field("lng", "Edm.Double"),
        field("deposit", "Edm.Double"),
        json!({
            "name": "embedding",
            "type": "Collection(Edm.Single)",
            "searchable": true,
            "retrievable": false,
            "dimensions": config.embedding_dimensions,
            "vectorSearchProfile": VECTOR_PROFILE
        }),
    ];

    json!({
        "name": config.index_name,
        "fields": fields,
        "vectorSearch": {
            "algorithms": [{
                "name": HNSW_CONFIG,
                "kind": "hnsw",
                "hnswParameters": { "metric": "cosine" }
            }],
            "profiles": [{
                "name": VECTOR_PROFILE,
                "algorithm": HNSW_CONFIG,
                "vectorizer": vectorizer
            }],
            "vectorizers": [{
                "name": vectorizer,
                "kind": "azureOpenAI",
                "azureOpenAIParameters": {
                    "resourceUri": config.openai_endpoint.trim_end_matches('/'),
                    "deploymentId": config.embedding_model,
                    "apiKey": config.openai_api_key
                }
            }]
        },
        "semantic": {
            "configurations": [{
                "name": "default",
                "prioritizedFields": {
                    "titleField": { "fieldName": "title" },
                    "prioritizedContentFields": [{ "fieldName": "description" }]
                }
            }]
        }
    })
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// The text a listing is embedded from.
pub fn embedding_text(doc: &Value) -> String {
    let part = |key: &str| doc[key].as_str().unwrap_or_default();
    format!("{} {}", part("title"), part("description"))
        .trim()
        .to_string()
}

/// Wrap documents as an `upload` batch.
fn upload_body(docs: Vec<Map<String, Value>>) -> Value {
    let value: Vec<Value> = docs
        .into_iter()
        .map(|mut doc| {
            doc.insert("@search.action".into(), Value::String("upload".into()));
            Value::Object(doc)
        })
        .collect();
    json!({ "value": value })
}

/// Count accepted documents in an upload response, logging rejected ones.
fn count_uploaded(body: &Value) -> Result<usize, SearchError> {
    let results = body["value"]
        .as_array()
        .ok_or_else(|| SearchError::UnexpectedResponse {
            service: "index",
            message: "missing `value` array".into(),
        })?;
    let mut accepted = 0;
    for result in results {
        if result["status"].as_bool() == Some(true) {
            accepted += 1;
        } else {
            warn!(
                "Listing {} was rejected: {}",
                result["key"],
                result["errorMessage"].as_str().unwrap_or("no reason given")
            );
        }
    }
    Ok(accepted)
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Creates the listing index and fills it.
pub struct IndexManager {
    search: AzureSearch,
}

impl IndexManager {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            search: AzureSearch::new(config),
        }
    }

    /// Create the index unless it exists. Returns whether it was created.
    pub async fn create_index_if_not_exists(&self) -> Result<bool, SearchError> {
        let config = self.search.config();
        let response = self
            .search
            .http()
            .get(config.index_endpoint())
            .header("api-key", &config.search_api_key)
            .send()
            .await?;
        if response.status().is_success() {
            info!("Index {} already exists", config.index_name);
            return Ok(false);
        }
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                service: "index",
                status,
                body,
            });
        }

        let response = self
            .search
            .http()
            .put(config.index_endpoint())
            .header("api-key", &config.search_api_key)
            .json(&index_definition(config))
            .send()
            .await?;
        read_json(response, "index").await?;
        info!("Created index {}", config.index_name);
        Ok(true)
    }

    /// Embed and upload listing documents. Returns how many the index took.
    pub async fn upload_documents(&self, docs: Vec<Value>) -> Result<usize, SearchError> {
        let mut prepared = Vec::with_capacity(docs.len());
        for doc in docs {
            let Value::Object(mut obj) = doc else {
                warn!("Skipping listing that is not a JSON object");
                continue;
            };
            let text = embedding_text(&Value::Object(obj.clone()));
            let embedding = self.search.embed(&text).await?;
            debug!(
                "Embedded listing {} ({} chars)",
                obj.get("id").unwrap_or(&serde_json::Value::Null),
                text.len()
            );
            obj.insert("embedding".into(), json!(embedding));
            prepared.push(obj);
        }

        let config = self.search.config();
        let mut uploaded = 0;
        while !prepared.is_empty() {
            let rest = prepared.split_off(prepared.len().min(UPLOAD_BATCH));
            let batch = std::mem::replace(&mut prepared, rest);
            let response = self
                .search
                .http()
                .post(config.upload_endpoint())
                .header("api-key", &config.search_api_key)
                .json(&upload_body(batch))
                .send()
                .await?;
            uploaded += count_uploaded(&read_json(response, "index").await?)?;
        }
        info!("Uploaded {} listings to {}", uploaded, config.index_name);
        Ok(uploaded)
    }
}
