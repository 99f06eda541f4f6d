//! Weaviate vector store provider
//!
//! Talks to the REST schema/batch endpoints and the GraphQL `Get` query API.
//! Collections are Weaviate classes holding one object per chunk.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::config::WeaviateConfig;
use crate::error::{Error, Result};
use crate::providers::vector_store::{SearchRequest, SearchStrategy, VectorStoreProvider, Vectorizer};
use crate::types::{DocumentChunk, SearchHit};

const HUGGINGFACE_KEY_HEADER: &str = "x-huggingface-api-key";

/// Chunk properties fetched by every search
const CHUNK_FIELDS: &str = "content fileName fileType chunkId";

/// Weaviate REST/GraphQL client
pub struct WeaviateClient {
    client: Client,
    base_url: String,
    batch_size: usize,
}

impl WeaviateClient {
    /// Create a client. The Hugging Face key is forwarded so the
    /// `text2vec-huggingface` module can vectorize on our behalf.
    pub fn new(config: &WeaviateConfig, huggingface_api_key: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            headers.insert(AUTHORIZATION, sensitive_header(&format!("Bearer {}", key))?);
        }
        if let Some(key) = huggingface_api_key {
            headers.insert(
                HeaderName::from_static(HUGGINGFACE_KEY_HEADER),
                sensitive_header(key)?,
            );
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.init_timeout_secs))
            .timeout(Duration::from_secs(config.query_timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            batch_size: config.batch_size.max(1),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check_status(response: Response, what: &str) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::vector_db(format!("{} failed ({}): {}", what, status, body)))
    }
}

fn sensitive_header(value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|e| Error::Config(format!("Invalid header value: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Validate a collection name and apply Weaviate's capitalisation of the first letter
pub fn normalize_class_name(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let first = chars
        .next()
        .ok_or_else(|| Error::invalid_request("Collection name must not be empty"))?;

    if !first.is_ascii_alphabetic()
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(Error::invalid_request(format!(
            "Invalid collection name \"{}\": use letters, digits and underscores, starting with a letter",
            name
        )));
    }

    let mut normalized = first.to_ascii_uppercase().to_string();
    normalized.push_str(chars.as_str());
    Ok(normalized)
}

/// Class definition for a chunk collection
pub fn class_definition(class: &str, vectorizer: &Vectorizer) -> Value {
    let mut content_hash = json!({
        "name": "contentHash",
        "dataType": ["text"],
        "description": "SHA-256 of the source file",
        "tokenization": "field",
    });
    if matches!(vectorizer, Vectorizer::HuggingFace { .. }) {
        content_hash["moduleConfig"] = json!({
            "text2vec-huggingface": { "skip": true, "vectorizePropertyName": false }
        });
    }

    let properties = json!([
        {
            "name": "content",
            "dataType": ["text"],
            "description": "The text chunk from the document",
            "tokenization": "word",
        },
        {
            "name": "fileName",
            "dataType": ["text"],
            "description": "The source file name",
        },
        {
            "name": "fileType",
            "dataType": ["text"],
            "description": "The source file extension",
        },
        {
            "name": "chunkId",
            "dataType": ["int"],
            "description": "Position of the chunk within its file",
        },
        content_hash,
    ]);

    match vectorizer {
        Vectorizer::HuggingFace { model } => json!({
            "class": class,
            "vectorizer": "text2vec-huggingface",
            "moduleConfig": {
                "text2vec-huggingface": { "model": model, "type": "text" }
            },
            "properties": properties,
        }),
        Vectorizer::None => json!({
            "class": class,
            "vectorizer": "none",
            "properties": properties,
        }),
    }
}

/// Stable object id for a chunk, so re-ingesting the same file overwrites
/// its objects instead of duplicating them. `index` stands in for a missing
/// `chunk_id`.
pub fn object_id(class: &str, chunk: &DocumentChunk, index: usize) -> Uuid {
    let source = chunk.content_hash.as_deref().unwrap_or(&chunk.content);
    let position = chunk.chunk_id.map_or(index, |id| id as usize);
    let name = format!("{}/{}/{}/{}", class, chunk.file_name, source, position);
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
}

/// Build the GraphQL `Get` query for a search
pub fn build_get_query(class: &str, request: &SearchRequest) -> Result<String> {
    // A JSON string literal is a valid GraphQL string literal
    let text = serde_json::to_string(&request.query)?;

    let (operator, additional) = match &request.strategy {
        SearchStrategy::NearText => (format!("nearText: {{concepts: [{}]}}", text), "distance"),
        SearchStrategy::Hybrid { alpha } => {
            (format!("hybrid: {{query: {}, alpha: {}}}", text, alpha), "score")
        }
        SearchStrategy::NearVector(vector) => (
            format!("nearVector: {{vector: {}}}", serde_json::to_string(vector)?),
            "distance",
        ),
    };

    Ok(format!(
        "{{ Get {{ {class}({operator}, limit: {limit}) {{ {fields} _additional {{ {additional} }} }} }} }}",
        class = class,
        operator = operator,
        limit = request.limit,
        fields = CHUNK_FIELDS,
        additional = additional,
    ))
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Decode a GraphQL `Get` response into hits
fn parse_get_response(class: &str, response: GraphQlResponse) -> Result<Vec<SearchHit>> {
    if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
        let message = errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        // Unknown classes surface as unknown fields on the Get type
        if message.contains("Cannot query field") && message.contains(&format!("\"{}\"", class)) {
            return Err(Error::CollectionNotFound(class.to_string()));
        }
        return Err(Error::vector_db(format!("GraphQL query failed: {}", message)));
    }

    let objects = response
        .data
        .as_ref()
        .and_then(|data| data.get("Get"))
        .and_then(|get| get.get(class))
        .and_then(Value::as_array);

    Ok(objects
        .map(|objects| objects.iter().map(hit_from_object).collect())
        .unwrap_or_default())
}

fn hit_from_object(object: &Value) -> SearchHit {
    let text = |key: &str| object[key].as_str().unwrap_or_default().to_string();
    let additional = &object["_additional"];

    SearchHit {
        content: text("content"),
        file_name: text("fileName"),
        file_type: text("fileType"),
        chunk_id: object["chunkId"].as_u64().map(|v| v as u32),
        distance: number_or_string(&additional["distance"]),
        score: number_or_string(&additional["score"]),
    }
}

/// Weaviate reports hybrid scores as strings and distances as numbers
fn number_or_string(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| v as f32),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    #[serde(default)]
    classes: Option<Vec<ClassSummary>>,
}

#[derive(Debug, Deserialize)]
struct ClassSummary {
    class: String,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    objects: Vec<BatchObject<'a>>,
}

#[derive(Serialize)]
struct BatchObject<'a> {
    class: &'a str,
    id: Uuid,
    properties: &'a DocumentChunk,
    #[serde(skip_serializing_if = "Option::is_none")]
    vector: Option<&'a [f32]>,
}

#[derive(Debug, Deserialize)]
struct BatchObjectResult {
    #[serde(default)]
    result: Option<ObjectResult>,
}

#[derive(Debug, Deserialize)]
struct ObjectResult {
    #[serde(default)]
    errors: Option<ErrorList>,
}

#[derive(Debug, Deserialize)]
struct ErrorList {
    #[serde(default)]
    error: Vec<GraphQlError>,
}

/// Per-object error messages from a batch response
fn batch_errors(results: &[BatchObjectResult]) -> Vec<String> {
    results
        .iter()
        .filter_map(|r| r.result.as_ref()?.errors.as_ref())
        .flat_map(|errors| errors.error.iter().map(|e| e.message.clone()))
        .collect()
}

#[async_trait]
impl VectorStoreProvider for WeaviateClient {
    async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.url("/v1/schema"))
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Schema request failed: {}", e)))?;
        let response = Self::check_status(response, "Schema listing").await?;

        let schema: SchemaResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse schema: {}", e)))?;

        let mut names: Vec<String> = schema
            .classes
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.class)
            .collect();
        names.sort();
        Ok(names)
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let class = normalize_class_name(name)?;
        let response = self
            .client
            .get(self.url(&format!("/v1/schema/{}", class)))
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Schema request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check_status(response, "Collection lookup").await?;
        Ok(true)
    }

    async fn create_collection(&self, name: &str, vectorizer: &Vectorizer) -> Result<()> {
        let class = normalize_class_name(name)?;
        let response = self
            .client
            .post(self.url("/v1/schema"))
            .json(&class_definition(&class, vectorizer))
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Create collection request failed: {}", e)))?;
        Self::check_status(response, "Collection creation").await?;

        tracing::info!("Created collection {} ({:?})", class, vectorizer);
        Ok(())
    }

    async fn insert_chunks(
        &self,
        collection: &str,
        chunks: &[DocumentChunk],
        vectors: Option<&[Vec<f32>]>,
    ) -> Result<usize> {
        let class = normalize_class_name(collection)?;

        if let Some(vectors) = vectors {
            if vectors.len() != chunks.len() {
                return Err(Error::internal(format!(
                    "{} vectors supplied for {} chunks",
                    vectors.len(),
                    chunks.len()
                )));
            }
        }

        let mut written = 0;
        for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
            let offset = batch_index * self.batch_size;
            let objects = batch
                .iter()
                .enumerate()
                .map(|(i, chunk)| BatchObject {
                    class: &class,
                    id: object_id(&class, chunk, offset + i),
                    properties: chunk,
                    vector: vectors.map(|v| v[offset + i].as_slice()),
                })
                .collect();

            let response = self
                .client
                .post(self.url("/v1/batch/objects"))
                .json(&BatchRequest { objects })
                .send()
                .await
                .map_err(|e| Error::vector_db(format!("Batch insert request failed: {}", e)))?;
            let response = Self::check_status(response, "Batch insert").await?;

            let results: Vec<BatchObjectResult> = response
                .json()
                .await
                .map_err(|e| Error::vector_db(format!("Failed to parse batch response: {}", e)))?;

            let errors = batch_errors(&results);
            if let Some(first) = errors.first() {
                let accepted = written + batch.len().saturating_sub(errors.len());
                return Err(Error::vector_db(format!(
                    "{} of {} objects rejected by {} ({} of {} chunks stored): {}",
                    errors.len(),
                    batch.len(),
                    class,
                    accepted,
                    chunks.len(),
                    first
                )));
            }

            written += batch.len();
            tracing::debug!("Inserted batch of {} objects into {}", batch.len(), class);
        }

        Ok(written)
    }

    async fn search(&self, collection: &str, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let class = normalize_class_name(collection)?;
        let query = build_get_query(&class, request)?;

        let response = self
            .client
            .post(self.url("/v1/graphql"))
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("GraphQL request failed: {}", e)))?;
        let response = Self::check_status(response, "GraphQL query").await?;

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse GraphQL response: {}", e)))?;

        parse_get_response(&class, body)
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.get(self.url("/v1/.well-known/ready")).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "weaviate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: &str, strategy: SearchStrategy) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            strategy,
            limit: 3,
        }
    }

    #[test]
    fn test_normalize_class_name() {
        assert_eq!(normalize_class_name("document").unwrap(), "Document");
        assert_eq!(normalize_class_name("Annual_Report2024").unwrap(), "Annual_Report2024");
        assert!(matches!(normalize_class_name(""), Err(Error::InvalidRequest(_))));
        assert!(matches!(normalize_class_name("9lives"), Err(Error::InvalidRequest(_))));
        assert!(matches!(
            normalize_class_name("Doc) { __schema"),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_class_definition_vectorizers() {
        let hf = class_definition(
            "Document",
            &Vectorizer::HuggingFace {
                model: "sentence-transformers/all-MiniLM-L6-v2".into(),
            },
        );
        assert_eq!(hf["vectorizer"], "text2vec-huggingface");
        assert_eq!(
            hf["moduleConfig"]["text2vec-huggingface"]["model"],
            "sentence-transformers/all-MiniLM-L6-v2"
        );
        let properties = hf["properties"].as_array().unwrap();
        assert_eq!(properties.len(), 5);
        assert_eq!(properties[4]["name"], "contentHash");
        assert_eq!(properties[4]["moduleConfig"]["text2vec-huggingface"]["skip"], true);

        let none = class_definition("Document", &Vectorizer::None);
        assert_eq!(none["vectorizer"], "none");
        assert!(none.get("moduleConfig").is_none());
        assert!(none["properties"][4].get("moduleConfig").is_none());
    }

    #[test]
    fn test_near_text_query() {
        let query = build_get_query("Document", &request("what is rust?", SearchStrategy::NearText)).unwrap();
        assert_eq!(
            query,
            "{ Get { Document(nearText: {concepts: [\"what is rust?\"]}, limit: 3) \
             { content fileName fileType chunkId _additional { distance } } } }"
        );
    }

    #[test]
    fn test_hybrid_query() {
        let query = build_get_query(
            "Document",
            &request("tokio", SearchStrategy::Hybrid { alpha: 0.25 }),
        )
        .unwrap();
        assert!(query.contains("hybrid: {query: \"tokio\", alpha: 0.25}"));
        assert!(query.contains("_additional { score }"));
    }

    #[test]
    fn test_near_vector_query() {
        let query = build_get_query(
            "Document",
            &request("x", SearchStrategy::NearVector(vec![0.5, -1.0])),
        )
        .unwrap();
        assert!(query.contains("nearVector: {vector: [0.5,-1.0]}"));
    }

    #[test]
    fn test_query_text_is_escaped() {
        let query = build_get_query(
            "Document",
            &request("say \"hi\"\n} }", SearchStrategy::NearText),
        )
        .unwrap();
        assert!(query.contains(r#"nearText: {concepts: ["say \"hi\"\n} }"]}"#));
    }

    #[test]
    fn test_parse_hits() {
        let body: GraphQlResponse = serde_json::from_value(json!({
            "data": { "Get": { "Document": [
                {
                    "content": "Rust is a systems language.",
                    "fileName": "rust.md",
                    "fileType": ".md",
                    "chunkId": 2,
                    "_additional": { "distance": 0.12 }
                },
                {
                    "content": "Tokio is an async runtime.",
                    "fileName": "tokio.pdf",
                    "fileType": ".pdf",
                    "chunkId": null,
                    "_additional": { "score": "0.016393442" }
                }
            ]}}
        }))
        .unwrap();

        let hits = parse_get_response("Document", body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].file_name, "rust.md");
        assert_eq!(hits[0].chunk_id, Some(2));
        assert!((hits[0].distance.unwrap() - 0.12).abs() < 1e-6);
        assert_eq!(hits[1].chunk_id, None);
        assert!((hits[1].score.unwrap() - 0.016393442).abs() < 1e-6);
    }

    #[test]
    fn test_parse_empty_result() {
        let body: GraphQlResponse =
            serde_json::from_value(json!({ "data": { "Get": { "Document": null } } })).unwrap();
        assert!(parse_get_response("Document", body).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_class_maps_to_not_found() {
        let body: GraphQlResponse = serde_json::from_value(json!({
            "data": null,
            "errors": [{ "message": "Cannot query field \"Missing\" on type \"GetObjectsObj\"." }]
        }))
        .unwrap();
        assert!(matches!(
            parse_get_response("Missing", body),
            Err(Error::CollectionNotFound(name)) if name == "Missing"
        ));
    }

    #[test]
    fn test_other_graphql_errors() {
        let body: GraphQlResponse = serde_json::from_value(json!({
            "errors": [{ "message": "vectorize params: remote client vectorize: rate limited" }]
        }))
        .unwrap();
        assert!(matches!(parse_get_response("Document", body), Err(Error::VectorDb(_))));
    }

    #[test]
    fn test_batch_errors_collected() {
        let results: Vec<BatchObjectResult> = serde_json::from_value(json!([
            { "result": {} },
            { "result": { "errors": { "error": [{ "message": "vector lengths don't match" }] } } },
            { "id": "abc" }
        ]))
        .unwrap();
        assert_eq!(batch_errors(&results), vec!["vector lengths don't match"]);
    }

    #[test]
    fn test_batch_object_serialization() {
        let chunk = DocumentChunk::new("text", "a.txt", crate::types::FileType::Txt).with_chunk_id(0);
        let vector = vec![0.1f32, 0.2];
        let id = object_id("Document", &chunk, 0);
        let with_vector = serde_json::to_value(BatchObject {
            class: "Document",
            id,
            properties: &chunk,
            vector: Some(vector.as_slice()),
        })
        .unwrap();
        assert_eq!(with_vector["properties"]["fileName"], "a.txt");
        assert_eq!(with_vector["vector"].as_array().unwrap().len(), 2);
        assert_eq!(with_vector["id"], id.to_string());

        let without = serde_json::to_value(BatchObject {
            class: "Document",
            id,
            properties: &chunk,
            vector: None,
        })
        .unwrap();
        assert!(without.get("vector").is_none());
    }

    #[test]
    fn test_object_id_is_stable_per_chunk() {
        let chunk = |content: &str, id: u32| {
            DocumentChunk::new(content, "guide.md", crate::types::FileType::Markdown)
                .with_chunk_id(id)
                .with_content_hash("ab12")
        };

        assert_eq!(
            object_id("Document", &chunk("first", 0), 0),
            object_id("Document", &chunk("first", 0), 7)
        );
        assert_ne!(
            object_id("Document", &chunk("first", 0), 0),
            object_id("Document", &chunk("second", 1), 1)
        );
        assert_ne!(
            object_id("Document", &chunk("first", 0), 0),
            object_id("Guide", &chunk("first", 0), 0)
        );
        assert_ne!(
            object_id("Document", &chunk("first", 0), 0),
            object_id("Document", &chunk("first", 0).with_content_hash("cd34"), 0)
        );

        let untagged = DocumentChunk::new("text", "a.txt", crate::types::FileType::Txt);
        assert_ne!(
            object_id("Document", &untagged, 0),
            object_id("Document", &untagged, 1)
        );
    }
}
