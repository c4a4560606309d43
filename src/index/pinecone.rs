//! Pinecone REST client implementing [`VectorIndex`].
//!
//! Talks to an index's data plane over its host URL: `/vectors/upsert`,
//! `/query` and `/describe_index_stats`, authenticated with an `Api-Key`
//! header. Request and response bodies use the service's camelCase field
//! names, mapped here at the wire boundary.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::IndexConfig;
use crate::index::{IndexError, IndexStats, NamespaceStats, QueryMatch, VectorIndex, VectorRecord};

pub struct PineconeIndex {
    client: Client,
    host: String,
}

impl PineconeIndex {
    pub fn new(config: &IndexConfig, api_key: &str) -> Result<Self> {
        ensure!(!config.host.trim().is_empty(), "index host is not configured");
        ensure!(!api_key.trim().is_empty(), "index API key is empty");

        let mut headers = HeaderMap::new();
        let mut key_value = HeaderValue::from_str(api_key)
            .context("index API key is not a valid header value")?;
        key_value.set_sensitive(true);
        headers.insert(HeaderName::from_static("api-key"), key_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build vector store HTTP client")?;

        let mut host = config.host.trim_end_matches('/').to_string();
        if !host.starts_with("http") {
            host = format!("https://{host}");
        }

        Ok(Self { client, host })
    }

    fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::blocking::Response, IndexError> {
        let response = self
            .client
            .post(format!("{}{path}", self.host))
            .json(body)
            .send()?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            Err(IndexError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}

impl VectorIndex for PineconeIndex {
    fn upsert(&self, vectors: &[VectorRecord], namespace: &str) -> Result<(), IndexError> {
        let request = UpsertRequest { vectors, namespace };
        self.post("/vectors/upsert", &request)?;
        Ok(())
    }

    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
        namespace: &str,
    ) -> Result<Vec<QueryMatch>, IndexError> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
            namespace,
        };
        let response: QueryResponse = self.post("/query", &request)?.json()?;
        Ok(response.matches)
    }

    fn describe_stats(&self) -> Result<IndexStats, IndexError> {
        let response: StatsResponse = self
            .post("/describe_index_stats", &serde_json::json!({}))?
            .json()?;
        Ok(response.into())
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    namespace: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    total_vector_count: u64,
    #[serde(default)]
    namespaces: BTreeMap<String, NamespaceCount>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceCount {
    #[serde(default)]
    vector_count: u64,
}

impl From<StatsResponse> for IndexStats {
    fn from(response: StatsResponse) -> Self {
        Self {
            total_vector_count: response.total_vector_count,
            namespaces: response
                .namespaces
                .into_iter()
                .map(|(name, counts)| {
                    (
                        name,
                        NamespaceStats {
                            vector_count: counts.vector_count,
                        },
                    )
                })
                .collect(),
        }
    }
}
