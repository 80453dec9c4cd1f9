//! Client for the product search cluster and job registry.
//!
//! [`GrqClient`] wraps a `reqwest` client with a fixed timeout. `search`
//! pages through results with `from`/`size` until `hits.total` documents
//! have been collected; any non-success response or transport error aborts
//! the whole run. Retry policy, if any, belongs to the caller's
//! scheduler, never to this client.
//!
//! Query bodies are opaque structured filters built by the `*_query`
//! helpers; the client treats them as data.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::fingerprint::Fingerprint;
use crate::models::{Aoi, Metadata, Product};

const DEFAULT_PAGE_SIZE: u64 = 1000;

pub struct GrqClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    hits: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ProductHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_source", default)]
    source: ProductSource,
}

#[derive(Debug, Default, Deserialize)]
struct ProductSource {
    #[serde(default)]
    starttime: Option<String>,
    #[serde(default)]
    endtime: Option<String>,
    #[serde(default)]
    location: Option<Value>,
    #[serde(default)]
    metadata: Metadata,
}

impl GrqClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("query to {url} failed"))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("query to {url} returned {status}: {text}");
        }
        response
            .json()
            .await
            .with_context(|| format!("parsing response from {url}"))
    }

    /// Run a search, paging until all `hits.total` documents are read.
    ///
    /// The document order across pages is whatever the backing index
    /// returns; it is not stable under concurrent index mutation.
    pub async fn search(&self, index: &str, mut query: Value) -> Result<Vec<Value>> {
        let url = format!("{}/{}/_search", self.base_url, index);
        let size = query
            .get("size")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        query["size"] = json!(size);
        if query.get("from").is_none() {
            query["from"] = json!(0);
        }

        let first: SearchResponse = serde_json::from_value(self.post_json(&url, &query).await?)
            .with_context(|| format!("malformed search response from {url}"))?;
        let total = first.hits.total;
        let mut documents = first.hits.hits;

        let mut from = size;
        while from < total {
            query["from"] = json!(from);
            let page: SearchResponse = serde_json::from_value(self.post_json(&url, &query).await?)
                .with_context(|| format!("malformed search response from {url}"))?;
            documents.extend(page.hits.hits);
            from += size;
        }
        Ok(documents)
    }

    /// Search an index and parse the hits as products.
    pub async fn search_products(&self, index: &str, query: Value) -> Result<Vec<Product>> {
        let hits = self.search(index, query).await?;
        hits.into_iter()
            .map(|hit| {
                let parsed: ProductHit =
                    serde_json::from_value(hit).context("malformed product hit")?;
                Ok(Product {
                    id: parsed.id,
                    index: parsed.index,
                    starttime: parsed.source.starttime,
                    endtime: parsed.source.endtime,
                    metadata: parsed.source.metadata,
                })
            })
            .collect()
    }

    /// Search an index and parse the hits as areas of interest.
    pub async fn search_aois(&self, index: &str, query: Value) -> Result<Vec<Aoi>> {
        let hits = self.search(index, query).await?;
        hits.into_iter()
            .map(|hit| {
                let parsed: ProductHit = serde_json::from_value(hit).context("malformed AOI hit")?;
                Ok(Aoi {
                    id: parsed.id,
                    starttime: parsed.source.starttime,
                    endtime: parsed.source.endtime,
                    location: parsed.source.location,
                })
            })
            .collect()
    }

    /// Fetch a single document's current metadata tags.
    pub async fn get_tags(&self, index: &str, id: &str) -> Result<Vec<String>> {
        let url = format!("{}/{}/{}", self.base_url, index, id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("fetch of {url} failed"))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("fetch of {url} returned {status}: {text}");
        }
        let doc: Value = response
            .json()
            .await
            .with_context(|| format!("parsing document from {url}"))?;
        let tags = doc
            .pointer("/_source/metadata/tags")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(tags)
    }

    /// Persist a full tag list on a document via a partial update.
    pub async fn update_tags(&self, index: &str, id: &str, tags: &[String]) -> Result<()> {
        let url = format!("{}/{}/{}/_update", self.base_url, index, id);
        let body = json!({"doc": {"metadata": {"tags": tags}}});
        self.post_json(&url, &body).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl crate::store::ProductStore for GrqClient {
    async fn fetch_tags(&self, index: &str, id: &str) -> Result<Vec<String>> {
        self.get_tags(index, id).await
    }

    async fn put_tags(&self, index: &str, id: &str, tags: &[String]) -> Result<()> {
        self.update_tags(index, id, tags).await
    }
}

/// AOIs whose footprint intersects the given polygon coordinates.
pub fn aoi_query(coordinates: &Value) -> Value {
    json!({
        "query": {
            "geo_shape": {
                "location": {
                    "shape": {"type": "polygon", "coordinates": coordinates}
                }
            }
        }
    })
}

/// Products of an index that intersect an AOI temporally and spatially,
/// restricted to the given orbit number(s).
pub fn scoped_query(
    orbit_number: &Value,
    starttime: Option<&str>,
    endtime: Option<&str>,
    location: Option<&Value>,
) -> Value {
    let orbits = if orbit_number.is_array() {
        orbit_number.clone()
    } else {
        json!([orbit_number])
    };
    let mut must = vec![json!({"terms": {"metadata.orbitNumber": orbits}})];
    if let (Some(from), Some(to)) = (starttime, endtime) {
        must.push(json!({"range": {"starttime": {"from": from, "to": to}}}));
    }
    if let Some(loc) = location {
        must.push(json!({"geo_shape": {"location": loc}}));
    }
    json!({"query": {"bool": {"must": must}}, "from": 0, "size": 100})
}

pub fn match_all_query() -> Value {
    json!({"query": {"bool": {"must": [{"match_all": {}}]}}, "from": 0, "size": 1000})
}

/// Failed jobs of one payload type; the retry-count clause is dropped
/// entirely when `threshold <= 0`.
pub fn failed_jobs_query(job_type: &str, threshold: i64) -> Value {
    let mut must = vec![
        json!({"term": {"status": "job-failed"}}),
        json!({"term": {"job.job_info.job_payload.job_type": job_type}}),
    ];
    if threshold > 0 {
        must.push(json!({"range": {"job.retry_count": {"gte": threshold}}}));
    }
    json!({"query": {"bool": {"must": must}}, "from": 0, "size": 1000})
}

/// Documents carrying a given content fingerprint, optionally restricted
/// to one dataset type.
pub fn fingerprint_query(fp: &Fingerprint, dataset: Option<&str>) -> Value {
    let mut must = vec![json!({"term": {"metadata.full_id_hash.raw": fp.as_str()}})];
    if let Some(ds) = dataset {
        must.push(json!({"term": {"dataset.raw": ds}}));
    }
    json!({"query": {"bool": {"must": must}}, "from": 0, "size": 10})
}
