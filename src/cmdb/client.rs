use std::cell::Cell;
use std::collections::BTreeMap;

use reqwest::blocking::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use crate::catalog::RemoteRelationshipType;
use crate::config::CmdbConfig;
use crate::error::{Result, SyncError};
use crate::model::{DisplayId, RemoteAsset};

/// Blocking client for the CMDB REST API. Every method issues a single
/// round trip and increments the per-client call counter; there is no
/// batching, retrying, or concurrency control.
pub struct CmdbClient {
    http: Client,
    base_url: Url,
    user: String,
    password: String,
    calls: Cell<u64>,
}

impl CmdbClient {
    pub fn new(config: &CmdbConfig) -> Result<Self> {
        Ok(Self {
            http: Client::builder().build()?,
            base_url: config.base_url.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            calls: Cell::new(0),
        })
    }

    /// Number of remote calls issued since construction or the last
    /// [`reset_calls`](Self::reset_calls). Observational only.
    pub fn calls_made(&self) -> u64 {
        self.calls.get()
    }

    /// Resets the call counter, typically at run start.
    pub fn reset_calls(&self) {
        self.calls.set(0);
    }

    /// Fetches the complete remote asset table by paginating the listing
    /// endpoint from page 1 until an empty page is returned. Any page
    /// failure aborts the whole fetch: a partial listing would make the
    /// reconciliation diff unsound.
    #[instrument(level = "info", skip(self))]
    pub fn fetch_all_assets(&self) -> Result<Vec<RemoteAsset>> {
        let mut assets = Vec::new();
        let mut page: u32 = 1;
        loop {
            let url = self.endpoint(&format!("cmdb/items.json?page={page}"))?;
            let response = self
                .get(url)
                .send()
                .map_err(|error| SyncError::Pagination {
                    page,
                    reason: error.to_string(),
                })?;
            self.count_call();
            if !response.status().is_success() {
                return Err(SyncError::Pagination {
                    page,
                    reason: format!("HTTP {}", response.status()),
                });
            }
            let batch: Vec<RemoteAsset> =
                response.json().map_err(|error| SyncError::Pagination {
                    page,
                    reason: error.to_string(),
                })?;
            if batch.is_empty() {
                break;
            }
            debug!(page, batch_len = batch.len(), "asset listing page fetched");
            assets.extend(batch);
            page += 1;
        }
        info!(asset_count = assets.len(), "remote asset table fetched");
        Ok(assets)
    }

    /// Creates a configuration item; the remote system assigns its id.
    pub fn create_asset(&self, item: &ConfigItemPayload) -> Result<Value> {
        let url = self.endpoint("cmdb/items.json")?;
        let response = self.post(url).json(item).send()?;
        self.count_call();
        self.into_payload(response, &item.cmdb_config_item.asset_tag)
    }

    /// Replaces the mutable fields of an existing configuration item.
    pub fn update_asset(&self, display_id: DisplayId, item: &ConfigItemPayload) -> Result<Value> {
        let url = self.endpoint(&format!("cmdb/items/{display_id}.json"))?;
        let response = self.put(url).json(item).send()?;
        self.count_call();
        self.into_payload(response, &item.cmdb_config_item.asset_tag)
    }

    /// Soft-deletes a configuration item, or removes it permanently when
    /// `permanent` is set. Soft deletes are reversible via
    /// [`restore_asset`](Self::restore_asset).
    pub fn delete_asset(&self, display_id: DisplayId, permanent: bool) -> Result<Value> {
        let subject = display_id.to_string();
        if permanent {
            let url = self.endpoint(&format!("assets/{display_id}/delete_forever"))?;
            let response = self.put(url).send()?;
            self.count_call();
            self.into_payload(response, &subject)
        } else {
            let url = self.endpoint(&format!("cmdb/items/{display_id}.json"))?;
            let response = self
                .http
                .delete(url)
                .basic_auth(&self.user, Some(&self.password))
                .send()?;
            self.count_call();
            self.into_payload(response, &subject)
        }
    }

    /// Restores a soft-deleted configuration item.
    pub fn restore_asset(&self, display_id: DisplayId) -> Result<Value> {
        let url = self.endpoint(&format!("cmdb/items/{display_id}/restore.json"))?;
        let response = self.put(url).send()?;
        self.count_call();
        self.into_payload(response, &display_id.to_string())
    }

    /// Associates two configuration items. The source is the owning side;
    /// the target travels in the payload together with the relationship
    /// type id and the fixed forward direction tag.
    pub fn associate(&self, source_id: DisplayId, payload: &AssociatePayload) -> Result<Value> {
        let url = self.endpoint(&format!("cmdb/items/{source_id}/associate.json"))?;
        let response = self.post(url).json(payload).send()?;
        self.count_call();
        self.into_payload(response, &source_id.to_string())
    }

    /// Legacy field-match search over configuration items.
    pub fn search_assets(&self, field: &str, query: &str) -> Result<Value> {
        let mut url = self.endpoint("cmdb/items/list.json")?;
        url.query_pairs_mut()
            .append_pair("field", field)
            .append_pair("q", query);
        let response = self.get(url).send()?;
        self.count_call();
        self.into_payload(response, field)
    }

    /// Structured asset search, paginated the same way as the full listing.
    pub fn filter_assets(&self, query: &str) -> Result<Vec<Value>> {
        let mut assets = Vec::new();
        let mut page: u32 = 1;
        loop {
            let mut url = self.endpoint("assets")?;
            url.query_pairs_mut()
                .append_pair("include", "type_fields")
                .append_pair("query", &format!("\"{query}\""))
                .append_pair("page", &page.to_string());
            let response = self
                .get(url)
                .send()
                .map_err(|error| SyncError::Pagination {
                    page,
                    reason: error.to_string(),
                })?;
            self.count_call();
            if !response.status().is_success() {
                return Err(SyncError::Pagination {
                    page,
                    reason: format!("HTTP {}", response.status()),
                });
            }
            let body: Value = response.json().map_err(|error| SyncError::Pagination {
                page,
                reason: error.to_string(),
            })?;
            let batch = match body.get("assets").and_then(Value::as_array) {
                Some(batch) if !batch.is_empty() => batch.clone(),
                _ => break,
            };
            assets.extend(batch);
            page += 1;
        }
        Ok(assets)
    }

    /// Lists the relationship types defined remotely.
    pub fn relationship_types(&self) -> Result<Vec<RemoteRelationshipType>> {
        let url = self.endpoint("cmdb/relationship_types/list.json")?;
        let response = self.get(url).send()?;
        self.count_call();
        Ok(response.error_for_status()?.json()?)
    }

    /// Lists the CI types defined remotely.
    pub fn ci_types(&self) -> Result<Value> {
        let url = self.endpoint("cmdb/ci_types.json")?;
        let response = self.get(url).send()?;
        self.count_call();
        self.into_payload(response, "ci_types")
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|error| SyncError::Config(format!("bad endpoint '{path}': {error}")))
    }

    fn get(&self, url: Url) -> RequestBuilder {
        self.http
            .get(url)
            .basic_auth(&self.user, Some(&self.password))
    }

    fn post(&self, url: Url) -> RequestBuilder {
        self.http
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
    }

    fn put(&self, url: Url) -> RequestBuilder {
        self.http
            .put(url)
            .basic_auth(&self.user, Some(&self.password))
    }

    fn count_call(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn into_payload(&self, response: reqwest::blocking::Response, subject: &str) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::RemoteCall {
                subject: subject.to_string(),
                status: format!("HTTP {status}"),
            });
        }
        // Some endpoints answer with an empty body on success.
        let text = response.text()?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Create/update payload for a configuration item, shaped the way the
/// remote API expects it: a single `cmdb_config_item` envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigItemPayload {
    pub cmdb_config_item: ConfigItemFields,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigItemFields {
    pub name: String,
    pub ci_type_id: String,
    pub description: String,
    pub asset_tag: String,
    /// Caller-supplied structured attributes passed through verbatim,
    /// e.g. `file_imported_from_<type id>` provenance tags.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub level_field_attributes: BTreeMap<String, String>,
}

/// Association payload: the target ids ride in `type_id`, the source id is
/// part of the URL.
#[derive(Debug, Clone, Serialize)]
pub struct AssociatePayload {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub type_id: Vec<DisplayId>,
    pub relationship_type_id: String,
    pub relationship_type: &'static str,
}

impl AssociatePayload {
    pub fn forward(target_id: DisplayId, relationship_type_id: impl Into<String>) -> Self {
        Self {
            kind: "config_items",
            type_id: vec![target_id],
            relationship_type_id: relationship_type_id.into(),
            relationship_type: "forward_relationship",
        }
    }
}
