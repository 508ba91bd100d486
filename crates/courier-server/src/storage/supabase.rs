use super::{check_name, AttachmentStore};
use bytes::Bytes;
use courier_core::attachment::StoredFile;
use courier_core::config::SupabaseConfig;
use courier_core::{CourierError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

const PLACEHOLDER: &str = ".emptyFolderPlaceholder";

/// Supabase Storage bucket over its REST API.
pub struct SupabaseAttachmentStore {
    client: reqwest::Client,
    url: String,
    key: String,
    bucket: String,
}

#[derive(Deserialize)]
struct ListedObject {
    name: String,
}

fn storage_err(e: reqwest::Error) -> CourierError {
    CourierError::Storage(e.to_string())
}

impl SupabaseAttachmentStore {
    pub fn new(client: reqwest::Client, cfg: &SupabaseConfig) -> Result<Self> {
        let (Some(url), Some(key)) = (cfg.url.as_ref(), cfg.key.as_ref()) else {
            return Err(CourierError::Config(
                "supabase storage needs url and key".into(),
            ));
        };
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            key: key.clone(),
            bucket: cfg.bucket.clone(),
        })
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.url, self.bucket, name)
    }

    pub fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.url, self.bucket, name
        )
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.key).bearer_auth(&self.key)
    }
}

/// Storage answers a missing object with 404, or with 400 and a
/// `not_found` body on older deployments.
fn is_not_found(status: StatusCode, body: &str) -> bool {
    status == StatusCode::NOT_FOUND
        || (status == StatusCode::BAD_REQUEST
            && (body.contains("not_found") || body.contains("Object not found")))
}

#[async_trait::async_trait]
impl AttachmentStore for SupabaseAttachmentStore {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn put(&self, name: &str, content_type: &str, data: Bytes) -> Result<String> {
        check_name(name)?;
        let resp = self
            .authed(self.client.post(self.object_url(name)))
            .header(CONTENT_TYPE, content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "true")
            .body(data)
            .send()
            .await
            .map_err(storage_err)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CourierError::Storage(format!(
                "upload of {name} failed: HTTP {status}: {text}"
            )));
        }
        Ok(self.public_url(name))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        check_name(name)?;
        let resp = self
            .authed(self.client.delete(self.object_url(name)))
            .send()
            .await
            .map_err(storage_err)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        if is_not_found(status, &text) {
            return Err(CourierError::AttachmentNotFound(name.to_string()));
        }
        Err(CourierError::Storage(format!(
            "delete of {name} failed: HTTP {status}: {text}"
        )))
    }

    async fn list(&self) -> Result<Vec<StoredFile>> {
        let resp = self
            .authed(self.client.post(format!(
                "{}/storage/v1/object/list/{}",
                self.url, self.bucket
            )))
            .json(&json!({
                "prefix": "",
                "limit": 1000,
                "offset": 0,
                "sortBy": { "column": "name", "order": "asc" },
            }))
            .send()
            .await
            .map_err(storage_err)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CourierError::Storage(format!(
                "list failed: HTTP {status}: {text}"
            )));
        }
        let objects: Vec<ListedObject> = resp.json().await.map_err(storage_err)?;
        Ok(objects
            .into_iter()
            .filter(|o| o.name != PLACEHOLDER)
            .map(|o| StoredFile {
                url: self.public_url(&o.name),
                name: o.name,
            })
            .collect())
    }
}
