// HTTP client for the docsync server API.
//
// Routes:
//   GET    /api/editor/documents        list
//   POST   /api/editor/documents        create
//   GET    /api/editor/documents/{id}   fetch
//   PUT    /api/editor/documents/{id}   partial update
//   DELETE /api/editor/documents/{id}   delete

use std::time::Duration;

use docsync_common::patch::SavePatch;
use docsync_common::types::{CreatedDocument, Document};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use super::{DocumentStore, StoreError};

const DOCUMENTS_PATH: &str = "api/editor/documents";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpStore {
    /// Build a client for the server at `base_url` (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(base_url, client)
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(base_url)?;
        // `Url::join` replaces the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn documents_url(&self) -> Result<Url, StoreError> {
        self.base_url.join(DOCUMENTS_PATH).map_err(invalid_url)
    }

    fn document_url(&self, id: Uuid) -> Result<Url, StoreError> {
        self.base_url.join(&format!("{DOCUMENTS_PATH}/{id}")).map_err(invalid_url)
    }
}

impl DocumentStore for HttpStore {
    async fn fetch_document(&self, id: Uuid) -> Result<Document, StoreError> {
        let response =
            self.client.get(self.document_url(id)?).send().await.map_err(transport)?;
        decode(check_status(response, Some(id)).await?).await
    }

    async fn save_document(&self, patch: &SavePatch) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.document_url(patch.id)?)
            .json(patch)
            .send()
            .await
            .map_err(transport)?;
        check_status(response, Some(patch.id)).await?;
        Ok(())
    }

    async fn create_document(&self) -> Result<CreatedDocument, StoreError> {
        let response = self.client.post(self.documents_url()?).send().await.map_err(transport)?;
        decode(check_status(response, None).await?).await
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError> {
        let response =
            self.client.delete(self.document_url(id)?).send().await.map_err(transport)?;
        check_status(response, Some(id)).await?;
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<Document>, StoreError> {
        let response = self.client.get(self.documents_url()?).send().await.map_err(transport)?;
        decode(check_status(response, None).await?).await
    }
}

async fn check_status(response: Response, id: Option<Uuid>) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if let (StatusCode::NOT_FOUND, Some(id)) = (status, id) {
        return Err(StoreError::NotFound(id));
    }

    let body = response.text().await.unwrap_or_default();
    let message = envelope_message(&body).unwrap_or(body);
    Err(StoreError::Server { status: status.as_u16(), message })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    response.json::<T>().await.map_err(|error| StoreError::Decode { message: error.to_string() })
}

/// Extract `error.message` from the server's error envelope.
fn envelope_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("error")?.get("message")?.as_str().map(ToOwned::to_owned)
}

fn transport(error: reqwest::Error) -> StoreError {
    StoreError::Transport { message: error.to_string() }
}

fn invalid_url(error: url::ParseError) -> StoreError {
    StoreError::Transport { message: format!("invalid request url: {error}") }
}
