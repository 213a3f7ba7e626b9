use crate::catalog::config::AUTH_HEADER;
use crate::catalog::payload::CatalogPayload;
use crate::http::build_client;
use crate::models::NormalizedProduct;
use crate::settings::{AgentSettings, UploadMode};
use reqwest::{Client, header};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("missing credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),
    #[error("catalogue rejected the upload with HTTP {status}")]
    RemoteRejected { status: u16, body: Value },
    #[error("catalogue unreachable: {0}")]
    RemoteUnreachable(String),
}

impl UploadError {
    /// Human-readable detail for the activity log.
    pub fn detail(&self) -> String {
        match self {
            UploadError::RemoteRejected { body, .. } => match body {
                Value::String(text) => format!("{self}: {text}"),
                other => format!("{self}: {other}"),
            },
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    Simulated { payload: CatalogPayload },
    Success { response: Value },
}

impl UploadOutcome {
    pub fn body(&self) -> Value {
        match self {
            UploadOutcome::Simulated { payload } => {
                serde_json::to_value(payload).unwrap_or(Value::Null)
            }
            UploadOutcome::Success { response } => response.clone(),
        }
    }
}

/// Anything able to push one product to the catalogue.
pub trait Uploader: Send + Sync + 'static {
    fn submit(
        &self,
        product: NormalizedProduct,
        settings: AgentSettings,
    ) -> impl Future<Output = Result<UploadOutcome, UploadError>> + Send;
}

#[derive(Clone)]
pub struct CatalogGateway {
    http: Client,
}

impl Default for CatalogGateway {
    fn default() -> Self {
        Self::new(build_client())
    }
}

impl CatalogGateway {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    pub async fn upload(
        &self,
        product: &NormalizedProduct,
        settings: &AgentSettings,
    ) -> Result<UploadOutcome, UploadError> {
        ensure_required_fields(product)?;
        let payload = CatalogPayload::build(product, settings);

        if settings.mode == UploadMode::Simulate {
            debug!(
                target = "catalog.gateway",
                title = %payload.product_name,
                "simulated upload"
            );
            return Ok(UploadOutcome::Simulated { payload });
        }

        ensure_credentials(settings)?;
        let url = settings.endpoint();
        let response = self
            .http
            .post(url)
            .header(AUTH_HEADER, settings.api_key.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                warn!(target = "catalog.gateway", url, error = %err, "upload transport failure");
                UploadError::RemoteUnreachable(err.to_string())
            })?;

        let status = response.status();
        let body = decode_body(response).await?;
        if !status.is_success() {
            warn!(
                target = "catalog.gateway",
                status = status.as_u16(),
                "upload rejected"
            );
            return Err(UploadError::RemoteRejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(UploadOutcome::Success { response: body })
    }
}

impl Uploader for CatalogGateway {
    async fn submit(
        &self,
        product: NormalizedProduct,
        settings: AgentSettings,
    ) -> Result<UploadOutcome, UploadError> {
        self.upload(&product, &settings).await
    }
}

fn ensure_required_fields(product: &NormalizedProduct) -> Result<(), UploadError> {
    let missing: Vec<&'static str> = [
        ("title", &product.title),
        ("description", &product.description),
        ("shortDescription", &product.short_description),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(UploadError::MissingFields(missing))
    }
}

fn ensure_credentials(settings: &AgentSettings) -> Result<(), UploadError> {
    let missing: Vec<&'static str> = [
        ("apiKey", &settings.api_key),
        ("sellerId", &settings.seller_id),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(UploadError::MissingCredentials(missing))
    }
}

async fn decode_body(response: reqwest::Response) -> Result<Value, UploadError> {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains("json"))
        .unwrap_or(false);
    let text = response
        .text()
        .await
        .map_err(|err| UploadError::RemoteUnreachable(err.to_string()))?;
    if is_json {
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    } else {
        Ok(Value::String(text))
    }
}
