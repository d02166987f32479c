//! HTTP binding of [`CrmHost`] for a Zoho-style REST surface.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::PageLoad,
    error::ApiError,
    protocol::{
        Ack, FileAttachment, FunctionExecuteRequest, Record, RecordEnvelope, UpdateRecordRequest,
    },
};
use thiserror::Error;
use tracing::debug;
use url::Url;
use widget_core::CrmHost;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("invalid host url '{0}'")]
    InvalidBaseUrl(String),
    #[error("request to CRM host failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("CRM host returned {status}: {error}")]
    Api { status: u16, error: ApiError },
    #[error("CRM host returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("CRM host returned no {module} record for id {id}")]
    EmptyRecord { module: String, id: String },
    #[error("CRM host rejected the request: {code} {message}")]
    Rejected { code: String, message: String },
}

/// A CRM host reached over HTTP, bound to the record the widget was
/// opened on (the blueprint target).
pub struct HttpCrmHost {
    http: Client,
    base_url: Url,
    binding: PageLoad,
}

impl HttpCrmHost {
    pub fn new(base_url: &str, binding: PageLoad) -> Result<Self, HostError> {
        let base_url =
            Url::parse(base_url).map_err(|_| HostError::InvalidBaseUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(HostError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            binding,
        })
    }

    pub fn binding(&self) -> &PageLoad {
        &self.binding
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, HostError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HostError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, HostError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiError>(&body) {
            Ok(error) => Err(HostError::Api {
                status: status.as_u16(),
                error,
            }),
            Err(_) => Err(HostError::Status {
                status: status.as_u16(),
                body,
            }),
        }
    }

    async fn send_ack(&self, request: RequestBuilder) -> Result<Ack, HostError> {
        let ack: Ack = self.send(request).await?;
        if !ack.is_success() {
            return Err(HostError::Rejected {
                code: ack.code,
                message: ack.message,
            });
        }
        debug!(message = %ack.message, "host acknowledged");
        Ok(ack)
    }
}

#[async_trait]
impl CrmHost for HttpCrmHost {
    async fn fetch_record(&self, module: &str, id: &str) -> Result<Record> {
        let url = self.endpoint(&["crm", module, id])?;
        let envelope: RecordEnvelope = self
            .send(self.http.get(url))
            .await
            .with_context(|| format!("get {module} record {id}"))?;
        let record = envelope
            .data
            .into_iter()
            .next()
            .ok_or_else(|| HostError::EmptyRecord {
                module: module.to_string(),
                id: id.to_string(),
            })?;
        Ok(record)
    }

    async fn update_record(&self, module: &str, id: &str, fields: Record) -> Result<Ack> {
        let url = self.endpoint(&["crm", module, id])?;
        let body = UpdateRecordRequest { data: vec![fields] };
        let ack = self
            .send_ack(self.http.put(url).json(&body))
            .await
            .with_context(|| format!("update {module} record {id}"))?;
        Ok(ack)
    }

    async fn attach_file(
        &self,
        module: &str,
        id: &str,
        filename: &str,
        base64_payload: &str,
    ) -> Result<Ack> {
        let url = self.endpoint(&["crm", module, id, "attachments"])?;
        let body = FileAttachment {
            name: filename.to_string(),
            content: base64_payload.to_string(),
        };
        let ack = self
            .send_ack(self.http.post(url).json(&body))
            .await
            .with_context(|| format!("attach '{filename}' to {module} record {id}"))?;
        Ok(ack)
    }

    async fn invoke_function(&self, name: &str, json_args: &str) -> Result<Value> {
        let url = self.endpoint(&["functions", name, "execute"])?;
        let body = FunctionExecuteRequest {
            arguments: json_args.to_string(),
        };
        let response: Value = self
            .send(self.http.post(url).json(&body))
            .await
            .with_context(|| format!("execute function {name}"))?;
        Ok(response)
    }

    async fn advance_workflow(&self) -> Result<Ack> {
        let module = self.binding.entity.as_str();
        let id = self.binding.entity_id.as_str();
        let url = self.endpoint(&["blueprint", module, id, "proceed"])?;
        let ack = self
            .send_ack(self.http.post(url))
            .await
            .with_context(|| format!("proceed blueprint of {module} record {id}"))?;
        Ok(ack)
    }

    async fn close_widget(&self) -> Result<()> {
        let url = self.endpoint(&["ui", "popup", "close-reload"])?;
        self.send_ack(self.http.post(url))
            .await
            .context("close popup")?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
