//! The CRM host as seen from inside the widget.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use shared::protocol::{Ack, Record};

/// Remote operations the widget needs from its CRM host. Implementations
/// are opaque; the widget never retries and never assumes idempotency.
#[async_trait]
pub trait CrmHost: Send + Sync {
    async fn fetch_record(&self, module: &str, id: &str) -> Result<Record>;
    async fn update_record(&self, module: &str, id: &str, fields: Record) -> Result<Ack>;
    async fn attach_file(
        &self,
        module: &str,
        id: &str,
        filename: &str,
        base64_payload: &str,
    ) -> Result<Ack>;
    async fn invoke_function(&self, name: &str, json_args: &str) -> Result<Value>;
    /// Proceed the blueprint of the record the widget was opened on.
    async fn advance_workflow(&self) -> Result<Ack>;
    /// Tear down the widget and reload the host view.
    async fn close_widget(&self) -> Result<()>;
}

#[async_trait]
impl<T> CrmHost for std::sync::Arc<T>
where
    T: CrmHost + ?Sized,
{
    async fn fetch_record(&self, module: &str, id: &str) -> Result<Record> {
        (**self).fetch_record(module, id).await
    }

    async fn update_record(&self, module: &str, id: &str, fields: Record) -> Result<Ack> {
        (**self).update_record(module, id, fields).await
    }

    async fn attach_file(
        &self,
        module: &str,
        id: &str,
        filename: &str,
        base64_payload: &str,
    ) -> Result<Ack> {
        (**self)
            .attach_file(module, id, filename, base64_payload)
            .await
    }

    async fn invoke_function(&self, name: &str, json_args: &str) -> Result<Value> {
        (**self).invoke_function(name, json_args).await
    }

    async fn advance_workflow(&self) -> Result<Ack> {
        (**self).advance_workflow().await
    }

    async fn close_widget(&self) -> Result<()> {
        (**self).close_widget().await
    }
}
