use std::{collections::HashMap, sync::Arc};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::{EntityId, PageLoad},
    protocol::{Ack, Record},
};
use tokio::sync::Mutex;

use crate::{host::CrmHost, WidgetOptions};

pub const APP_ID: &str = "5725767000001234001";
pub const ACCOUNT_ID: &str = "5725767000000987001";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOp {
    FetchRecord,
    UpdateRecord,
    InvokeFunction,
    AttachFile,
    AdvanceWorkflow,
    CloseWidget,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    FetchRecord {
        module: String,
        id: String,
    },
    UpdateRecord {
        module: String,
        id: String,
        fields: Record,
    },
    InvokeFunction {
        name: String,
        json_args: String,
    },
    AttachFile {
        module: String,
        id: String,
        filename: String,
        payload: String,
    },
    AdvanceWorkflow,
    CloseWidget,
}

impl HostCall {
    pub fn op(&self) -> HostOp {
        match self {
            HostCall::FetchRecord { .. } => HostOp::FetchRecord,
            HostCall::UpdateRecord { .. } => HostOp::UpdateRecord,
            HostCall::InvokeFunction { .. } => HostOp::InvokeFunction,
            HostCall::AttachFile { .. } => HostOp::AttachFile,
            HostCall::AdvanceWorkflow => HostOp::AdvanceWorkflow,
            HostCall::CloseWidget => HostOp::CloseWidget,
        }
    }
}

/// In-memory host that records every call in order.
#[derive(Default)]
pub struct RecordingHost {
    records: HashMap<(String, String), Record>,
    calls: Arc<Mutex<Vec<HostCall>>>,
    fail_on: Vec<HostOp>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, module: &str, record: Value) -> Self {
        let Value::Object(record) = record else {
            panic!("record fixture must be a JSON object");
        };
        let id = record
            .get("id")
            .and_then(Value::as_str)
            .expect("record fixture needs an id")
            .to_string();
        self.records.insert((module.to_string(), id), record);
        self
    }

    pub fn failing_on(mut self, op: HostOp) -> Self {
        self.fail_on.push(op);
        self
    }

    pub async fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().await.clone()
    }

    pub async fn ops(&self) -> Vec<HostOp> {
        self.calls.lock().await.iter().map(HostCall::op).collect()
    }

    /// Calls other than record fetches, i.e. everything a submit can do.
    pub async fn submit_ops(&self) -> Vec<HostOp> {
        self.ops()
            .await
            .into_iter()
            .filter(|op| *op != HostOp::FetchRecord)
            .collect()
    }

    async fn record_call(&self, call: HostCall) -> Result<()> {
        let op = call.op();
        self.calls.lock().await.push(call);
        if self.fail_on.contains(&op) {
            return Err(anyhow!("host rejected {op:?}"));
        }
        Ok(())
    }
}

#[async_trait]
impl CrmHost for RecordingHost {
    async fn fetch_record(&self, module: &str, id: &str) -> Result<Record> {
        self.record_call(HostCall::FetchRecord {
            module: module.to_string(),
            id: id.to_string(),
        })
        .await?;
        self.records
            .get(&(module.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("record {module}/{id} not found"))
    }

    async fn update_record(&self, module: &str, id: &str, fields: Record) -> Result<Ack> {
        self.record_call(HostCall::UpdateRecord {
            module: module.to_string(),
            id: id.to_string(),
            fields,
        })
        .await?;
        Ok(Ack::success("record updated"))
    }

    async fn attach_file(
        &self,
        module: &str,
        id: &str,
        filename: &str,
        base64_payload: &str,
    ) -> Result<Ack> {
        self.record_call(HostCall::AttachFile {
            module: module.to_string(),
            id: id.to_string(),
            filename: filename.to_string(),
            payload: base64_payload.to_string(),
        })
        .await?;
        Ok(Ack::success("attachment uploaded"))
    }

    async fn invoke_function(&self, name: &str, json_args: &str) -> Result<Value> {
        self.record_call(HostCall::InvokeFunction {
            name: name.to_string(),
            json_args: json_args.to_string(),
        })
        .await?;
        Ok(json!({ "code": "success", "details": { "output": "account updated" } }))
    }

    async fn advance_workflow(&self) -> Result<Ack> {
        self.record_call(HostCall::AdvanceWorkflow).await?;
        Ok(Ack::success("blueprint proceeded"))
    }

    async fn close_widget(&self) -> Result<()> {
        self.record_call(HostCall::CloseWidget).await
    }
}

pub fn options() -> WidgetOptions {
    WidgetOptions {
        progress_min_display: std::time::Duration::ZERO,
        ..WidgetOptions::default()
    }
}

pub fn page_load(entity_id: &str) -> PageLoad {
    PageLoad {
        entity: "Applications1".to_string(),
        entity_id: EntityId::new(entity_id),
    }
}

pub fn application(account: Option<Value>) -> Value {
    let mut record = json!({
        "id": APP_ID,
        "Reference_Number": null,
        "Application_Date": null,
    });
    if let Some(account) = account {
        record["Account_Name"] = account;
    }
    record
}

pub fn account(legal_name: Option<&str>, trn: Option<&str>) -> Value {
    let mut record = json!({ "id": ACCOUNT_ID, "Account_Name": "Acme Free Zone LLC" });
    if let Some(legal_name) = legal_name {
        record["Legal_Name_of_Taxable_Person"] = json!(legal_name);
    }
    if let Some(trn) = trn {
        record["Corporate_Tax_TRN"] = json!(trn);
    }
    record
}

/// Application linked to an account carrying legal name and TRN.
pub fn acme_host() -> RecordingHost {
    RecordingHost::new()
        .with_record(
            "Applications1",
            application(Some(json!({ "id": ACCOUNT_ID, "name": "Acme Display" }))),
        )
        .with_record(
            "Accounts",
            account(Some("Acme FZ"), Some("100123456700003")),
        )
}
