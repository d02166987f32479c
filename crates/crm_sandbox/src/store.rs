use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use shared::{
    error::ApiError,
    protocol::{AccountUpdateArguments, Record},
};
use uuid::Uuid;

pub const APPLICATIONS_MODULE: &str = "Applications1";
pub const ACCOUNTS_MODULE: &str = "Accounts";
pub const ACCOUNT_UPDATE_FUNCTION: &str = "ta_ctdr_submit_to_auth_update_account";

pub const DEMO_APPLICATION_ID: &str = "5725767000001234001";
pub const DEMO_ACCOUNT_ID: &str = "5725767000000987001";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxCall {
    Fetch { module: String, id: String },
    Update { module: String, id: String },
    Execute { function: String },
    Attach { module: String, id: String },
    Proceed { module: String, id: String },
    CloseReload,
}

#[derive(Debug, Clone)]
pub struct StoredAttachment {
    pub attachment_id: Uuid,
    pub module: String,
    pub record_id: String,
    pub file_name: String,
    pub size_bytes: usize,
    pub content: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// In-memory CRM data: records per module plus everything the widget does
/// to them.
#[derive(Debug, Clone, Default)]
pub struct SandboxStore {
    records: HashMap<String, HashMap<String, Record>>,
    attachments: Vec<StoredAttachment>,
    blueprint_transitions: HashMap<(String, String), u32>,
    close_reloads: u32,
    calls: Vec<SandboxCall>,
}

impl SandboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// One application linked to one account, ready for a submission.
    pub fn demo() -> Self {
        let mut store = Self::new();
        store.insert(
            APPLICATIONS_MODULE,
            object(json!({
                "id": DEMO_APPLICATION_ID,
                "Name": "CT Deregistration - Acme",
                "Account_Name": { "id": DEMO_ACCOUNT_ID, "name": "Acme Free Zone LLC" },
                "Reference_Number": null,
                "Application_Date": null,
            })),
        );
        store.insert(
            ACCOUNTS_MODULE,
            object(json!({
                "id": DEMO_ACCOUNT_ID,
                "Account_Name": "Acme Free Zone LLC",
                "Legal_Name_of_Taxable_Person": "Acme FZ",
                "Corporate_Tax_TRN": "100123456700003",
            })),
        );
        store
    }

    /// Loads records from `{"<module>": [{"id": ..., ...}, ...]}`.
    pub fn from_fixture(raw: &str) -> anyhow::Result<Self> {
        let modules: HashMap<String, Vec<Record>> = serde_json::from_str(raw)?;
        let mut store = Self::new();
        for (module, records) in modules {
            for record in records {
                if record_id(&record).is_none() {
                    anyhow::bail!("fixture record in module '{module}' has no string id");
                }
                store.insert(&module, record);
            }
        }
        Ok(store)
    }

    pub fn insert(&mut self, module: &str, record: Record) {
        let Some(id) = record_id(&record) else {
            return;
        };
        self.records
            .entry(module.to_string())
            .or_default()
            .insert(id, record);
    }

    pub fn record(&self, module: &str, id: &str) -> Option<&Record> {
        self.records.get(module).and_then(|records| records.get(id))
    }

    pub fn calls(&self) -> &[SandboxCall] {
        &self.calls
    }

    pub fn attachments(&self) -> &[StoredAttachment] {
        &self.attachments
    }

    pub fn blueprint_transitions(&self, module: &str, id: &str) -> u32 {
        self.blueprint_transitions
            .get(&(module.to_string(), id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn close_reloads(&self) -> u32 {
        self.close_reloads
    }

    pub fn fetch(&mut self, module: &str, id: &str) -> Result<Record, ApiError> {
        self.calls.push(SandboxCall::Fetch {
            module: module.to_string(),
            id: id.to_string(),
        });
        self.record(module, id)
            .cloned()
            .ok_or_else(|| missing_record(module, id))
    }

    /// Merges `fields` into an existing record; `id` cannot be rewritten.
    pub fn update(&mut self, module: &str, id: &str, fields: Record) -> Result<(), ApiError> {
        self.calls.push(SandboxCall::Update {
            module: module.to_string(),
            id: id.to_string(),
        });
        let record = self
            .records
            .get_mut(module)
            .and_then(|records| records.get_mut(id))
            .ok_or_else(|| missing_record(module, id))?;
        for (key, value) in fields {
            if key != "id" {
                record.insert(key, value);
            }
        }
        Ok(())
    }

    pub fn attach(
        &mut self,
        module: &str,
        id: &str,
        file_name: &str,
        content_b64: &str,
    ) -> Result<Uuid, ApiError> {
        self.calls.push(SandboxCall::Attach {
            module: module.to_string(),
            id: id.to_string(),
        });
        if self.record(module, id).is_none() {
            return Err(missing_record(module, id));
        }
        if file_name.trim().is_empty() {
            return Err(ApiError::validation("attachment name must not be empty"));
        }
        let content = STANDARD
            .decode(content_b64)
            .map_err(|e| ApiError::validation(format!("attachment content is not base64: {e}")))?;
        let attachment_id = Uuid::new_v4();
        self.attachments.push(StoredAttachment {
            attachment_id,
            module: module.to_string(),
            record_id: id.to_string(),
            file_name: file_name.to_string(),
            size_bytes: content.len(),
            content,
            created_at: Utc::now(),
        });
        Ok(attachment_id)
    }

    pub fn execute(&mut self, function: &str, arguments: &str) -> Result<Value, ApiError> {
        self.calls.push(SandboxCall::Execute {
            function: function.to_string(),
        });
        match function {
            ACCOUNT_UPDATE_FUNCTION => self.update_account_from_submission(arguments),
            _ => Err(ApiError::not_found(format!("function '{function}' not found"))),
        }
    }

    pub fn proceed(&mut self, module: &str, id: &str) -> Result<u32, ApiError> {
        self.calls.push(SandboxCall::Proceed {
            module: module.to_string(),
            id: id.to_string(),
        });
        if self.record(module, id).is_none() {
            return Err(missing_record(module, id));
        }
        let transitions = self
            .blueprint_transitions
            .entry((module.to_string(), id.to_string()))
            .or_insert(0);
        *transitions += 1;
        Ok(*transitions)
    }

    pub fn close_reload(&mut self) {
        self.calls.push(SandboxCall::CloseReload);
        self.close_reloads += 1;
    }

    fn update_account_from_submission(&mut self, arguments: &str) -> Result<Value, ApiError> {
        let args: AccountUpdateArguments = serde_json::from_str(arguments)
            .map_err(|e| ApiError::validation(format!("invalid function arguments: {e}")))?;
        let account_id = args.account_id.as_str();
        let account = self
            .records
            .get_mut(ACCOUNTS_MODULE)
            .and_then(|records| records.get_mut(account_id))
            .ok_or_else(|| missing_record(ACCOUNTS_MODULE, account_id))?;
        account.insert(
            "Legal_Name_of_Taxable_Person".to_string(),
            Value::String(args.legal_taxable_person),
        );
        account.insert(
            "Corporate_Tax_TRN".to_string(),
            Value::String(args.corporate_tax_trn),
        );
        Ok(json!({
            "code": "success",
            "details": { "output": "account updated", "id": account_id },
        }))
    }
}

fn record_id(record: &Record) -> Option<String> {
    record.get("id").and_then(Value::as_str).map(str::to_string)
}

fn missing_record(module: &str, id: &str) -> ApiError {
    ApiError::not_found(format!("record {module}/{id} not found"))
}

fn object(value: Value) -> Record {
    match value {
        Value::Object(record) => record,
        _ => Record::new(),
    }
}
