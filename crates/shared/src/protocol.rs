use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::{AccountId, AppId};

/// An opaque CRM record as returned by the host: field API name to value.
pub type Record = Map<String, Value>;

pub const ACK_SUCCESS: &str = "SUCCESS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordEnvelope {
    #[serde(default)]
    pub data: Vec<Record>,
}

/// Value of a lookup field pointing at another record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    #[serde(
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
}

/// The fields of an application record this widget reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: AppId,
    #[serde(
        rename = "Account_Name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub account: Option<RecordRef>,
}

impl ApplicationRecord {
    /// Linked account id, if the lookup is set to a non-empty id. A
    /// whitespace-only id still counts as a link.
    pub fn account_id(&self) -> Option<AccountId> {
        self.account
            .as_ref()
            .and_then(|account| account.id.as_deref())
            .filter(|id| !id.is_empty())
            .map(AccountId::new)
    }

    pub fn account_display_name(&self) -> Option<&str> {
        self.account
            .as_ref()
            .and_then(|account| account.name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

/// The fields of an account record this widget reads. Each attribute is
/// read on its own, so an odd value in one never hides the other.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(
        rename = "Legal_Name_of_Taxable_Person",
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub legal_name: Option<String>,
    #[serde(
        rename = "Corporate_Tax_TRN",
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub corporate_tax_trn: Option<String>,
}

/// Text of a scalar attribute. Numbers and booleans are rendered as their
/// JSON text; null, arrays and objects read as absent.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

/// Field values written back to the application on submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationUpdate {
    #[serde(rename = "Reference_Number")]
    pub reference_number: String,
    #[serde(rename = "Legal_Name_of_Taxable_Person")]
    pub legal_taxable_person: String,
    #[serde(rename = "Tax_Registration_Number_TRN")]
    pub tax_registration_number: String,
    #[serde(rename = "Application_Date")]
    pub application_date: String,
}

impl ApplicationUpdate {
    pub fn into_record(self) -> Record {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            _ => Record::new(),
        }
    }
}

/// Argument bundle of the account update function, sent as a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdateArguments {
    pub account_id: AccountId,
    pub legal_taxable_person: String,
    pub corporate_tax_trn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecordRequest {
    pub data: Vec<Record>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionExecuteRequest {
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl Ack {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            code: ACK_SUCCESS.to_string(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ACK_SUCCESS
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
