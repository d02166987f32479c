//! Best-effort prefill on page load.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::{AccountId, AppId, PageLoad},
    protocol::{AccountRecord, ApplicationRecord, Record},
};
use tracing::{error, info};

use crate::{
    form::{FieldId, FormState},
    host::CrmHost,
    WidgetOptions,
};

/// Identifiers established by the loader and shared with later stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub app_id: AppId,
    pub account_id: Option<AccountId>,
}

/// Fetches the application and its linked account and prefills the taxable
/// person and TRN fields. Failures are logged and never surfaced: a missing
/// application yields no session, a missing account link yields a session
/// without an account id.
pub async fn load<H>(
    host: &H,
    options: &WidgetOptions,
    event: &PageLoad,
    form: &mut FormState,
) -> Option<SessionContext>
where
    H: CrmHost + ?Sized,
{
    let application: ApplicationRecord =
        match fetch_typed(host, &options.primary_module, event.entity_id.as_str()).await {
            Ok(record) => record,
            Err(err) => {
                error!(entity_id = %event.entity_id, "failed to load application record: {err:#}");
                return None;
            }
        };

    let app_id = application.id.clone();
    let Some(account_id) = application.account_id() else {
        error!(app_id = %app_id, "application record has no linked account id; skipping account prefill");
        return Some(SessionContext {
            app_id,
            account_id: None,
        });
    };

    match fetch_typed::<H, AccountRecord>(host, &options.secondary_module, account_id.as_str())
        .await
    {
        Ok(account) => {
            let legal_name = prefill_legal_name(&account, &application);
            let trn = account.corporate_tax_trn.unwrap_or_default();
            info!(
                app_id = %app_id,
                account_id = %account_id,
                legal_name = %legal_name,
                trn = %trn,
                "prefilled taxable person from account"
            );
            form.set_value(FieldId::TaxablePerson, legal_name);
            form.set_value(FieldId::TaxRegistrationNumber, trn);
        }
        Err(err) => {
            error!(account_id = %account_id, "failed to load account record: {err:#}");
        }
    }

    Some(SessionContext {
        app_id,
        account_id: Some(account_id),
    })
}

/// Account legal name, then the lookup display name, then empty.
fn prefill_legal_name(account: &AccountRecord, application: &ApplicationRecord) -> String {
    account
        .legal_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .or_else(|| application.account_display_name())
        .unwrap_or_default()
        .to_string()
}

async fn fetch_typed<H, T>(host: &H, module: &str, id: &str) -> Result<T>
where
    H: CrmHost + ?Sized,
    T: DeserializeOwned,
{
    let record: Record = host
        .fetch_record(module, id)
        .await
        .with_context(|| format!("fetch {module} record {id}"))?;
    serde_json::from_value(Value::Object(record))
        .with_context(|| format!("malformed {module} record {id}"))
}

#[cfg(test)]
#[path = "tests/loader_tests.rs"]
mod tests;
