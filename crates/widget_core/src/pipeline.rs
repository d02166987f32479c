//! Submit handling: validate every field, then update the application,
//! run the account function, upload the staged file, proceed the blueprint
//! and close the widget, strictly in that order.
//!
//! A failing step abandons the rest of the sequence. Nothing already done is
//! undone and nothing is retried; resubmitting replays the whole sequence,
//! including steps that had already succeeded.

use std::fmt;

use shared::{
    domain::{AccountId, AppId},
    protocol::{AccountUpdateArguments, ApplicationUpdate},
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    file_cache::FileCache,
    form::{FieldId, FormState},
    host::CrmHost,
    loader::SessionContext,
    WidgetOptions,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    UpdateRecord,
    InvokeFunction,
    AttachFile,
    AdvanceWorkflow,
    CloseWidget,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStep::UpdateRecord => "update_record",
            PipelineStep::InvokeFunction => "invoke_function",
            PipelineStep::AttachFile => "attach_file",
            PipelineStep::AdvanceWorkflow => "advance_workflow",
            PipelineStep::CloseWidget => "close_widget",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: FieldId,
    pub message: &'static str,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("no cached file for upload")]
    MissingAttachment,
    #[error("failed to encode function arguments: {0}")]
    EncodeArguments(#[source] serde_json::Error),
    #[error("{step} failed: {source:#}")]
    Remote {
        step: PipelineStep,
        source: anyhow::Error,
    },
}

impl SubmitError {
    pub fn step(&self) -> PipelineStep {
        match self {
            SubmitError::MissingAttachment => PipelineStep::AttachFile,
            SubmitError::EncodeArguments(_) => PipelineStep::InvokeFunction,
            SubmitError::Remote { step, .. } => *step,
        }
    }
}

#[derive(Debug)]
pub enum SubmissionOutcome {
    /// The submit control was disabled or the widget already closed.
    Ignored,
    /// Validation failed; no host call was made.
    Rejected(Vec<ValidationError>),
    Failed(SubmitError),
    Succeeded,
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Succeeded)
    }
}

pub const REFERENCE_NUMBER_REQUIRED: &str = "Reference Number is required.";
pub const TAXABLE_PERSON_REQUIRED: &str = "Legal Name of Taxable Person is required.";
pub const TRN_REQUIRED: &str = "Tax Registration Number is required.";
pub const APPLICATION_DATE_REQUIRED: &str = "Application Date is required.";
pub const ATTACHMENT_REQUIRED: &str = "Please upload the FTA Notice of Submission.";
pub const ACCOUNT_ID_MISSING: &str = "Error: Associated Account ID is missing. Cannot proceed.";

#[derive(Debug, Clone)]
struct ValidatedSubmission {
    app_id: AppId,
    account_id: AccountId,
    update: ApplicationUpdate,
}

#[derive(Debug)]
pub struct SubmissionPipeline {
    state: SubmissionState,
}

impl Default for SubmissionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionPipeline {
    pub fn new() -> Self {
        Self {
            state: SubmissionState::Idle,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub async fn submit<H>(
        &mut self,
        host: &H,
        options: &WidgetOptions,
        session: Option<&SessionContext>,
        cache: &FileCache,
        form: &mut FormState,
    ) -> SubmissionOutcome
    where
        H: CrmHost + ?Sized,
    {
        if !matches!(self.state, SubmissionState::Idle | SubmissionState::Failed)
            || !form.submit_control().enabled
        {
            debug!(state = ?self.state, "submit ignored");
            return SubmissionOutcome::Ignored;
        }

        form.clear_errors();
        form.begin_submit(&options.submitting_label);
        self.transition(SubmissionState::Validating);

        let submission = match validate(form, session, cache) {
            Ok(submission) => submission,
            Err(errors) => {
                for failure in &errors {
                    form.show_error(failure.field, failure.message);
                }
                if errors.iter().any(|e| e.field == FieldId::SubmitButton) {
                    error!("associated account id is missing; submission blocked");
                }
                warn!(failures = errors.len(), "submission rejected by validation");
                form.end_submit(&options.submit_label);
                self.transition(SubmissionState::Idle);
                return SubmissionOutcome::Rejected(errors);
            }
        };

        self.transition(SubmissionState::Submitting);
        match run_steps(host, options, &submission, cache).await {
            Ok(()) => {
                info!(app_id = %submission.app_id, "submission completed");
                self.transition(SubmissionState::Succeeded);
                SubmissionOutcome::Succeeded
            }
            Err(err) => {
                error!(app_id = %submission.app_id, step = %err.step(), "error on final submit: {err}");
                form.end_submit(&options.submit_label);
                self.transition(SubmissionState::Failed);
                SubmissionOutcome::Failed(err)
            }
        }
    }

    fn transition(&mut self, next: SubmissionState) {
        debug!(from = ?self.state, to = ?next, "submission state");
        self.state = next;
    }
}

/// Runs every check, so the user sees all problems at once.
fn validate(
    form: &FormState,
    session: Option<&SessionContext>,
    cache: &FileCache,
) -> Result<ValidatedSubmission, Vec<ValidationError>> {
    let reference_number = form.value(FieldId::ReferenceNumber).trim();
    let taxable_person = form.value(FieldId::TaxablePerson).trim();
    let trn = form.value(FieldId::TaxRegistrationNumber).trim();
    let application_date = form.value(FieldId::ApplicationDate).trim();
    let account_id = session
        .and_then(|session| session.account_id.as_ref())
        .map(|id| id.as_str().trim())
        .filter(|id| !id.is_empty());

    let checks = [
        (
            reference_number.is_empty(),
            FieldId::ReferenceNumber,
            REFERENCE_NUMBER_REQUIRED,
        ),
        (
            taxable_person.is_empty(),
            FieldId::TaxablePerson,
            TAXABLE_PERSON_REQUIRED,
        ),
        (trn.is_empty(), FieldId::TaxRegistrationNumber, TRN_REQUIRED),
        (
            application_date.is_empty(),
            FieldId::ApplicationDate,
            APPLICATION_DATE_REQUIRED,
        ),
        (!cache.is_ready(), FieldId::Attachment, ATTACHMENT_REQUIRED),
        (
            account_id.is_none(),
            FieldId::SubmitButton,
            ACCOUNT_ID_MISSING,
        ),
    ];

    let errors: Vec<ValidationError> = checks
        .into_iter()
        .filter(|(failed, _, _)| *failed)
        .map(|(_, field, message)| ValidationError { field, message })
        .collect();

    match (session, account_id) {
        (Some(session), Some(account_id)) if errors.is_empty() => Ok(ValidatedSubmission {
            app_id: session.app_id.clone(),
            account_id: AccountId::new(account_id),
            update: ApplicationUpdate {
                reference_number: reference_number.to_string(),
                legal_taxable_person: taxable_person.to_string(),
                tax_registration_number: trn.to_string(),
                application_date: application_date.to_string(),
            },
        }),
        _ => Err(errors),
    }
}

async fn run_steps<H>(
    host: &H,
    options: &WidgetOptions,
    submission: &ValidatedSubmission,
    cache: &FileCache,
) -> Result<(), SubmitError>
where
    H: CrmHost + ?Sized,
{
    let app_id = submission.app_id.as_str();

    host.update_record(
        &options.primary_module,
        app_id,
        submission.update.clone().into_record(),
    )
    .await
    .map_err(|source| SubmitError::Remote {
        step: PipelineStep::UpdateRecord,
        source,
    })?;
    info!(app_id, "application record updated");

    let arguments = serde_json::to_string(&AccountUpdateArguments {
        account_id: submission.account_id.clone(),
        legal_taxable_person: submission.update.legal_taxable_person.clone(),
        corporate_tax_trn: submission.update.tax_registration_number.clone(),
    })
    .map_err(SubmitError::EncodeArguments)?;
    let response = host
        .invoke_function(&options.account_function, &arguments)
        .await
        .map_err(|source| SubmitError::Remote {
            step: PipelineStep::InvokeFunction,
            source,
        })?;
    info!(
        function = %options.account_function,
        account_id = %submission.account_id,
        %response,
        "account update function returned"
    );

    let attachment = cache
        .attachment()
        .filter(|attachment| !attachment.payload_b64.is_empty())
        .ok_or(SubmitError::MissingAttachment)?;
    host.attach_file(
        &options.primary_module,
        app_id,
        &attachment.filename,
        &attachment.payload_b64,
    )
    .await
    .map_err(|source| SubmitError::Remote {
        step: PipelineStep::AttachFile,
        source,
    })?;
    info!(app_id, filename = %attachment.filename, "attachment uploaded");

    host.advance_workflow()
        .await
        .map_err(|source| SubmitError::Remote {
            step: PipelineStep::AdvanceWorkflow,
            source,
        })?;
    info!(app_id, "blueprint proceeded");

    host.close_widget()
        .await
        .map_err(|source| SubmitError::Remote {
            step: PipelineStep::CloseWidget,
            source,
        })?;

    Ok(())
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
