//! Form widget core: record prefill, attachment staging and the submission
//! pipeline that writes back to a CRM host and advances its blueprint.

use std::time::Duration;

pub mod file_cache;
pub mod form;
pub mod host;
pub mod loader;
pub mod pipeline;
pub mod widget;

pub use file_cache::{
    CachedAttachment, FileCache, FileCacheError, FileSelection, LocalFile, MemoryFile,
    SelectedFile,
};
pub use form::{FieldId, FormState, ProgressIndicator, SubmitControl};
pub use host::CrmHost;
pub use loader::SessionContext;
pub use pipeline::{
    PipelineStep, SubmissionOutcome, SubmissionState, SubmitError, ValidationError,
};
pub use widget::FormWidget;

/// Hard ceiling for a staged attachment (10 MiB).
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

pub const DEFAULT_PRIMARY_MODULE: &str = "Applications1";
pub const DEFAULT_SECONDARY_MODULE: &str = "Accounts";
pub const DEFAULT_ACCOUNT_FUNCTION: &str = "ta_ctdr_submit_to_auth_update_account";
pub const DEFAULT_SUBMIT_LABEL: &str = "Submit";
pub const DEFAULT_SUBMITTING_LABEL: &str = "Submitting...";
pub const DEFAULT_PROGRESS_MIN_DISPLAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetOptions {
    pub primary_module: String,
    pub secondary_module: String,
    pub account_function: String,
    pub submit_label: String,
    pub submitting_label: String,
    /// How long the progress indicator stays up after a file was staged.
    pub progress_min_display: Duration,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            primary_module: DEFAULT_PRIMARY_MODULE.into(),
            secondary_module: DEFAULT_SECONDARY_MODULE.into(),
            account_function: DEFAULT_ACCOUNT_FUNCTION.into(),
            submit_label: DEFAULT_SUBMIT_LABEL.into(),
            submitting_label: DEFAULT_SUBMITTING_LABEL.into(),
            progress_min_display: DEFAULT_PROGRESS_MIN_DISPLAY,
        }
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
