//! Visible form state: field values, inline errors, the submit control and
//! the attachment progress indicator.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldId {
    ReferenceNumber,
    TaxablePerson,
    TaxRegistrationNumber,
    ApplicationDate,
    Attachment,
    SubmitButton,
}

impl FieldId {
    pub const ALL: [FieldId; 6] = [
        FieldId::ReferenceNumber,
        FieldId::TaxablePerson,
        FieldId::TaxRegistrationNumber,
        FieldId::ApplicationDate,
        FieldId::Attachment,
        FieldId::SubmitButton,
    ];

    /// Stable element identifier used by the host markup.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldId::ReferenceNumber => "reference-number",
            FieldId::TaxablePerson => "name-of-taxable-person",
            FieldId::TaxRegistrationNumber => "tax-registration-number",
            FieldId::ApplicationDate => "application-date",
            FieldId::Attachment => "fta-notive-of-submission",
            FieldId::SubmitButton => "submit_button_id",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitControl {
    pub enabled: bool,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressIndicator {
    pub visible: bool,
    /// Number of times the indicator was (re)started.
    pub shown: u32,
}

#[derive(Debug, Clone)]
pub struct FormState {
    values: HashMap<FieldId, String>,
    errors: BTreeMap<FieldId, String>,
    attachment_input: Option<String>,
    submit: SubmitControl,
    progress: ProgressIndicator,
}

impl FormState {
    pub fn new(submit_label: impl Into<String>) -> Self {
        Self {
            values: HashMap::new(),
            errors: BTreeMap::new(),
            attachment_input: None,
            submit: SubmitControl {
                enabled: true,
                label: submit_label.into(),
            },
            progress: ProgressIndicator::default(),
        }
    }

    pub fn value(&self, field: FieldId) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn set_value(&mut self, field: FieldId, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn show_error(&mut self, field: FieldId, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    pub fn error(&self, field: FieldId) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn errors(&self) -> impl Iterator<Item = (FieldId, &str)> {
        self.errors
            .iter()
            .map(|(field, message)| (*field, message.as_str()))
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Clears the inline error of every field, not just the one being edited.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn attachment_input(&self) -> Option<&str> {
        self.attachment_input.as_deref()
    }

    pub fn set_attachment_input(&mut self, filename: Option<String>) {
        self.attachment_input = filename;
    }

    pub fn clear_attachment_input(&mut self) {
        self.attachment_input = None;
    }

    pub fn submit_control(&self) -> &SubmitControl {
        &self.submit
    }

    pub fn begin_submit(&mut self, in_progress_label: &str) {
        self.submit.enabled = false;
        self.submit.label = in_progress_label.to_string();
    }

    pub fn end_submit(&mut self, label: &str) {
        self.submit.enabled = true;
        self.submit.label = label.to_string();
    }

    pub fn progress(&self) -> &ProgressIndicator {
        &self.progress
    }

    pub fn show_progress(&mut self) {
        self.progress.visible = true;
        self.progress.shown += 1;
    }

    pub fn hide_progress(&mut self) {
        self.progress.visible = false;
    }
}
