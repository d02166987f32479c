//! The widget as the host sees it: one session bound to one record.

use shared::domain::PageLoad;
use tracing::warn;

use crate::{
    file_cache::{CachedAttachment, FileCache, FileSelection, SelectedFile},
    form::FormState,
    host::CrmHost,
    loader::{self, SessionContext},
    pipeline::{SubmissionOutcome, SubmissionPipeline, SubmissionState},
    WidgetOptions,
};

/// One widget session on one record. Handlers take `&mut self`, so at most
/// one of them runs at a time.
pub struct FormWidget<H: CrmHost> {
    host: H,
    options: WidgetOptions,
    form: FormState,
    cache: FileCache,
    pipeline: SubmissionPipeline,
    session: Option<SessionContext>,
    page_loaded: bool,
}

impl<H: CrmHost> FormWidget<H> {
    pub fn new(host: H, options: WidgetOptions) -> Self {
        let form = FormState::new(options.submit_label.clone());
        Self {
            host,
            options,
            form,
            cache: FileCache::new(),
            pipeline: SubmissionPipeline::new(),
            session: None,
            page_loaded: false,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    pub fn session(&self) -> Option<&SessionContext> {
        self.session.as_ref()
    }

    pub fn cached_attachment(&self) -> Option<&CachedAttachment> {
        self.cache.attachment()
    }

    pub fn state(&self) -> SubmissionState {
        self.pipeline.state()
    }

    pub fn is_closed(&self) -> bool {
        self.pipeline.state() == SubmissionState::Succeeded
    }

    /// Handles the host page-load event. Only the first event is honored.
    pub async fn on_page_load(&mut self, event: &PageLoad) {
        if self.page_loaded {
            warn!(entity_id = %event.entity_id, "duplicate page load event ignored");
            return;
        }
        self.page_loaded = true;
        self.session = loader::load(&self.host, &self.options, event, &mut self.form).await;
    }

    pub async fn on_file_selected(&mut self, selection: Option<&dyn SelectedFile>) -> FileSelection {
        self.cache
            .on_file_selected(selection, &mut self.form, self.options.progress_min_display)
            .await
    }

    pub async fn on_submit(&mut self) -> SubmissionOutcome {
        self.pipeline
            .submit(
                &self.host,
                &self.options,
                self.session.as_ref(),
                &self.cache,
                &mut self.form,
            )
            .await
    }
}

#[cfg(test)]
#[path = "tests/widget_tests.rs"]
mod tests;
