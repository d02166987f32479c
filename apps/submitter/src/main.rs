use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use crm_client::HttpCrmHost;
use shared::domain::{EntityId, PageLoad};
use tracing::error;
use tracing_subscriber::EnvFilter;
use widget_core::{
    FieldId, FileSelection, FormWidget, LocalFile, SelectedFile, SubmissionOutcome,
};

mod config;

use config::load_settings;

/// Opens the submission widget on one application record, fills it and
/// submits it.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    host_url: Option<String>,
    #[arg(long)]
    entity_id: String,
    #[arg(long)]
    reference_number: Option<String>,
    #[arg(long)]
    application_date: Option<String>,
    /// Overrides the legal name prefilled from the account.
    #[arg(long)]
    taxable_person: Option<String>,
    /// Overrides the TRN prefilled from the account.
    #[arg(long)]
    tax_registration_number: Option<String>,
    #[arg(long)]
    attachment: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(host_url) = args.host_url {
        settings.host_url = host_url;
    }

    let event = PageLoad {
        entity: settings.widget.primary_module.clone(),
        entity_id: EntityId::new(args.entity_id),
    };
    let host = HttpCrmHost::new(&settings.host_url, event.clone())?;
    let mut widget = FormWidget::new(host, settings.widget);

    widget.on_page_load(&event).await;
    println!(
        "Prefilled: taxable person={:?} trn={:?}",
        widget.form().value(FieldId::TaxablePerson),
        widget.form().value(FieldId::TaxRegistrationNumber)
    );

    let inputs = [
        (FieldId::ReferenceNumber, args.reference_number),
        (FieldId::ApplicationDate, args.application_date),
        (FieldId::TaxablePerson, args.taxable_person),
        (FieldId::TaxRegistrationNumber, args.tax_registration_number),
    ];
    for (field, value) in inputs {
        if let Some(value) = value {
            widget.form_mut().set_value(field, value);
        }
    }

    if let Some(path) = args.attachment {
        match LocalFile::open(&path).await {
            Ok(file) => {
                let selection = widget.on_file_selected(Some(&file as &dyn SelectedFile)).await;
                if let FileSelection::Rejected(err) = selection {
                    println!("Attachment not staged: {err}");
                }
            }
            Err(err) => error!(path = %path.display(), "cannot open attachment: {err:#}"),
        }
    }

    match widget.on_submit().await {
        SubmissionOutcome::Succeeded => {
            if let Some(session) = widget.session() {
                println!("Submitted application {}", session.app_id);
            }
            Ok(())
        }
        SubmissionOutcome::Rejected(errors) => {
            for failure in &errors {
                println!("{}: {}", failure.field.as_str(), failure.message);
            }
            bail!("submission blocked by {} validation error(s)", errors.len())
        }
        SubmissionOutcome::Failed(err) => bail!("submission failed at {}: {err}", err.step()),
        SubmissionOutcome::Ignored => bail!("submission ignored"),
    }
}
