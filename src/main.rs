//! Submits a JSON record to the content API through its form schema.
//!
//! Usage: `travel-portal-admin <schema.json> <record.json> [slot=path ...]`
//!
//! The record is hydrated exactly as the edit screen would load it; an `_id`
//! (or the schema's id field) makes it an update, otherwise a create.
//! `slot=path` arguments attach local files to document-level slots.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use dotenvy::dotenv;

use travel_portal_admin::domain::document::{AttachmentTarget, PendingFile};
use travel_portal_admin::domain::schema::FormSchema;
use travel_portal_admin::forms::store::NestedFormStore;
use travel_portal_admin::models::config::ClientConfig;
use travel_portal_admin::repository::HttpRepository;
use travel_portal_admin::services::editor::submit;

fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let [schema_path, record_path, attachments @ ..] = args else {
        return Err("usage: travel-portal-admin <schema.json> <record.json> [slot=path ...]".into());
    };

    let app_env = env::var("APP_ENV").unwrap_or_else(|_| "local".into());
    let client_config = ClientConfig::load(&app_env)?;
    let repo = HttpRepository::new(&client_config)?;

    let schema = Arc::new(FormSchema::load(schema_path)?);
    let record: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(record_path)?)?;
    let mut store = NestedFormStore::hydrate(schema, &record)?;

    for attachment in attachments {
        let Some((slot, path)) = attachment.split_once('=') else {
            return Err(format!("expected slot=path, got `{attachment}`").into());
        };
        store.attach_file(&AttachmentTarget::document(slot), PendingFile::from_path(path)?)?;
    }

    let response = submit(&repo, &store)?;
    // Nothing renders previews here; they are simply dropped.
    store.discard();
    log::info!("Content API response: {response}");
    Ok(())
}

fn main() -> ExitCode {
    dotenv().ok(); // Load .env file
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
