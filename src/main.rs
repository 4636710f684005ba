// This is the entry point of the publishing service.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (Google, Facebook, YouTube APIs)
// - `http/` = JSON routes over the core services
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Start the background reconciliation sweep
// 4. Serve the HTTP routes

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "http/http_layer.rs"]
mod http;
#[path = "infra/infra_layer.rs"]
mod infra;

mod app_config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::app_config::AppConfig;
use crate::core::accounts::AccountResolver;
use crate::core::content::Records;
use crate::core::library::MediaLibrary;
use crate::core::publishing::{PostManager, PublishOrchestrator, PublisherDirectory};
use crate::core::reconcile::StatusReconciler;
use crate::core::scheduling::ScheduleCalculator;
use crate::core::tasks::TaskRegistry;
use crate::http::{build_router, AppState};
use crate::infra::accounts::TokenDirectory;
use crate::infra::google::{
    google_auth_from_env, AccessTokenSource, AuthorizedUserAuth, GoogleDriveClient,
    SheetsRecordStore, DRIVE_SCOPE, SHEETS_SCOPE,
};
use crate::infra::publishers::HttpPublisherFactory;
use crate::infra::tasks::InMemoryTaskRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env().context("Failed to read configuration")?;

    // Transient media for publish attempts lives here.
    tokio::fs::create_dir_all(&config.upload_temp_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.upload_temp_dir))?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let google_auth = google_auth_from_env(&config.google_token_file, &[SHEETS_SCOPE, DRIVE_SCOPE])
        .await
        .context("Failed to load Google credentials")?;

    let records = Records::new(Arc::new(SheetsRecordStore::new(
        google_auth.clone(),
        config.spreadsheet_id.clone(),
    )));
    let drive = Arc::new(GoogleDriveClient::new(google_auth.clone()));

    // YouTube uploads need user credentials. The token file is the default
    // account; a service account only works for Sheets and Drive.
    let default_youtube: Arc<dyn AccessTokenSource> =
        match AuthorizedUserAuth::from_file(&config.google_token_file).await {
            Ok(auth) => Arc::new(auth),
            Err(e) => {
                tracing::warn!(
                    "No user credentials in {} ({}), YouTube falls back to the shared Google credential",
                    config.google_token_file,
                    e
                );
                google_auth.clone()
            }
        };
    let credentials = Arc::new(TokenDirectory::new(&config.tokens_dir, default_youtube));
    let accounts = Arc::new(AccountResolver::new(records.clone(), credentials));

    let factory = Arc::new(HttpPublisherFactory::new(
        reqwest::Client::new(),
        config.graph_version.clone(),
    ));
    let publishers = PublisherDirectory::new(factory, accounts);

    let tasks: Arc<dyn TaskRegistry> = Arc::new(InMemoryTaskRegistry::new(config.task_max_age));

    let orchestrator = Arc::new(PublishOrchestrator::new(
        records.clone(),
        drive.clone(),
        publishers.clone(),
        ScheduleCalculator::new(config.timezone),
        tasks.clone(),
        PathBuf::from(&config.upload_temp_dir),
    ));
    let posts = Arc::new(PostManager::new(records.clone(), publishers.clone()));
    let reconciler = Arc::new(StatusReconciler::new(records.clone(), publishers));
    let library = Arc::new(MediaLibrary::new(drive));

    // ========================================================================
    // BACKGROUND RECONCILIATION
    // ========================================================================
    // Promotes SCHEDULED history rows once the platform reports them live.
    let sweep = reconciler.clone();
    let interval = config.reconcile_interval;
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let report = sweep.reconcile_once().await;
            if report.promoted > 0 || report.failed > 0 {
                tracing::info!(
                    inspected = report.inspected,
                    promoted = report.promoted,
                    failed = report.failed,
                    "Reconciliation sweep finished"
                );
            } else {
                tracing::debug!(inspected = report.inspected, "Reconciliation sweep finished");
            }
        }
    });

    let state = AppState {
        records,
        orchestrator,
        posts,
        reconciler,
        library,
        tasks,
        max_upload_bytes: config.max_upload_bytes,
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, build_router(state))
        .await
        .context("HTTP server stopped")?;

    Ok(())
}
