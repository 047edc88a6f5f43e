mod bot;
mod config;
mod db;
mod notifier;
mod settings;
mod sheets;
mod state;
mod statistics;
#[cfg(test)]
mod test_support;
mod time_utils;
mod web;

use crate::bot::dialogue::{DialogueStore, DIALOGUE_TTL};
use crate::bot::messenger::TelegramMessenger;
use crate::config::OrgConfig;
use crate::db::PgDirectory;
use crate::settings::Settings;
use crate::sheets::google::GoogleSheetsClient;
use crate::state::SharedState;
use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Task runs older than this are pruned from the ledger.
const TASK_RUN_RETENTION_DAYS: i64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    let config = OrgConfig::load(&settings.config_path).map_err(|e| {
        tracing::error!("Failed to load {}: {}", settings.config_path.display(), e);
        e
    })?;
    tracing::info!(
        "Configuration loaded: {} departments, {} scheduled tasks",
        config.departments.len(),
        config.tasks.len()
    );

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&settings.database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;
    tracing::info!("Database migrations completed");

    let directory = Arc::new(PgDirectory::new(pool.clone()));
    let shared: SharedState = Arc::new(state::AppState {
        config: Arc::new(config),
        directory: directory.clone(),
        ledger: directory,
        sheets: Arc::new(GoogleSheetsClient::new(settings.google)),
        messenger: Arc::new(TelegramMessenger::new(teloxide::Bot::new(&settings.bot_token))),
        dialogues: DialogueStore::default(),
        webhook_secret: settings.webhook_secret,
        bot_username: settings.bot_username,
        clock: Utc::now,
    });

    let scheduler = JobScheduler::new().await?;

    // Reminders, reports and rotation: every minute, matched against local time
    let shared_for_tasks = shared.clone();
    scheduler
        .add(Job::new_async("0 * * * * *", move |_uuid, _l| {
            let state = shared_for_tasks.clone();
            Box::pin(async move {
                let now = state.local_now();
                let executed = notifier::run_due_tasks(&state, &now).await;
                if executed > 0 {
                    tracing::info!(
                        "Ran {} scheduled task(s) at {:02}:{:02}",
                        executed,
                        now.hour,
                        now.minute
                    );
                }
            })
        })?)
        .await?;

    // Idle dialogues and old task runs, hourly
    let shared_for_cleanup = shared.clone();
    scheduler
        .add(Job::new_async("0 0 * * * *", move |_uuid, _l| {
            let state = shared_for_cleanup.clone();
            let pool = pool.clone();
            Box::pin(async move {
                let dropped = state.dialogues.sweep(DIALOGUE_TTL).await;
                if dropped > 0 {
                    tracing::info!("Cleaned up {} idle dialogues", dropped);
                }

                let before = state.local_now().date - Duration::days(TASK_RUN_RETENTION_DAYS);
                match db::prune_task_runs(&pool, before).await {
                    Ok(0) => {}
                    Ok(pruned) => tracing::info!("Pruned {} task runs before {}", pruned, before),
                    Err(e) => tracing::error!("Failed to prune task runs: {}", e),
                }
            })
        })?)
        .await?;

    scheduler.start().await?;
    tracing::info!("Scheduler started:");
    tracing::info!("  - Scheduled tasks: checked every minute");
    tracing::info!("  - Dialogue and task run cleanup: hourly");

    let app = web::routes(shared.clone()).layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", settings.bind_addr);
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
