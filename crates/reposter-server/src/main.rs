mod api;
mod middleware;

use std::sync::Arc;

use chrono::Utc;
use reposter_core::shutdown;
use reposter_cycle::{Archiver, CreditMonitor, Orchestrator, Scheduler};
use reposter_notify::{Notice, Reporter, TelegramReporter};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::TriggerAuth,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = reposter_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, bind = %config.bind_addr, "reposter: starting");

    let creds = &config.credentials;
    let reporter: Arc<dyn Reporter> = Arc::new(TelegramReporter::new(
        &config.report,
        &creds.telegram_bot_token,
        &creds.telegram_chat_id,
    )?);
    let orchestrator = Orchestrator::from_config(&config, Arc::clone(&reporter))?;
    let credit = CreditMonitor::from_settings(&config.credit)?;
    let manual_credit = credit.manual();
    let scheduler = Scheduler::from_config(&config, orchestrator, credit);

    let state = AppState {
        status: scheduler.status(),
        manual_credit,
        wake: scheduler.waker(),
        archiver: Archiver::from_settings(&config.credit, &config.media),
        started_at: Utc::now(),
    };
    let app = build_app(state, TriggerAuth::new(creds.trigger_api_key.as_deref()));

    notify_best_effort(
        reporter.as_ref(),
        Notice::info(format!(
            "Reposter started. Posting every {}h.",
            config.interval_hours
        )),
    )
    .await;

    let (stop_tx, stop_rx) = shutdown::channel();
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });
    let scheduler_task = tokio::spawn(scheduler.run(stop_rx.clone()));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let mut server_stop = stop_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown::shutdown_requested(&mut server_stop).await })
        .await?;

    if let Err(e) = scheduler_task.await {
        tracing::error!(error = %e, "reposter: scheduler task failed");
    }
    notify_best_effort(reporter.as_ref(), Notice::warning("Reposter stopped.")).await;
    Ok(())
}

async fn notify_best_effort(reporter: &dyn Reporter, notice: Notice) {
    if let Err(e) = reporter.notify(&notice).await {
        tracing::warn!(error = %e, "reposter: notice delivery failed");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
