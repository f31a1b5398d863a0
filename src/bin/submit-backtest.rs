//! Submit a strategy for backtesting and follow it until it completes
//!
//! Usage: submit-backtest <strategy.json> [email|telegram|both]

use backtest_queue::config::{get_environment, ClientConfig};
use backtest_queue::core::runtime::{MonitorRuntime, RuntimeConfig};
use backtest_queue::core::scheduler::PollProfile;
use backtest_queue::jobs::notification::{channel_options, default_channel, UserProfile};
use backtest_queue::jobs::{HttpQueueClient, NotificationChannel, QueueClient, SubmitError, SubmitRequest};
use backtest_queue::logging;
use backtest_queue::models::strategy::StrategyConfig;
use backtest_queue::strategies::ValidatedStrategy;
use chrono::Utc;
use dotenvy::dotenv;
use std::env;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let mut args = env::args().skip(1);
    let path = args
        .next()
        .ok_or("usage: submit-backtest <strategy.json> [email|telegram|both]")?;
    let requested: Option<NotificationChannel> = args.next().map(|c| c.parse()).transpose()?;

    info!(environment = %get_environment(), "Starting backtest submission");

    let raw = std::fs::read_to_string(&path)?;
    let config: StrategyConfig = serde_json::from_str(&raw)?;

    let today = Utc::now().date_naive();
    let strategy = match ValidatedStrategy::new(config, today) {
        Ok(strategy) => strategy,
        Err(errors) => {
            for (field, message) in errors.iter() {
                error!(field = %field, "Validation: {}", message);
            }
            if let Some(field) = errors.first_invalid() {
                error!(field = %field, "Validation: fix {} first", field);
            }
            return Err(errors.into());
        }
    };

    // Profile is read once here and passed down explicitly
    let profile = UserProfile {
        telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
    };
    for option in channel_options(&profile) {
        info!(channel = %option.channel, enabled = option.enabled, "Notification channel");
    }
    let channel = requested.unwrap_or_else(|| default_channel(&profile));
    let request = SubmitRequest::new(&strategy, channel, &profile)?;

    let client_config = ClientConfig::from_env()?;
    let client: Arc<dyn QueueClient> = Arc::new(HttpQueueClient::new(&client_config)?);
    let runtime_config = RuntimeConfig::for_profile(&client_config, PollProfile::JobProgress);
    let (monitor, mut events) = MonitorRuntime::spawn(client, runtime_config, Vec::new());

    let handle = match monitor.submit(&request).await {
        Ok(handle) => handle,
        Err(SubmitError::LimitReached { message, upgrade }) => {
            error!(upgrade = ?upgrade, "Submission: {}", message);
            if let Some(upgrade) = upgrade {
                warn!("Upgrade to run more backtests: {}", upgrade);
            }
            monitor.stop().await;
            return Err(message.into());
        }
        Err(e) => {
            monitor.stop().await;
            return Err(e.into());
        }
    };

    info!(
        job_id = %handle.id,
        queue_position = ?handle.queue_position,
        eta_minutes = ?handle.estimated_wait_minutes,
        "Submission: queued as {}",
        handle.id
    );

    let mut snapshots = monitor.subscribe();
    let mut last_progress: Option<f64> = None;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Stopping monitor; the job keeps running on the server");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let jobs = snapshots.borrow_and_update().clone();
                if let Some(job) = jobs.iter().find(|job| job.id == handle.id) {
                    if last_progress != Some(job.progress_percent) {
                        last_progress = Some(job.progress_percent);
                        info!(
                            job_id = %job.id,
                            status = %job.status,
                            queue_position = ?job.queue_position(),
                            progress = job.progress_percent,
                            "Progress: {} {:.0}%",
                            job.status,
                            job.progress_percent
                        );
                    }
                }
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                if event.job_id != handle.id {
                    continue;
                }
                match (&event.status, &event.result) {
                    (_, Some(result)) => info!(
                        job_id = %event.job_id,
                        result_id = %result.id,
                        "Completed: result {} for {}",
                        result.id,
                        result.strategy_name
                    ),
                    (Some(status), None) => warn!(
                        job_id = %event.job_id,
                        status = %status,
                        error = ?event.error_message,
                        "Finished as {}",
                        status
                    ),
                    (None, None) => warn!(
                        job_id = %event.job_id,
                        "Job left the queue but no result is available yet"
                    ),
                }
                break;
            }
        }
    }

    monitor.stop().await;
    Ok(())
}
