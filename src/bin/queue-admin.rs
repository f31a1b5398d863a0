//! Queue administration
//!
//! Usage: queue-admin <list|stuck|cancel|delete|fail|reset-stuck> [job-id]

use backtest_queue::config::{get_environment, ClientConfig};
use backtest_queue::core::runtime::{MonitorRuntime, RuntimeConfig};
use backtest_queue::core::scheduler::PollProfile;
use backtest_queue::jobs::{ActionOutcome, HttpQueueClient, QueueClient};
use backtest_queue::logging;
use backtest_queue::models::job::{Job, JobId};
use dotenvy::dotenv;
use std::env;
use std::sync::Arc;
use tracing::info;

const USAGE: &str = "usage: queue-admin <list|stuck|cancel|delete|fail|reset-stuck> [job-id]";

fn print_job(job: &Job) {
    println!(
        "{:<24} {:<11} {:>5.1}% pos={:<4} {}",
        job.id,
        job.status,
        job.progress_percent,
        job.queue_position()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string()),
        job.strategy_name
    );
}

fn print_outcome(action: &str, id: &JobId, outcome: ActionOutcome) {
    match outcome {
        ActionOutcome::Applied => println!("{} {}: done", action, id),
        ActionOutcome::AlreadySettled => println!("{} {}: already settled", action, id),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let mut args = env::args().skip(1);
    let command = args.next().ok_or(USAGE)?;
    let target: Option<JobId> = args.next().map(JobId::from);

    let client_config = ClientConfig::from_env()?;
    info!(
        environment = %get_environment(),
        queue_api = %client_config.base_url,
        "Queue admin: {}",
        command
    );

    let client: Arc<dyn QueueClient> = Arc::new(HttpQueueClient::new(&client_config)?);
    let live = client.live_jobs().await?;

    if command == "list" {
        for job in &live {
            print_job(job);
        }
        println!("{} live jobs", live.len());
        return Ok(());
    }

    let runtime_config = RuntimeConfig::for_profile(&client_config, PollProfile::AdminList);
    let (monitor, _events) = MonitorRuntime::spawn(client, runtime_config, live);

    let result: Result<(), Box<dyn std::error::Error>> = async {
        match (command.as_str(), target.as_ref()) {
            ("stuck", _) => {
                let stuck = monitor.stuck_jobs().await?;
                for job in &stuck {
                    print_job(job);
                }
                println!("{} stuck jobs", stuck.len());
            }
            ("cancel", Some(id)) => print_outcome("cancel", id, monitor.cancel(id).await?),
            ("delete", Some(id)) => print_outcome("delete", id, monitor.delete(id).await?),
            ("fail", Some(id)) => print_outcome("fail", id, monitor.force_fail(id).await?),
            ("reset-stuck", _) => {
                let reset = monitor.reset_stuck().await?;
                println!("reset {} stuck jobs", reset);
            }
            _ => return Err(USAGE.into()),
        }
        Ok(())
    }
    .await;

    monitor.stop().await;
    result
}
