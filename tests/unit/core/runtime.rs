//! Unit tests for poll loop configuration

use backtest_queue::config::ClientConfig;
use backtest_queue::core::runtime::{RuntimeConfig, DEFAULT_STUCK_AFTER};
use backtest_queue::core::scheduler::PollProfile;
use std::time::Duration;
use url::Url;

#[test]
fn test_default_runtime_config() {
    let config = RuntimeConfig::default();
    assert_eq!(config.poll_interval, PollProfile::JobProgress.interval());
    assert_eq!(config.stuck_after, DEFAULT_STUCK_AFTER);
}

#[test]
fn test_runtime_config_for_profile() {
    let mut client = ClientConfig::new(Url::parse("http://localhost:8080").unwrap());
    client.stuck_after = Duration::from_secs(600);

    let admin = RuntimeConfig::for_profile(&client, PollProfile::AdminList);
    assert_eq!(admin.poll_interval, Duration::from_secs(10));
    assert_eq!(admin.stuck_after, Duration::from_secs(600));

    client.poll_interval = Some(Duration::from_millis(250));
    let progress = RuntimeConfig::for_profile(&client, PollProfile::JobProgress);
    assert_eq!(progress.poll_interval, Duration::from_millis(250));
}

#[test]
fn test_poll_profile_names() {
    assert_eq!(PollProfile::default(), PollProfile::JobProgress);
    assert_eq!(PollProfile::JobProgress.to_string(), "job-progress");
    assert_eq!(PollProfile::AdminList.to_string(), "admin-list");
}
