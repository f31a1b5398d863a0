//! Unit tests for notification channel routing

use backtest_queue::jobs::notification::{
    channel_options, default_channel, select_channel, NotificationError,
};
use backtest_queue::jobs::{NotificationChannel, UserProfile};

fn linked() -> UserProfile {
    UserProfile {
        telegram_chat_id: Some("123456".to_string()),
    }
}

#[test]
fn test_default_channel_follows_profile() {
    assert_eq!(default_channel(&UserProfile::default()), NotificationChannel::Email);
    assert_eq!(default_channel(&linked()), NotificationChannel::Both);

    let blank = UserProfile {
        telegram_chat_id: Some("  ".to_string()),
    };
    assert_eq!(default_channel(&blank), NotificationChannel::Email);
}

#[test]
fn test_unlinked_profile_lists_disabled_options() {
    let options = channel_options(&UserProfile::default());
    assert_eq!(options.len(), 3);
    let enabled: Vec<NotificationChannel> = options
        .iter()
        .filter(|o| o.enabled)
        .map(|o| o.channel)
        .collect();
    assert_eq!(enabled, vec![NotificationChannel::Email]);

    assert!(channel_options(&linked()).iter().all(|o| o.enabled));
}

#[test]
fn test_select_channel_requires_linked_account() {
    let err = select_channel(&UserProfile::default(), NotificationChannel::Telegram).unwrap_err();
    assert_eq!(
        err,
        NotificationError::ChannelUnavailable(NotificationChannel::Telegram)
    );
    assert_eq!(
        select_channel(&UserProfile::default(), NotificationChannel::Email),
        Ok(NotificationChannel::Email)
    );
    assert_eq!(
        select_channel(&linked(), NotificationChannel::Both),
        Ok(NotificationChannel::Both)
    );
}

#[test]
fn test_parse_channel() {
    assert_eq!(" Both ".parse::<NotificationChannel>(), Ok(NotificationChannel::Both));
    assert_eq!("telegram".parse::<NotificationChannel>(), Ok(NotificationChannel::Telegram));
    assert!(matches!(
        "sms".parse::<NotificationChannel>(),
        Err(NotificationError::UnknownChannel(_))
    ));
}
