//! Completion notification preference attached to each submitted job

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    #[default]
    Email,
    Telegram,
    Both,
}

impl NotificationChannel {
    pub const ALL: [NotificationChannel; 3] = [
        NotificationChannel::Email,
        NotificationChannel::Telegram,
        NotificationChannel::Both,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Telegram => "telegram",
            NotificationChannel::Both => "both",
        }
    }

    /// Whether delivering on this channel needs the alternate channel linked
    pub fn requires_alternate(&self) -> bool {
        !matches!(self, NotificationChannel::Email)
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationChannel {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(NotificationChannel::Email),
            "telegram" => Ok(NotificationChannel::Telegram),
            "both" => Ok(NotificationChannel::Both),
            other => Err(NotificationError::UnknownChannel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("unknown notification channel: {0}")]
    UnknownChannel(String),

    #[error("{0} notifications need a linked Telegram account")]
    ChannelUnavailable(NotificationChannel),
}

/// The slice of the user profile the router needs, read once by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
}

impl UserProfile {
    pub fn alternate_channel_configured(&self) -> bool {
        self.telegram_chat_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

/// A channel as offered to the user; unavailable channels are listed, not hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOption {
    pub channel: NotificationChannel,
    pub enabled: bool,
}

pub fn channel_options(profile: &UserProfile) -> Vec<ChannelOption> {
    let alternate = profile.alternate_channel_configured();
    NotificationChannel::ALL
        .iter()
        .map(|channel| ChannelOption {
            channel: *channel,
            enabled: alternate || !channel.requires_alternate(),
        })
        .collect()
}

pub fn default_channel(profile: &UserProfile) -> NotificationChannel {
    if profile.alternate_channel_configured() {
        NotificationChannel::Both
    } else {
        NotificationChannel::Email
    }
}

/// Accept `requested` only if the profile can deliver on it
pub fn select_channel(
    profile: &UserProfile,
    requested: NotificationChannel,
) -> Result<NotificationChannel, NotificationError> {
    if requested.requires_alternate() && !profile.alternate_channel_configured() {
        return Err(NotificationError::ChannelUnavailable(requested));
    }
    Ok(requested)
}
