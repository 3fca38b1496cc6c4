use crate::types::{ApiKey, ChannelId, PollingInterval, ValidationError};

/// Validated inputs shared by every poller watching one channel.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub channel: ChannelId,
    pub interval: PollingInterval,
    pub api_key: ApiKey,
}

impl WatchConfig {
    /// Always enforces the safe polling interval.
    pub fn new(channel: &str, interval_ms: u64, api_key: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            channel: ChannelId::new(channel)?,
            interval: PollingInterval::safe(interval_ms)?,
            api_key: ApiKey::new(api_key)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "aaaaabbbbbcccccdddddeeeeefffffggggg1234";

    #[test]
    fn valid_config() {
        let config = WatchConfig::new("@channel", 15_000, KEY).unwrap();
        assert!(config.channel.is_handle());
        assert_eq!(config.interval.duration().as_secs(), 15);
        assert_eq!(config.api_key.as_str(), KEY);
    }

    #[test]
    fn invalid_config() {
        assert_eq!(
            WatchConfig::new("@channel", 5_000, KEY).unwrap_err(),
            ValidationError::IntervalTooShort(5_000)
        );
        assert_eq!(
            WatchConfig::new("", 10_000, KEY).unwrap_err(),
            ValidationError::Empty("channel id")
        );
        assert_eq!(
            WatchConfig::new("@channel", 10_000, "").unwrap_err(),
            ValidationError::Empty("API key")
        );
    }
}
