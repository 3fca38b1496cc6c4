use std::{fmt, sync::OnceLock, time::Duration};

use regex::Regex;

/// Largest integer a JavaScript client can represent exactly (2^53 - 1).
pub const MAX_SAFE_COUNT: u64 = (1 << 53) - 1;

/// Polling faster than this hammers the Data API quota.
pub const MIN_SAFE_INTERVAL_MS: u64 = 10 * 1000;

pub const MAX_API_KEY_LEN: usize = 64;

// Unofficial, there is no published definition of the key format.
const API_KEY_FORMAT: &str = r"^[0-9A-Za-z_-]{39}$";

fn api_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(API_KEY_FORMAT).expect("api key pattern is valid"))
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("count must be non-negative, got {0}")]
    NegativeCount(i64),
    #[error("count {0} is too large")]
    CountTooLarge(u64),
    #[error("polling interval must be positive")]
    ZeroInterval,
    #[error("polling interval must be at least 10000ms, got {0}ms")]
    IntervalTooShort(u64),
    #[error("API key must be at most 64 characters, got {0}")]
    ApiKeyTooLong(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::Empty("video id"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A channel, addressed either by its raw id (`UC...`) or by its handle
/// (`@name`). The two forms are looked up differently by both the web page
/// and the Data API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::Empty("channel id"));
        }
        Ok(Self(id))
    }

    pub fn is_handle(&self) -> bool {
        self.0.starts_with('@')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human readable name of a video or channel. Only used for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Title(String);

impl Title {
    pub fn new(title: impl Into<String>) -> Self {
        Self(title.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Count(u64);

impl Count {
    pub const ZERO: Count = Count(0);

    pub fn new(value: u64) -> Result<Self, ValidationError> {
        if value > MAX_SAFE_COUNT {
            return Err(ValidationError::CountTooLarge(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for Count {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(ValidationError::NegativeCount(value));
        }
        Count::new(value as u64)
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingInterval(Duration);

impl PollingInterval {
    pub fn new(millis: u64) -> Result<Self, ValidationError> {
        if millis == 0 {
            return Err(ValidationError::ZeroInterval);
        }
        Ok(Self(Duration::from_millis(millis)))
    }

    /// Same as [`PollingInterval::new`], but refuses anything below
    /// [`MIN_SAFE_INTERVAL_MS`].
    pub fn safe(millis: u64) -> Result<Self, ValidationError> {
        let interval = Self::new(millis)?;
        if millis < MIN_SAFE_INTERVAL_MS {
            return Err(ValidationError::IntervalTooShort(millis));
        }
        Ok(interval)
    }

    pub fn duration(&self) -> Duration {
        self.0
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ValidationError::Empty("API key"));
        }
        let len = key.chars().count();
        if len > MAX_API_KEY_LEN {
            return Err(ValidationError::ApiKeyTooLong(len));
        }
        if !api_key_regex().is_match(&key) {
            warn!("API key does not look like a YouTube Data API key, using it anyway");
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
