use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_aux::prelude::*;

use crate::{
    types::{ApiKey, ChannelId, Count, Title, ValidationError, VideoId},
    util,
};

pub const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

const PART: &str = "snippet,statistics";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListResponse<S> {
    #[serde(default = "Vec::new")]
    pub items: Vec<Item<S>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Item<S> {
    pub snippet: Snippet,
    pub statistics: S,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Snippet {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatisticsResponse {
    // Absent when the uploader hides likes
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub like_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatisticsResponse {
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub subscriber_count: Option<i64>,
    #[serde(default)]
    pub hidden_subscriber_count: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("YouTube API returned an error ({code}): {message}")]
    Upstream { code: i64, message: String },
    #[error("request error: {0}")]
    RequestError(#[from] reqwest_middleware::Error),
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("Could not parse API response")]
    ParseError(#[from] serde_json::Error),
    #[error("API response has no items")]
    NoItems,
    #[error("API response has no {0}")]
    MissingStatistic(&'static str),
    #[error("API returned an invalid count")]
    InvalidCount(#[from] ValidationError),
}

impl ApiError {
    /// Whether the API itself answered with an error payload, as opposed to
    /// the request or the response handling failing.
    pub fn is_upstream(&self) -> bool {
        matches!(self, ApiError::Upstream { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoStatistics {
    pub title: Title,
    pub like_count: Count,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStatistics {
    pub title: Title,
    pub subscriber_count: Count,
}

#[async_trait]
pub trait StatisticsApi: Send + Sync {
    async fn video_statistics(&self, video_id: &VideoId) -> Result<VideoStatistics, ApiError>;

    /// Handles (`@name`) are looked up with `forHandle`, raw ids with `id`.
    async fn channel_statistics(
        &self,
        channel_id: &ChannelId,
    ) -> Result<ChannelStatistics, ApiError>;
}

/// Parses a list response, turning a top level `error` key into
/// [`ApiError::Upstream`].
pub fn parse_list_response<S>(body: serde_json::Value) -> Result<ListResponse<S>, ApiError>
where
    S: DeserializeOwned,
{
    if let Some(error) = body.get("error") {
        let error: ErrorBody = serde_json::from_value(error.clone()).unwrap_or_default();
        return Err(ApiError::Upstream {
            code: error.code,
            message: error.message,
        });
    }

    serde_json::from_value(body).map_err(ApiError::ParseError)
}

fn first_item<S>(response: ListResponse<S>) -> Result<Item<S>, ApiError> {
    response.items.into_iter().next().ok_or(ApiError::NoItems)
}

pub struct YoutubeDataApi {
    client: util::HttpClient,
    key: ApiKey,
    base_url: String,
}

impl YoutubeDataApi {
    pub fn new(client: util::HttpClient, key: ApiKey) -> Self {
        Self {
            client,
            key,
            base_url: API_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn list<S>(&self, resource: &str, params: &[(&str, &str)]) -> Result<Item<S>, ApiError>
    where
        S: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, resource);
        debug!("Requesting {} {:?}", url, params);

        let body: serde_json::Value = self
            .client
            .client
            .get(&url)
            .query(&[("key", self.key.as_str()), ("part", PART)])
            .query(params)
            .send()
            .await?
            .json()
            .await?;

        first_item(parse_list_response(body)?)
    }
}

#[async_trait]
impl StatisticsApi for YoutubeDataApi {
    async fn video_statistics(&self, video_id: &VideoId) -> Result<VideoStatistics, ApiError> {
        let item: Item<VideoStatisticsResponse> =
            self.list("videos", &[("id", video_id.as_str())]).await?;

        let like_count = item
            .statistics
            .like_count
            .ok_or(ApiError::MissingStatistic("likeCount"))?;

        Ok(VideoStatistics {
            title: Title::new(item.snippet.title),
            like_count: Count::try_from(like_count)?,
        })
    }

    async fn channel_statistics(
        &self,
        channel_id: &ChannelId,
    ) -> Result<ChannelStatistics, ApiError> {
        let lookup = if channel_id.is_handle() {
            "forHandle"
        } else {
            "id"
        };
        let item: Item<ChannelStatisticsResponse> = self
            .list("channels", &[(lookup, channel_id.as_str())])
            .await?;

        if item.statistics.hidden_subscriber_count {
            debug!("Channel {} hides its subscriber count", channel_id);
        }
        let subscriber_count = item
            .statistics
            .subscriber_count
            .ok_or(ApiError::MissingStatistic("subscriberCount"))?;

        Ok(ChannelStatistics {
            title: Title::new(item.snippet.title),
            subscriber_count: Count::try_from(subscriber_count)?,
        })
    }
}
