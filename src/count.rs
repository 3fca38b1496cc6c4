use std::fmt;

use crate::types::{ChannelId, Count, Title, VideoId};

/// Raised when two counts belonging to different videos or channels are
/// compared. This is always a bug in the caller, never bad data.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("different {kind} detected: tracking {expected}, got {found}")]
pub struct IdentityMismatch {
    pub kind: &'static str,
    pub expected: String,
    pub found: String,
}

/// A count bound to the video or channel it was sampled from.
pub trait TrackedCount: Clone + fmt::Debug + fmt::Display + Send + Sync + 'static {
    type Id: Clone + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static;

    const KIND: &'static str;

    fn id(&self) -> &Self::Id;
    fn title(&self) -> &Title;
    fn count(&self) -> Count;

    /// Watermark a tracker starts from when given `initial`.
    fn seed(initial: Self) -> Self;

    /// Whether `next` is strictly greater than `self`. Titles are ignored.
    fn check(&self, next: &Self) -> Result<bool, IdentityMismatch> {
        if self.id() != next.id() {
            return Err(IdentityMismatch {
                kind: Self::KIND,
                expected: self.id().to_string(),
                found: next.id().to_string(),
            });
        }
        Ok(self.count() < next.count())
    }
}

#[derive(Debug, Clone)]
pub struct LikeCount {
    pub video_id: VideoId,
    pub video_title: Title,
    pub value: Count,
}

impl LikeCount {
    pub fn new(video_id: VideoId, video_title: Title, value: Count) -> Self {
        Self {
            video_id,
            video_title,
            value,
        }
    }
}

impl TrackedCount for LikeCount {
    type Id = VideoId;

    const KIND: &'static str = "video id";

    fn id(&self) -> &VideoId {
        &self.video_id
    }

    fn title(&self) -> &Title {
        &self.video_title
    }

    fn count(&self) -> Count {
        self.value
    }

    // The local viewer may already have liked the stream before tracking
    // starts, so the first real sample has to register as a rise.
    fn seed(initial: Self) -> Self {
        Self {
            value: Count::ZERO,
            ..initial
        }
    }
}

impl fmt::Display for LikeCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} likes on \"{}\" ({})",
            self.value, self.video_title, self.video_id
        )
    }
}

#[derive(Debug, Clone)]
pub struct SubscriberCount {
    pub channel_id: ChannelId,
    pub channel_title: Title,
    pub value: Count,
}

impl SubscriberCount {
    pub fn new(channel_id: ChannelId, channel_title: Title, value: Count) -> Self {
        Self {
            channel_id,
            channel_title,
            value,
        }
    }
}

impl TrackedCount for SubscriberCount {
    type Id = ChannelId;

    const KIND: &'static str = "channel id";

    fn id(&self) -> &ChannelId {
        &self.channel_id
    }

    fn title(&self) -> &Title {
        &self.channel_title
    }

    fn count(&self) -> Count {
        self.value
    }

    fn seed(initial: Self) -> Self {
        initial
    }
}

impl fmt::Display for SubscriberCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} subscribers on \"{}\" ({})",
            self.value, self.channel_title, self.channel_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn like(id: &str, title: &str, value: u64) -> LikeCount {
        LikeCount::new(
            VideoId::new(id).unwrap(),
            Title::new(title),
            Count::new(value).unwrap(),
        )
    }

    #[test]
    fn check_compares_values() {
        let current = like("abcdefghijk", "Valid Title", 10);

        assert_eq!(current.check(&like("abcdefghijk", "Valid Title", 11)), Ok(true));
        assert_eq!(current.check(&like("abcdefghijk", "Valid Title", 9)), Ok(false));
        assert_eq!(current.check(&like("abcdefghijk", "Valid Title", 10)), Ok(false));
    }

    #[test]
    fn check_ignores_title() {
        let current = like("abcdefghijk", "Valid Title", 10);
        assert_eq!(
            current.check(&like("abcdefghijk", "another title", 11)),
            Ok(true)
        );
    }

    #[test]
    fn check_rejects_other_video() {
        let current = like("abcdefghijk", "Valid Title", 10);
        let err = current
            .check(&like("ABCDEFGHIJK", "Valid Title", 10))
            .unwrap_err();
        assert_eq!(err.expected, "abcdefghijk");
        assert_eq!(err.found, "ABCDEFGHIJK");
    }

    #[test]
    fn check_rejects_other_channel() {
        let current = SubscriberCount::new(
            ChannelId::new("@one").unwrap(),
            Title::new("one"),
            Count::ZERO,
        );
        let next = SubscriberCount::new(
            ChannelId::new("@two").unwrap(),
            Title::new("one"),
            Count::new(100).unwrap(),
        );
        assert!(current.check(&next).is_err());
    }

    #[test]
    fn seed_values() {
        let seeded = LikeCount::seed(like("abcdefghijk", "title", 100));
        assert_eq!(seeded.value, Count::ZERO);
        assert_eq!(seeded.video_id.as_str(), "abcdefghijk");
        assert_eq!(seeded.video_title.as_str(), "title");

        let subs = SubscriberCount::new(
            ChannelId::new("@one").unwrap(),
            Title::new("one"),
            Count::new(100).unwrap(),
        );
        assert_eq!(SubscriberCount::seed(subs).value.value(), 100);
    }
}
