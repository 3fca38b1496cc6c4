use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use tokio::{sync::broadcast, task::JoinHandle};

use crate::{
    api::{self, StatisticsApi},
    config::WatchConfig,
    count::{IdentityMismatch, LikeCount, SubscriberCount, TrackedCount},
    page,
    tracker::CounterTracker,
    types::{ChannelId, PollingInterval, VideoId},
    util::{self, PageFetcher},
};

/// Events buffered per listener. A listener that falls further behind loses
/// the oldest ones and sees `RecvError::Lagged`.
pub const EVENT_CAPACITY: usize = 64;

/// Failures reported through [`PollerEvent::Error`].
#[derive(thiserror::Error, Debug)]
pub enum PollError {
    #[error("Could not resolve live video: {0}")]
    Resolve(#[from] page::ResolveError),
    #[error("Could not sample statistics: {0}")]
    Sample(#[from] api::ApiError),
}

/// Bugs in the orchestration. These stop the poll loop and are never sent
/// to listeners.
#[derive(thiserror::Error, Debug)]
pub enum PollerFault {
    #[error("sampled the wrong target")]
    IdentityMismatch(#[from] IdentityMismatch),
    #[error("poll loop panicked or was aborted")]
    JoinError(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub enum PollerEvent<C> {
    Start,
    End,
    Error(Arc<PollError>),
    Raised { previous: C, next: C },
}

/// One metric of one channel: how to find the entity it is sampled from, and
/// how to sample it.
#[async_trait]
pub trait Metric: Send + Sync + 'static {
    type Count: TrackedCount;

    async fn resolve(&self) -> Result<<Self::Count as TrackedCount>::Id, PollError>;

    async fn sample(
        &self,
        target: &<Self::Count as TrackedCount>::Id,
    ) -> Result<Self::Count, PollError>;
}

/// Like count of whatever the channel is currently streaming.
pub struct LikeCountMetric {
    channel: ChannelId,
    api: Arc<dyn StatisticsApi>,
    pages: Arc<dyn PageFetcher>,
}

impl LikeCountMetric {
    pub fn new(
        channel: ChannelId,
        api: Arc<dyn StatisticsApi>,
        pages: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            channel,
            api,
            pages,
        }
    }
}

#[async_trait]
impl Metric for LikeCountMetric {
    type Count = LikeCount;

    async fn resolve(&self) -> Result<VideoId, PollError> {
        let html = self
            .pages
            .fetch_page_text(&page::live_page_url(&self.channel))
            .await
            .map_err(page::ResolveError::FetchError)?;

        let video_id = page::video_id_from_live_page(&html)?;
        info!("Channel {} is live on video {}", self.channel, video_id);

        Ok(video_id)
    }

    async fn sample(&self, video_id: &VideoId) -> Result<LikeCount, PollError> {
        let stats = self.api.video_statistics(video_id).await?;
        Ok(LikeCount::new(video_id.clone(), stats.title, stats.like_count))
    }
}

pub struct SubscriberCountMetric {
    channel: ChannelId,
    api: Arc<dyn StatisticsApi>,
}

impl SubscriberCountMetric {
    pub fn new(channel: ChannelId, api: Arc<dyn StatisticsApi>) -> Self {
        Self { channel, api }
    }
}

#[async_trait]
impl Metric for SubscriberCountMetric {
    type Count = SubscriberCount;

    async fn resolve(&self) -> Result<ChannelId, PollError> {
        Ok(self.channel.clone())
    }

    async fn sample(&self, channel_id: &ChannelId) -> Result<SubscriberCount, PollError> {
        let stats = self.api.channel_statistics(channel_id).await?;
        Ok(SubscriberCount::new(
            channel_id.clone(),
            stats.title,
            stats.subscriber_count,
        ))
    }
}

struct Run {
    active: Arc<AtomicBool>,
    task: JoinHandle<Result<(), PollerFault>>,
}

/// Polls a [`Metric`] on a fixed interval and notifies listeners whenever it
/// rises above the best value seen so far.
///
/// `start` and `close` are idempotent. Closing does not cancel a sample that
/// is already in flight, it only stops the loop from scheduling another one.
pub struct RaisedEventPoller<M: Metric> {
    metric: Arc<M>,
    interval: PollingInterval,
    events: broadcast::Sender<PollerEvent<M::Count>>,
    run: Option<Run>,
}

pub type LikeCountPoller = RaisedEventPoller<LikeCountMetric>;
pub type SubscriberCountPoller = RaisedEventPoller<SubscriberCountMetric>;

impl LikeCountPoller {
    pub fn like_count(config: &WatchConfig, client: util::HttpClient) -> Self {
        let api = api::YoutubeDataApi::new(client.clone(), config.api_key.clone());
        let metric =
            LikeCountMetric::new(config.channel.clone(), Arc::new(api), Arc::new(client));
        Self::new(metric, config.interval)
    }
}

impl SubscriberCountPoller {
    pub fn subscriber_count(config: &WatchConfig, client: util::HttpClient) -> Self {
        let api = api::YoutubeDataApi::new(client, config.api_key.clone());
        let metric = SubscriberCountMetric::new(config.channel.clone(), Arc::new(api));
        Self::new(metric, config.interval)
    }
}

impl<M: Metric> RaisedEventPoller<M> {
    pub fn new(metric: M, interval: PollingInterval) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            metric: Arc::new(metric),
            interval,
            events,
            run: None,
        }
    }

    /// Registers a listener. Only events sent after this call are received.
    ///
    /// Each listener buffers up to [`EVENT_CAPACITY`] events. One that lags
    /// further behind drops the oldest and gets `RecvError::Lagged` with the
    /// number missed, then carries on from the oldest event still buffered.
    pub fn subscribe(&self) -> broadcast::Receiver<PollerEvent<M::Count>> {
        self.events.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.run
            .as_ref()
            .map(|run| run.active.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Resolves the target, takes the initial sample and starts the poll
    /// loop. Returns `false` (after emitting an error) if either step fails.
    pub async fn start(&mut self) -> bool {
        if self.is_active() {
            return true;
        }

        let initial = match self.initial_sample().await {
            Ok(initial) => initial,
            Err(e) => {
                warn!("Could not start watching: {}", e);
                emit(&self.events, PollerEvent::Error(Arc::new(e)));
                return false;
            }
        };

        let tracker = CounterTracker::new(initial);
        info!(
            "Watching {}, polling every {:?}",
            tracker.current(),
            self.interval.duration()
        );

        let active = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(poll_loop(
            self.metric.clone(),
            tracker,
            self.interval,
            active.clone(),
            self.events.clone(),
        ));
        self.run = Some(Run { active, task });

        emit(&self.events, PollerEvent::Start);
        true
    }

    async fn initial_sample(&self) -> Result<M::Count, PollError> {
        let target = self.metric.resolve().await?;
        self.metric.sample(&target).await
    }

    pub fn close(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };

        if run.active.swap(false, Ordering::SeqCst) {
            info!("Stopped watching");
            emit(&self.events, PollerEvent::End);
        }
    }

    /// Waits for the current poll loop to finish. Resolves immediately if the
    /// poller is idle, otherwise only once the loop hits a fault.
    pub async fn wait(&mut self) -> Result<(), PollerFault> {
        let Some(run) = self.run.as_mut() else {
            return Ok(());
        };

        let result = (&mut run.task).await;
        self.run = None;
        result?
    }
}

impl<M: Metric> Drop for RaisedEventPoller<M> {
    fn drop(&mut self) {
        self.close();
    }
}

fn emit<C: Clone>(events: &broadcast::Sender<PollerEvent<C>>, event: PollerEvent<C>) {
    // No listeners is fine
    let _ = events.send(event);
}

async fn poll_loop<M: Metric>(
    metric: Arc<M>,
    mut tracker: CounterTracker<M::Count>,
    interval: PollingInterval,
    active: Arc<AtomicBool>,
    events: broadcast::Sender<PollerEvent<M::Count>>,
) -> Result<(), PollerFault> {
    loop {
        tokio::time::sleep(interval.duration()).await;

        if !active.load(Ordering::SeqCst) {
            debug!("Poller closed, not sampling again");
            return Ok(());
        }

        if let Err(fault) = tick(metric.as_ref(), &mut tracker, &events).await {
            error!("Poll loop stopped: {}", fault);
            active.store(false, Ordering::SeqCst);
            return Err(fault);
        }
    }
}

/// Takes one sample. Sampling errors are reported and swallowed so a single
/// bad response does not end a long running watch.
async fn tick<M: Metric>(
    metric: &M,
    tracker: &mut CounterTracker<M::Count>,
    events: &broadcast::Sender<PollerEvent<M::Count>>,
) -> Result<(), PollerFault> {
    let previous = tracker.current().clone();

    let next = match metric.sample(previous.id()).await {
        Ok(next) => next,
        Err(e) => {
            warn!("Sampling {} failed: {}", previous.id(), e);
            emit(events, PollerEvent::Error(Arc::new(e)));
            return Ok(());
        }
    };
    debug!("Sampled {}", next);

    if tracker.update(next.clone())? {
        info!("Raised from {} to {}", previous.count(), next.count());
        emit(events, PollerEvent::Raised { previous, next });
    }

    Ok(())
}
