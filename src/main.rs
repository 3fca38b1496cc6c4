use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use futures::{try_join, StreamExt};
use log::{info, warn};
use tokio::sync::watch;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use yt_raised::{
    config::WatchConfig,
    count::TrackedCount,
    poller::{LikeCountPoller, Metric, PollerEvent, RaisedEventPoller, SubscriberCountPoller},
    types::MIN_SAFE_INTERVAL_MS,
    util,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Channel id (UC...) or handle (@name)
    channel: String,

    /// YouTube Data API v3 key
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Milliseconds between samples, at least 10000
    #[arg(long, default_value_t = MIN_SAFE_INTERVAL_MS)]
    interval_ms: u64,

    /// Which counts to watch
    #[arg(long, value_enum, default_value_t = MetricChoice::Both)]
    metric: MetricChoice,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum MetricChoice {
    Likes,
    Subscribers,
    Both,
}

impl MetricChoice {
    fn likes(self) -> bool {
        self != MetricChoice::Subscribers
    }

    fn subscribers(self) -> bool {
        self != MetricChoice::Likes
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = WatchConfig::new(&args.channel, args.interval_ms, &args.api_key)
        .context("Invalid arguments")?;

    // Create HttpClient
    let client = util::HttpClient::new().context("Could not create HttpClient")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!("Could not listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    // Each future reports whether its poller ever started
    let likes = async {
        if !args.metric.likes() {
            return Ok(false);
        }
        let poller = LikeCountPoller::like_count(&config, client.clone());
        run("likes", poller, shutdown_rx.clone()).await
    };
    let subscribers = async {
        if !args.metric.subscribers() {
            return Ok(false);
        }
        let poller = SubscriberCountPoller::subscriber_count(&config, client.clone());
        run("subscribers", poller, shutdown_rx.clone()).await
    };

    // A metric that fails to start does not stop the other one
    let (likes, subscribers) = try_join!(likes, subscribers)?;
    if !likes && !subscribers {
        bail!("Could not start watching {}", args.channel);
    }

    info!("Done");

    Ok(())
}

/// Runs one poller until shutdown or a fault. Returns `Ok(false)` if it never
/// started.
async fn run<M: Metric>(
    name: &str,
    mut poller: RaisedEventPoller<M>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<bool> {
    let mut events = BroadcastStream::new(poller.subscribe());

    if !poller.start().await {
        warn!("[{}] Could not start watching", name);
        return Ok(false);
    }

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                poller.close();
                break;
            }
            res = poller.wait() => {
                res.with_context(|| format!("Watching {} failed", name))?;
                break;
            }
            Some(event) = events.next() => report(name, event),
        }
    }

    Ok(true)
}

fn report<C: TrackedCount>(name: &str, event: Result<PollerEvent<C>, BroadcastStreamRecvError>) {
    match event {
        Ok(PollerEvent::Start) => info!("[{}] Started", name),
        Ok(PollerEvent::End) => info!("[{}] Ended", name),
        Ok(PollerEvent::Error(e)) => warn!("[{}] {}", name, e),
        Ok(PollerEvent::Raised { previous, next }) => info!(
            "[{}] \"{}\" raised: {} -> {}",
            name,
            next.title(),
            previous.count(),
            next.count()
        ),
        Err(e) => warn!("[{}] Missed events: {}", name, e),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::time::Duration;

    use yt_raised::{
        count::SubscriberCount,
        page::ResolveError,
        poller::PollError,
        types::{ChannelId, Count, PollingInterval, Title},
    };

    use super::*;

    /// A channel with no live stream.
    struct NotLive;

    #[async_trait]
    impl Metric for NotLive {
        type Count = SubscriberCount;

        async fn resolve(&self) -> Result<ChannelId, PollError> {
            Err(ResolveError::NoCanonicalLink.into())
        }

        async fn sample(&self, _target: &ChannelId) -> Result<SubscriberCount, PollError> {
            Err(ResolveError::NoCanonicalLink.into())
        }
    }

    struct Steady;

    #[async_trait]
    impl Metric for Steady {
        type Count = SubscriberCount;

        async fn resolve(&self) -> Result<ChannelId, PollError> {
            Ok(ChannelId::new("@channel").unwrap())
        }

        async fn sample(&self, target: &ChannelId) -> Result<SubscriberCount, PollError> {
            Ok(SubscriberCount::new(
                target.clone(),
                Title::new("channel title"),
                Count::new(1).unwrap(),
            ))
        }
    }

    fn interval() -> PollingInterval {
        PollingInterval::safe(MIN_SAFE_INTERVAL_MS).unwrap()
    }

    #[test]
    fn metric_choice() {
        assert!(MetricChoice::Both.likes() && MetricChoice::Both.subscribers());
        assert!(MetricChoice::Likes.likes() && !MetricChoice::Likes.subscribers());
        assert!(!MetricChoice::Subscribers.likes() && MetricChoice::Subscribers.subscribers());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_start_is_not_fatal() {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller = RaisedEventPoller::new(NotLive, interval());
        assert!(!run("likes", poller, shutdown_rx).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn other_metric_keeps_running() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let likes = run(
            "likes",
            RaisedEventPoller::new(NotLive, interval()),
            shutdown_rx.clone(),
        );
        let subscribers = tokio::spawn(run(
            "subscribers",
            RaisedEventPoller::new(Steady, interval()),
            shutdown_rx,
        ));

        assert!(!likes.await.unwrap());

        // Still polling well after the like poller gave up
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!subscribers.is_finished());

        shutdown_tx.send(true).unwrap();
        assert!(subscribers.await.unwrap().unwrap());
    }
}
