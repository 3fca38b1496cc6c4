//! # yt-raised
//!
//! This crate watches a YouTube channel's live stream and reports when the
//! stream's like count or the channel's subscriber count goes up.
//!
//! The live video is found by scraping the channel's `/live` page, the
//! numbers come from the YouTube Data API v3. Every poller keeps the best
//! value it has seen so far and only reports strict increases, so stale or
//! briefly lower numbers from the API never show up as events.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use yt_raised::{config::WatchConfig, poller::{LikeCountPoller, PollerEvent}, util};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = WatchConfig::new("@channel", 10_000, "your-api-key").unwrap();
//!
//!     // Create HttpClient, a wrapper around reqwest::Client but includes a
//!     // middleware for retrying transient errors
//!     let client = util::HttpClient::new().unwrap();
//!
//!     let mut poller = LikeCountPoller::like_count(&config, client);
//!     let mut events = poller.subscribe();
//!
//!     if !poller.start().await {
//!         println!("Channel is not live");
//!         return;
//!     }
//!
//!     while let Ok(event) = events.recv().await {
//!         if let PollerEvent::Raised { previous, next } = event {
//!             println!("{} -> {}", previous, next);
//!         }
//!     }
//! }
//! ```
//!
//! Likes and subscribers are watched by two independent pollers, each with
//! its own loop and interval. They share nothing but the channel.

#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

pub mod api;
pub mod config;
pub mod count;
pub mod page;
pub mod poller;
pub mod tracker;
pub mod types;
pub mod util;
