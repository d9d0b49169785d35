//! Background streaming pull.
//!
//! A subscription runs on its own thread: pull a batch, settle every message through
//! the [`MessageHandler`] in parallel, repeat until cancelled. Ordering between
//! messages is not preserved and callbacks for different messages may overlap.

use crate::cloud::helpers::subscription_path;
use crate::cloud::traits::{CloudIOError, CloudResult, ErrorKind, JsonMap, PubSubIO};
use crate::config::{PubSubSettings, Settings};
use crate::pubsub::handler::{AckHandle, AckMode, MessageHandler, MessageOutcome};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberSettings {
    /// Upper bound on messages per pull
    pub max_messages: u32,
    /// Pause after an empty pull or a transient pull failure
    pub poll_interval: Duration,
}

impl Default for SubscriberSettings {
    fn default() -> Self {
        Self::from(&PubSubSettings::default())
    }
}

impl From<&PubSubSettings> for SubscriberSettings {
    fn from(settings: &PubSubSettings) -> Self {
        Self {
            max_messages: settings.max_messages.max(1),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
        }
    }
}

/// Counters of a running or finished subscription
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionStats {
    pub received: u64,
    pub acked: u64,
    pub nacked: u64,
    pub failed_callbacks: u64,
    pub ack_errors: u64,
}

#[derive(Default)]
struct StatsCounters {
    received: AtomicU64,
    acked: AtomicU64,
    nacked: AtomicU64,
    failed_callbacks: AtomicU64,
    ack_errors: AtomicU64,
}

impl StatsCounters {
    fn record(&self, outcome: MessageOutcome) {
        match outcome {
            MessageOutcome::Acked => {
                self.acked.fetch_add(1, Ordering::Relaxed);
            }
            MessageOutcome::Nacked => {
                self.nacked.fetch_add(1, Ordering::Relaxed);
                self.failed_callbacks.fetch_add(1, Ordering::Relaxed);
            }
            MessageOutcome::AckedBeforeFailure => {
                self.acked.fetch_add(1, Ordering::Relaxed);
                self.failed_callbacks.fetch_add(1, Ordering::Relaxed);
            }
            MessageOutcome::AckFailed => {
                self.ack_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn snapshot(&self) -> SubscriptionStats {
        SubscriptionStats {
            received: self.received.load(Ordering::Relaxed),
            acked: self.acked.load(Ordering::Relaxed),
            nacked: self.nacked.load(Ordering::Relaxed),
            failed_callbacks: self.failed_callbacks.load(Ordering::Relaxed),
            ack_errors: self.ack_errors.load(Ordering::Relaxed),
        }
    }
}

/// Settles one pulled message against the bus.
struct BusAcker<'a> {
    io: &'a dyn PubSubIO,
    subscription: &'a str,
    ack_id: &'a str,
}

impl AckHandle for BusAcker<'_> {
    fn ack(&self) -> CloudResult<()> {
        self.io
            .acknowledge(self.subscription, &[self.ack_id.to_string()])
    }

    fn nack(&self) -> CloudResult<()> {
        self.io
            .negative_acknowledge(self.subscription, &[self.ack_id.to_string()])
    }
}

/// Running subscription. Dropping the handle leaves the subscription running;
/// call [`SubscriptionHandle::cancel`] to stop it.
pub struct SubscriptionHandle {
    subscription: String,
    cancelled: Arc<AtomicBool>,
    stats: Arc<StatsCounters>,
    thread: JoinHandle<CloudResult<SubscriptionStats>>,
}

impl SubscriptionHandle {
    #[must_use]
    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    /// Ask the pull loop to stop after the batch in flight.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// True once the pull loop has returned, by cancellation or by a permanent error
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    #[must_use]
    pub fn stats(&self) -> SubscriptionStats {
        self.stats.snapshot()
    }

    /// Wait for the pull loop to end.
    ///
    /// # Errors
    ///
    /// Returns the permanent pull error that ended the loop, or `Internal` if the
    /// loop thread panicked
    pub fn join(self) -> CloudResult<SubscriptionStats> {
        self.thread.join().map_err(|_| {
            CloudIOError::new(
                ErrorKind::Internal,
                format!("subscription {} thread panicked", self.subscription),
            )
        })?
    }

    /// [`SubscriptionHandle::cancel`] then [`SubscriptionHandle::join`].
    ///
    /// # Errors
    ///
    /// See [`SubscriptionHandle::join`]
    pub fn stop(self) -> CloudResult<SubscriptionStats> {
        self.cancel();
        self.join()
    }
}

/// Starts streaming pulls against subscriptions of one project.
pub struct Subscriber {
    io: Arc<dyn PubSubIO>,
    project_id: String,
    settings: SubscriberSettings,
}

impl Subscriber {
    pub fn new(io: Arc<dyn PubSubIO>, project_id: impl Into<String>) -> Self {
        Self {
            io,
            project_id: project_id.into(),
            settings: SubscriberSettings::default(),
        }
    }

    pub fn from_settings(io: Arc<dyn PubSubIO>, settings: &Settings) -> Self {
        Self::new(io, settings.project.project_id.clone())
            .with_settings(SubscriberSettings::from(&settings.pubsub))
    }

    /// Replace the pull settings; `max_messages` is raised to at least 1.
    #[must_use]
    pub fn with_settings(mut self, settings: SubscriberSettings) -> Self {
        self.settings = SubscriberSettings {
            max_messages: settings.max_messages.max(1),
            ..settings
        };
        self
    }

    /// # Errors
    ///
    /// Returns an error if the project id is empty or the subscription name is invalid
    pub fn subscription_path(&self, subscription_id: &str) -> CloudResult<String> {
        subscription_path(&self.project_id, subscription_id)
    }

    /// Start pulling `subscription_id`, handing each decoded payload to `callback`.
    ///
    /// With [`AckMode::AfterCallback`] a failed callback nacks its message so the bus
    /// redelivers it; with [`AckMode::BeforeCallback`] every message is acked on
    /// receipt.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription path is invalid or the pull thread cannot
    /// be spawned
    pub fn start_subscription<F>(
        &self,
        subscription_id: &str,
        callback: F,
        ack_mode: AckMode,
    ) -> CloudResult<SubscriptionHandle>
    where
        F: Fn(JsonMap) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.start_with_handler(subscription_id, MessageHandler::new(callback, ack_mode))
    }

    /// Start pulling `subscription_id` with a prepared handler.
    ///
    /// # Errors
    ///
    /// See [`Subscriber::start_subscription`]
    pub fn start_with_handler(
        &self,
        subscription_id: &str,
        handler: MessageHandler,
    ) -> CloudResult<SubscriptionHandle> {
        let path = self.subscription_path(subscription_id)?;
        info!(subscription = %path, mode = ?handler.mode(), "starting subscription");

        let cancelled = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(StatsCounters::default());
        let pull_loop = PullLoop {
            io: Arc::clone(&self.io),
            subscription: path.clone(),
            handler,
            settings: self.settings.clone(),
            cancelled: Arc::clone(&cancelled),
            stats: Arc::clone(&stats),
        };

        let thread = thread::Builder::new()
            .name(format!("sub-{subscription_id}"))
            .spawn(move || pull_loop.run())
            .map_err(|e| CloudIOError::from(e).with_context(path.clone()))?;

        Ok(SubscriptionHandle {
            subscription: path,
            cancelled,
            stats,
            thread,
        })
    }
}

struct PullLoop {
    io: Arc<dyn PubSubIO>,
    subscription: String,
    handler: MessageHandler,
    settings: SubscriberSettings,
    cancelled: Arc<AtomicBool>,
    stats: Arc<StatsCounters>,
}

impl PullLoop {
    fn run(self) -> CloudResult<SubscriptionStats> {
        while !self.cancelled.load(Ordering::SeqCst) {
            match self.io.pull(&self.subscription, self.settings.max_messages) {
                Ok(messages) if messages.is_empty() => thread::sleep(self.settings.poll_interval),
                Ok(messages) => {
                    self.stats
                        .received
                        .fetch_add(messages.len() as u64, Ordering::Relaxed);
                    messages.par_iter().for_each(|message| {
                        let acker = BusAcker {
                            io: self.io.as_ref(),
                            subscription: &self.subscription,
                            ack_id: &message.ack_id,
                        };
                        self.stats.record(self.handler.handle(&message.data, &acker));
                    });
                }
                Err(err) if err.is_transient() => {
                    warn!(subscription = %self.subscription, error = %err, "transient pull failure");
                    thread::sleep(self.settings.poll_interval);
                }
                Err(err) => {
                    error!(subscription = %self.subscription, error = %err, "cannot pull from subscription");
                    return Err(err);
                }
            }
        }

        info!(subscription = %self.subscription, "subscription stopped");
        Ok(self.stats.snapshot())
    }
}
