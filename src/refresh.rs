//! Background listing refresh.
//!
//! A spawned task polls the markets endpoint on a fixed interval and
//! publishes each result over a bounded channel. When the consumer falls
//! behind, the producer waits on the channel before polling again; when the
//! consumer drops the receiver, the task ends. Shutdown interrupts both the
//! poll and a blocked send.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::api::{CoinGeckoClient, CoinMarket, Currency, decode};
use crate::fetch::{RequestFailure, RequestOutcome};

/// Default polling interval for the market listing.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Updates buffered between the refresh task and its consumer.
pub const DEFAULT_REFRESH_BUFFER: usize = 8;

/// Messages sent from the refresh task.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshMessage {
    /// A fresh (or still cached) listing.
    Listings {
        currency: Currency,
        coins: Vec<CoinMarket>,
    },
    /// The poll failed; the task keeps running.
    Failed(RequestFailure),
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub interval: Duration,
    pub currency: Currency,
    /// Serve polls from the response cache while entries are fresh.
    pub use_cache: bool,
    pub buffer: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            currency: Currency::default(),
            use_cache: true,
            buffer: DEFAULT_REFRESH_BUFFER,
        }
    }
}

/// Handle to a running refresh task.
pub struct RefreshHandle {
    receiver: mpsc::Receiver<RefreshMessage>,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Spawn the refresh task. The first poll happens immediately.
    ///
    /// Requires a tokio runtime context.
    pub fn spawn(client: CoinGeckoClient, config: RefreshConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(config.buffer.max(1));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let period = config.interval.max(Duration::from_millis(1));
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let publish = async {
                            let message = poll(&client, &config).await;
                            msg_tx.send(message).await.is_ok()
                        };
                        let delivered = tokio::select! {
                            delivered = publish => delivered,
                            _ = shutdown_rx.recv() => false,
                        };
                        if !delivered {
                            break;
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                    _ = msg_tx.closed() => break,
                }
            }
            debug!(currency = %config.currency, "listing refresh stopped");
        });

        Self {
            receiver: msg_rx,
            shutdown_tx,
            task,
        }
    }

    /// Wait for the next update. `None` once the task has stopped.
    pub async fn recv(&mut self) -> Option<RefreshMessage> {
        self.receiver.recv().await
    }

    /// Next update if one is already buffered.
    pub fn try_recv(&mut self) -> Option<RefreshMessage> {
        self.receiver.try_recv().ok()
    }

    /// Consume the handle as a stream of updates. The task ends when the
    /// stream is dropped.
    pub fn into_stream(self) -> ReceiverStream<RefreshMessage> {
        ReceiverStream::new(self.receiver)
    }

    /// Stop the task and wait for it to finish. Buffered updates are
    /// discarded.
    pub async fn shutdown(self) {
        let Self {
            receiver,
            shutdown_tx,
            task,
        } = self;
        drop(receiver);
        let _ = shutdown_tx.send(()).await;
        let _ = task.await;
    }
}

async fn poll(client: &CoinGeckoClient, config: &RefreshConfig) -> RefreshMessage {
    let outcome = if config.use_cache {
        client.markets(config.currency).await
    } else {
        client.markets_fresh(config.currency).await
    };

    match outcome {
        RequestOutcome::Success(payload) => match decode::<Vec<CoinMarket>>(&payload) {
            Ok(coins) => RefreshMessage::Listings {
                currency: config.currency,
                coins,
            },
            Err(error) => RefreshMessage::Failed(RequestFailure::from_error(&error)),
        },
        RequestOutcome::Failure(failure) => RefreshMessage::Failed(failure),
    }
}
