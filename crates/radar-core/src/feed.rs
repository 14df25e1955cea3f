//! Delivery of tick records from ingestion to sessions.
//!
//! Ingestion pushes records into a [`RecordSink`]. Sessions read them back
//! through a [`FeedCursor`] obtained from a [`TickFeed`]:
//!
//! - **Recorded** -- the whole demo was ingested up front into an
//!   immutable slice. Each cursor walks it from the start.
//! - **Live** -- records go through a bounded [`broadcast`] channel while
//!   ingestion runs. The producer never waits on a consumer: a session
//!   that falls more than the channel capacity behind skips to the oldest
//!   retained record and is told how many it missed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use radar_types::{FeedMode, TickRecord};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Receives derived records in tick order.
pub trait RecordSink {
    /// Accept the next record.
    fn publish(&mut self, record: TickRecord);

    /// Whether the producer should stop feeding this sink.
    fn is_stopped(&self) -> bool {
        false
    }
}

impl RecordSink for Vec<TickRecord> {
    fn publish(&mut self, record: TickRecord) {
        self.push(record);
    }
}

/// Producer-side handle that publishes into a shared [`LiveFeed`].
#[derive(Debug, Clone)]
pub struct LiveSink(Arc<LiveFeed>);

impl LiveSink {
    /// Publish into `feed`.
    pub const fn new(feed: Arc<LiveFeed>) -> Self {
        Self(feed)
    }
}

impl RecordSink for LiveSink {
    fn publish(&mut self, record: TickRecord) {
        self.0.publish(record);
    }

    fn is_stopped(&self) -> bool {
        self.0.is_stopped()
    }
}

/// Sink adapter that sleeps after every record, to replay a demo at a
/// fixed tick rate. Only for use on a blocking thread.
#[derive(Debug)]
pub struct PacedSink<K> {
    inner: K,
    interval: Duration,
}

impl<K: RecordSink> PacedSink<K> {
    /// Wrap `inner`; a zero `interval` disables pacing.
    pub const fn new(inner: K, interval: Duration) -> Self {
        Self { inner, interval }
    }
}

impl<K: RecordSink> RecordSink for PacedSink<K> {
    fn publish(&mut self, record: TickRecord) {
        self.inner.publish(record);
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
    }

    fn is_stopped(&self) -> bool {
        self.inner.is_stopped()
    }
}

/// Event carried on the live channel.
#[derive(Debug, Clone)]
pub enum LiveEvent {
    /// A freshly derived record.
    Tick(Arc<TickRecord>),
    /// Ingestion completed after publishing `ticks` records.
    End {
        /// Total records published.
        ticks: u64,
    },
}

/// Bounded live channel of records with drop-oldest backpressure.
#[derive(Debug)]
pub struct LiveFeed {
    tx: broadcast::Sender<LiveEvent>,
    published: AtomicU64,
    finished: AtomicBool,
    stopped: AtomicBool,
}

impl LiveFeed {
    /// Create a feed retaining at most `capacity` unread records per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            published: AtomicU64::new(0),
            finished: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Publish one record to every current subscriber.
    ///
    /// Never blocks. Having no subscribers is not an error.
    pub fn publish(&self, record: TickRecord) {
        self.published.fetch_add(1, Ordering::SeqCst);
        // send fails only when nobody is subscribed.
        let _ = self.tx.send(LiveEvent::Tick(Arc::new(record)));
    }

    /// Mark ingestion complete and notify subscribers.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
        let ticks = self.published();
        let _ = self.tx.send(LiveEvent::End { ticks });
    }

    /// Whether [`LiveFeed::finish`] has been called.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Ask the producer to stop before the demo is exhausted.
    ///
    /// Subscribers are not sent `end`; the feed simply stops growing.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Whether [`LiveFeed::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Records published so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::SeqCst)
    }

    /// Number of sessions currently attached.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn cursor(self: &Arc<Self>) -> FeedCursor {
        // Subscribe before checking the flag: finish() sets it before
        // sending End, so either the flag is visible here or End is
        // still ahead of this receiver.
        let rx = self.tx.subscribe();
        let ended = self.is_finished().then(|| self.published());
        FeedCursor::Live {
            rx,
            ended,
            done: false,
        }
    }
}

/// Source of records for the serve phase. Cheap to clone.
#[derive(Debug, Clone)]
pub enum TickFeed {
    /// The complete demo, ingested before serving.
    Recorded(Arc<[Arc<TickRecord>]>),
    /// Records published while ingestion runs.
    Live(Arc<LiveFeed>),
}

impl TickFeed {
    /// Freeze a fully ingested demo.
    pub fn recorded(records: Vec<TickRecord>) -> Self {
        Self::Recorded(records.into_iter().map(Arc::new).collect())
    }

    /// The feed mode.
    pub const fn mode(&self) -> FeedMode {
        match self {
            Self::Recorded(_) => FeedMode::Recorded,
            Self::Live(_) => FeedMode::Live,
        }
    }

    /// Number of records a new session will receive, when known.
    pub fn known_len(&self) -> Option<u64> {
        match self {
            Self::Recorded(records) => u64::try_from(records.len()).ok(),
            Self::Live(_) => None,
        }
    }

    /// Start an independent read position for one session.
    pub fn cursor(&self) -> FeedCursor {
        match self {
            Self::Recorded(records) => FeedCursor::Recorded {
                records: Arc::clone(records),
                next: 0,
                done: false,
            },
            Self::Live(feed) => feed.cursor(),
        }
    }
}

/// What a session should write next.
#[derive(Debug, Clone)]
pub enum FeedItem {
    /// A record to forward.
    Tick(Arc<TickRecord>),
    /// The session missed this many records.
    Lagged(u64),
    /// End of the demo; `ticks` records were produced in total.
    End(u64),
}

/// One session's position in a [`TickFeed`].
#[derive(Debug)]
pub enum FeedCursor {
    /// Walking a recorded slice.
    Recorded {
        /// The shared records.
        records: Arc<[Arc<TickRecord>]>,
        /// Index of the next record to yield.
        next: usize,
        /// Whether `End` has been yielded.
        done: bool,
    },
    /// Following a live channel.
    Live {
        /// This session's receiver.
        rx: broadcast::Receiver<LiveEvent>,
        /// Set when the feed had already finished at subscribe time.
        ended: Option<u64>,
        /// Whether `End` has been yielded.
        done: bool,
    },
}

impl FeedCursor {
    /// Wait for the next item.
    ///
    /// Yields [`FeedItem::End`] exactly once, then `None`. Also returns
    /// `None` if a live producer disappeared without finishing. Cancel
    /// safe.
    pub async fn next(&mut self) -> Option<FeedItem> {
        match self {
            Self::Recorded {
                records,
                next,
                done,
            } => {
                if *done {
                    return None;
                }
                if let Some(record) = records.get(*next) {
                    *next = next.saturating_add(1);
                    return Some(FeedItem::Tick(Arc::clone(record)));
                }
                *done = true;
                Some(FeedItem::End(u64::try_from(records.len()).unwrap_or(u64::MAX)))
            }
            Self::Live { rx, ended, done } => {
                if *done {
                    return None;
                }
                if let Some(ticks) = ended.take() {
                    *done = true;
                    return Some(FeedItem::End(ticks));
                }
                match rx.recv().await {
                    Ok(LiveEvent::Tick(record)) => Some(FeedItem::Tick(record)),
                    Ok(LiveEvent::End { ticks }) => {
                        *done = true;
                        Some(FeedItem::End(ticks))
                    }
                    Err(RecvError::Lagged(skipped)) => Some(FeedItem::Lagged(skipped)),
                    Err(RecvError::Closed) => {
                        *done = true;
                        None
                    }
                }
            }
        }
    }
}
