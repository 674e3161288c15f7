//! Frame Loop - ~60Hz session driver
//!
//! Drains queued input and store snapshots into the session once per frame,
//! advances held-key movement, then publishes a fresh `SessionView`.
//! Store feeds are pumped by small forwarding tasks into the same queue, so
//! the session sees inputs and snapshots in one ordered stream.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use realtime_store::Subscription;
use std::time::{Duration, Instant};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    error::SessionError,
    session::{FeedKind, GameSession, SessionEvent, SessionView},
};

/// Event queue capacity
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Handle for submitting events to the frame loop
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<SessionEvent>,
}

impl EventSender {
    /// Queue an event for the next frame
    pub fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => SessionError::QueueFull,
            TrySendError::Disconnected(_) => SessionError::Stopped,
        })
    }
}

/// Frame loop
///
/// Owns the game session for its whole lifetime and tears it down on exit.
pub struct FrameLoop {
    session: GameSession,
    event_receiver: Receiver<SessionEvent>,
    event_sender: Sender<SessionEvent>,
    view_sender: watch::Sender<SessionView>,
    frame_ms: u64,
    feeds: Vec<JoinHandle<()>>,
}

impl FrameLoop {
    /// Wrap a joined session and start forwarding its store feeds
    pub fn new(mut session: GameSession) -> Self {
        let (event_sender, event_receiver) = bounded(EVENT_QUEUE_CAPACITY);
        let (view_sender, _) = watch::channel(session.view());
        let frame_ms = session.config().frame_ms.max(1);

        let feeds = session
            .take_feeds()
            .into_iter()
            .map(|(kind, feed)| spawn_feed(kind, feed, event_sender.clone()))
            .collect();

        Self {
            session,
            event_receiver,
            event_sender,
            view_sender,
            frame_ms,
            feeds,
        }
    }

    /// Get a sender for submitting events
    pub fn event_sender(&self) -> EventSender {
        EventSender {
            sender: self.event_sender.clone(),
        }
    }

    /// Watch the per-frame view
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_sender.subscribe()
    }

    /// Run until a `Shutdown` event, then tear the session down
    pub async fn run(mut self) {
        let frame_duration = Duration::from_millis(self.frame_ms);
        let mut interval = tokio::time::interval(frame_duration);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(
            "Frame loop started ({}ms frames, {}Hz)",
            self.frame_ms,
            1000 / self.frame_ms
        );

        let mut running = true;
        while running {
            interval.tick().await;
            let frame_start = Instant::now();

            // Drain event queue
            loop {
                match self.event_receiver.try_recv() {
                    Ok(SessionEvent::Shutdown) => {
                        running = false;
                        break;
                    }
                    Ok(event) => self.session.handle_event(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        tracing::warn!("Event channel disconnected");
                        running = false;
                        break;
                    }
                }
            }

            if running {
                self.session.tick();
            }
            self.view_sender.send_replace(self.session.view());

            let processing_time = frame_start.elapsed();
            if processing_time > frame_duration {
                tracing::warn!(
                    "Frame took {:.2}ms (target: {}ms)",
                    processing_time.as_secs_f64() * 1000.0,
                    self.frame_ms
                );
            }
        }

        for feed in self.feeds.drain(..) {
            feed.abort();
        }
        self.session.teardown().await;

        tracing::info!("Frame loop stopped");
    }
}

/// Forward every snapshot of a store feed into the event queue
fn spawn_feed(
    kind: FeedKind,
    mut feed: Subscription,
    sender: Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(snapshot) = feed.next().await {
            match sender.try_send(kind.event(snapshot)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("Event queue full; dropped {} snapshot", kind.path());
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }
        tracing::debug!("{} feed closed", kind.path());
    })
}
