//! Application events.
//!
//! Terminal input, the render tick, data arrivals, and the side effects the
//! remote client reports (session invalidation, transient toasts) all flow
//! through one channel into the app loop. Making `SessionInvalidated` an
//! explicit event keeps the 401 teardown out of hidden interceptor control
//! flow: the app shell subscribes to it exactly once.

use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use tokio::sync::mpsc;

use crate::platform::types::{
  BlogDetail, BlogSummary, Comment, HomebrewSummary, Notification, Page, Profile,
};

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh and toast expiry
  Tick,
  /// Data arrived from the platform
  Platform(PlatformEvent),
  /// Session lifecycle changes
  Session(SessionEvent),
  /// Transient user-visible notification
  Toast(Toast),
}

/// Results of spawned platform calls.
#[derive(Debug)]
pub enum PlatformEvent {
  BlogsLoaded(Page<BlogSummary>),
  BlogLoaded(Box<BlogDetail>),
  CommentsLoaded { slug: String, comments: Vec<Comment> },
  NotificationsLoaded(Page<Notification>),
  UnreadCountLoaded(u64),
  HomebrewLoaded(Page<HomebrewSummary>),
  /// An optimistic mutation reached a terminal phase; views should re-read
  /// the cache.
  MutationSettled,
}

#[derive(Debug)]
pub enum SessionEvent {
  /// Emitted by the remote client exactly once per 401 teardown.
  Invalidated,
  /// Login completed.
  LoggedIn(Box<Profile>),
  /// Startup bootstrap confirmed the stored token.
  ProfileConfirmed(Box<Profile>),
  /// Startup bootstrap could not confirm the stored token.
  BootstrapFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
  Info,
  Error,
}

/// Fire-and-forget user feedback, rendered transiently above the status bar.
#[derive(Debug, Clone)]
pub struct Toast {
  pub level: ToastLevel,
  pub message: String,
}

impl Toast {
  pub fn info(message: impl Into<String>) -> Self {
    Self {
      level: ToastLevel::Info,
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      level: ToastLevel::Error,
      message: message.into(),
    }
  }
}

/// Event handler that produces events from terminal input and a tick timer,
/// and fans in events sent by spawned tasks.
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn terminal event reader
    let input_tx = tx.clone();
    tokio::spawn(async move {
      loop {
        if event::poll(tick_rate).unwrap_or(false) {
          if let Ok(CrosstermEvent::Key(key)) = event::read() {
            if input_tx.send(Event::Key(key)).is_err() {
              break;
            }
          }
        } else {
          // Tick
          if input_tx.send(Event::Tick).is_err() {
            break;
          }
        }
      }
    });

    Self { tx, rx }
  }

  /// Sender handle for spawned tasks to report back with.
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
