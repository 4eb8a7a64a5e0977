//! Caller side long-poll loop.
//!
//! [`Session::status`] is one-shot. `PollLoop` re-issues it back to back and
//! forwards each body on a channel:
//!
//! - after a successful poll the next request goes out immediately, or after
//!   `interval` if one is set;
//! - after a failed poll it waits `error_backoff` times the number of
//!   consecutive failures;
//! - it stops when the receiver is dropped, when the session is not
//!   connected, or after `max_consecutive_errors` failures in a row.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::session::Session;
use crate::transport::HttpTransport;

const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 5;
const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_millis(1000);

/// Why a [`PollLoop`] stopped.
#[derive(Debug)]
pub enum PollExit {
    /// The receiving side of the event channel went away.
    ReceiverClosed,
    /// Polling failed `max_consecutive_errors` times in a row, or hit an
    /// error that retrying cannot fix.
    Failed(Error),
}

/// Repeatedly long-polls a session.
#[derive(Debug, Clone)]
pub struct PollLoop {
    interval: Duration,
    error_backoff: Duration,
    max_consecutive_errors: u32,
}

impl Default for PollLoop {
    fn default() -> Self {
        Self {
            interval: Duration::ZERO,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
        }
    }
}

impl PollLoop {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause between successful polls.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Base delay after a failed poll.
    #[must_use]
    pub fn error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Consecutive failures tolerated before giving up. Clamped to at least 1.
    #[must_use]
    pub fn max_consecutive_errors(mut self, max: u32) -> Self {
        self.max_consecutive_errors = max.max(1);
        self
    }

    /// Poll `session` until the receiver is dropped or polling gives up.
    pub async fn run<T: HttpTransport>(
        &self,
        session: &Session<T>,
        events: mpsc::Sender<Value>,
    ) -> PollExit {
        info!(session_id = ?session.id(), "starting poll loop");

        let mut consecutive_errors = 0u32;

        let exit = loop {
            if events.is_closed() {
                break PollExit::ReceiverClosed;
            }

            match session.status().await {
                Ok(body) => {
                    consecutive_errors = 0;
                    debug!(janus = body["janus"].as_str().unwrap_or_default(), "poll event");

                    if events.send(body).await.is_err() {
                        break PollExit::ReceiverClosed;
                    }

                    if !self.interval.is_zero() {
                        tokio::time::sleep(self.interval).await;
                    }
                }
                Err(Error::NotConnected) => break PollExit::Failed(Error::NotConnected),
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(error = %e, consecutive_errors, "poll error");

                    if consecutive_errors >= self.max_consecutive_errors {
                        error!("poll loop: too many consecutive errors, stopping");
                        break PollExit::Failed(e);
                    }

                    tokio::time::sleep(self.error_backoff * consecutive_errors).await;
                }
            }
        };

        info!(?exit, "poll loop exited");
        exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let poll = PollLoop::new();
        assert_eq!(poll.interval, Duration::ZERO);
        assert_eq!(poll.error_backoff, DEFAULT_ERROR_BACKOFF);
        assert_eq!(poll.max_consecutive_errors, DEFAULT_MAX_CONSECUTIVE_ERRORS);
    }

    #[test]
    fn test_max_errors_clamped() {
        let poll = PollLoop::new().max_consecutive_errors(0);
        assert_eq!(poll.max_consecutive_errors, 1);
    }
}
