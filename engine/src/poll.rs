use std::time::Duration;

use chrono::Local;
use log::{info, warn};
use tokio::time::{self, Instant, sleep};

use crate::{
    config::Config,
    error::JobError,
    job::{JobHandle, TerminalStatus},
    service::GenerationService,
};

/// Re-fetches a task's status at a fixed cadence until it reaches a terminal
/// state.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    pub interval: Duration,
    /// consecutive transport or throttling errors tolerated before giving up
    pub max_transport_retries: u32,
    pub timeout: Option<Duration>,
}

impl Default for Poller {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Poller {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            interval: cfg.poll_interval,
            max_transport_retries: cfg.max_poll_retries,
            timeout: cfg.poll_timeout,
        }
    }

    /// Returns the first terminal status. With a timeout set, a status
    /// request still in flight when it runs out ends the wait as well.
    pub async fn wait(
        &self,
        service: &(impl GenerationService + ?Sized),
        handle: &JobHandle,
    ) -> Result<TerminalStatus, JobError> {
        info!(
            "Checking task {handle} every {}s",
            self.interval.as_secs_f32()
        );
        let start = Instant::now();
        let mut consecutive_errors = 0;

        loop {
            let fetched = match self.timeout {
                Some(limit) => {
                    let remaining = limit.saturating_sub(start.elapsed());
                    time::timeout(remaining, service.status(handle))
                        .await
                        .map_err(|_| timed_out(handle, start))?
                }
                None => service.status(handle).await,
            };

            match fetched {
                Ok(status) => {
                    consecutive_errors = 0;
                    info!("[{}] status: {}", Local::now().format("%H:%M:%S"), status.state());
                    if let Some(terminal) = status.into_terminal() {
                        return Ok(terminal);
                    }
                }
                Err(e) if e.is_transient() => {
                    consecutive_errors += 1;
                    if consecutive_errors > self.max_transport_retries {
                        return Err(JobError::PollAborted {
                            attempts: consecutive_errors,
                            source: Box::new(e),
                        });
                    }
                    warn!(
                        "Status check failed ({consecutive_errors}/{}), retrying: {e}",
                        self.max_transport_retries
                    );
                }
                Err(e) => return Err(e),
            }

            if self
                .timeout
                .is_some_and(|limit| start.elapsed() + self.interval > limit)
            {
                return Err(timed_out(handle, start));
            }

            sleep(self.interval).await;
        }
    }
}

fn timed_out(handle: &JobHandle, start: Instant) -> JobError {
    JobError::TimedOut {
        handle: handle.clone(),
        elapsed: start.elapsed(),
    }
}
