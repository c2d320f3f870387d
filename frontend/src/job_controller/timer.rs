//! Time source shared by the poller (inter-cycle delay) and the client
//! (request deadline).

use std::future::Future;
use std::time::Duration;

use futures_util::future::{select, Either};
use futures_util::pin_mut;

use super::error::JobError;

pub trait Timer {
    type Sleep: Future<Output = ()> + 'static;

    fn sleep(&self, duration: Duration) -> Self::Sleep;
}

/// `setTimeout`-backed timer. Dropping the future clears the timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTimer;

impl Timer for BrowserTimer {
    type Sleep = gloo_timers::future::TimeoutFuture;

    fn sleep(&self, duration: Duration) -> Self::Sleep {
        gloo_timers::future::sleep(duration)
    }
}

/// Runs `work` to completion unless `limit` elapses first.
///
/// On expiry `work` is dropped, `on_expiry` runs once and the result is a
/// `Transient` error.
pub async fn with_deadline<T, W, R>(
    timer: &T,
    limit: Duration,
    work: W,
    on_expiry: impl FnOnce(),
) -> Result<R, JobError>
where
    T: Timer,
    W: Future<Output = Result<R, JobError>>,
{
    let expiry = timer.sleep(limit);
    pin_mut!(work, expiry);

    match select(work, expiry).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => {
            on_expiry();
            Err(JobError::Transient(format!(
                "request timed out after {} ms",
                limit.as_millis()
            )))
        }
    }
}
