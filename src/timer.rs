// src/timer.rs

//! Countdown for timed quizzes, plus the background tasks that watch attempts.

use std::{future::Future, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running { remaining: u64 },
    /// Returned exactly once, on the tick that reaches zero.
    Expired,
    /// Every tick after expiry.
    Finished,
}

/// Seconds-based countdown, advanced one second per `tick`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u64,
    expired: bool,
}

impl Countdown {
    pub fn new(seconds: u64) -> Self {
        Self {
            remaining: seconds,
            expired: false,
        }
    }

    pub fn from_minutes(minutes: u32) -> Self {
        Self::new(u64::from(minutes) * 60)
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn tick(&mut self) -> Tick {
        if self.expired {
            return Tick::Finished;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.expired = true;
            Tick::Expired
        } else {
            Tick::Running {
                remaining: self.remaining,
            }
        }
    }
}

/// Handle to a running countdown task.
///
/// Dropping the handle leaves the countdown running; call `cancel` to stop it.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Runs `task` in the background under a cancellable handle.
    pub fn spawn<Fut>(task: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            task: tokio::spawn(task),
        }
    }

    pub fn cancel(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Drives `countdown` once per second and runs `on_expire` when it hits zero.
pub fn spawn_countdown<F, Fut>(mut countdown: Countdown, on_expire: F) -> TimerHandle
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    TimerHandle::spawn(async move {
        let mut ticker = interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match countdown.tick() {
                Tick::Running { .. } => continue,
                Tick::Expired => {
                    on_expire().await;
                    break;
                }
                Tick::Finished => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::time::sleep;

    #[test]
    fn test_one_minute_expires_after_sixty_ticks() {
        let mut countdown = Countdown::from_minutes(1);
        assert_eq!(countdown.remaining(), 60);

        for expected in (1..60).rev() {
            assert_eq!(countdown.tick(), Tick::Running { remaining: expected });
        }
        assert_eq!(countdown.tick(), Tick::Expired);
        assert_eq!(countdown.tick(), Tick::Finished);
        assert_eq!(countdown.tick(), Tick::Finished);
    }

    #[test]
    fn test_zero_length_expires_on_first_tick() {
        let mut countdown = Countdown::new(0);
        assert_eq!(countdown.tick(), Tick::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_fires_submit_once() {
        let submissions = Arc::new(AtomicUsize::new(0));
        let counter = submissions.clone();

        let handle = spawn_countdown(Countdown::from_minutes(1), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sleep(Duration::from_secs(59)).await;
        assert_eq!(submissions.load(Ordering::SeqCst), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(submissions.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(120)).await;
        assert_eq!(submissions.load(Ordering::SeqCst), 1);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_submit() {
        let submissions = Arc::new(AtomicUsize::new(0));
        let counter = submissions.clone();

        let handle = spawn_countdown(Countdown::from_minutes(1), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sleep(Duration::from_secs(30)).await;
        handle.cancel();

        sleep(Duration::from_secs(120)).await;
        assert_eq!(submissions.load(Ordering::SeqCst), 0);
    }
}
