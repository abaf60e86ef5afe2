// src/attempts.rs

//! Server-held quiz attempts.
//!
//! Starting an attempt on a timed quiz arms a countdown. When it runs out the
//! attempt is submitted with whatever answers were saved so far, through the
//! same path as a manual submit. Whichever path removes the attempt from the
//! registry first is the only one that submits. Untimed attempts are dropped
//! after sitting idle, and each user holds a bounded number of open attempts.
//! Submissions are scored against the quiz as currently stored, not as it was
//! when the attempt started. In-progress attempts live in memory only and do
//! not survive a restart.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{Instant, sleep_until};
use utoipa::ToSchema;

use crate::{
    config::{MAX_OPEN_ATTEMPTS_PER_USER, UNTIMED_ATTEMPT_IDLE_MINUTES},
    db::{
        quizzes,
        submissions::{self, Attempter},
    },
    error::AppError,
    models::{Stored, quiz::Quiz, submission::Submission},
    scoring::Answers,
    store::Store,
    timer::{Countdown, TimerHandle, spawn_countdown},
};

const UNTIMED_IDLE: Duration = Duration::from_secs(UNTIMED_ATTEMPT_IDLE_MINUTES * 60);

struct Attempt {
    /// Start order within this registry.
    seq: u64,
    quiz_id: String,
    time_limit: Option<u32>,
    attempter: Attempter,
    answers: Answers,
    started_at: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
    last_active: Instant,
    timer: Option<TimerHandle>,
}

impl Attempt {
    fn status(&self, id: &str) -> AttemptStatus {
        let remaining_seconds = self
            .deadline
            .map(|deadline| {
                let millis = (deadline - Utc::now()).num_milliseconds().max(0) as u64;
                millis.div_ceil(1000)
            });

        AttemptStatus {
            attempt_id: id.to_string(),
            quiz_id: self.quiz_id.clone(),
            started_at: self.started_at,
            deadline: self.deadline,
            remaining_seconds,
            answered: self.answers.len(),
        }
    }

    fn elapsed_seconds(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStatus {
    pub attempt_id: String,
    pub quiz_id: String,
    pub started_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub remaining_seconds: Option<u64>,
    pub answered: usize,
}

#[derive(Clone, Default)]
pub struct AttemptRegistry {
    inner: Arc<Mutex<HashMap<String, Attempt>>>,
    next_seq: Arc<AtomicU64>,
}

impl AttemptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Attempt>> {
        // A panic while holding the lock leaves the map itself consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Registers an attempt. Timed quizzes get a countdown, untimed ones an idle watch.
    pub fn start(
        &self,
        store: Store,
        quiz: Stored<Quiz>,
        attempter: Attempter,
    ) -> Result<AttemptStatus, AppError> {
        if !submissions::can_take(&quiz, &attempter.user_id) {
            return Err(AppError::Forbidden {
                code: "quiz/not-published",
                message: "This quiz is not accepting submissions.".to_string(),
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let time_limit = quiz.data.time_limit;
        let deadline = time_limit.map(|m| started_at + chrono::Duration::minutes(i64::from(m)));
        let user_id = attempter.user_id.clone();

        let attempt = Attempt {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            quiz_id: quiz.id,
            time_limit,
            attempter,
            answers: Answers::new(),
            started_at,
            deadline,
            last_active: Instant::now(),
            timer: None,
        };
        let status = attempt.status(&id);

        // Insert before arming so an expiry always finds the attempt.
        {
            let mut attempts = self.lock();
            evict_oldest_over_cap(&mut attempts, &user_id);
            attempts.insert(id.clone(), attempt);
        }

        let registry = self.clone();
        let attempt_id = id.clone();
        let handle = match time_limit {
            Some(minutes) => spawn_countdown(Countdown::from_minutes(minutes), move || async move {
                registry.expire(store, &attempt_id).await;
            }),
            None => TimerHandle::spawn(async move {
                registry.drop_when_idle(&attempt_id).await;
            }),
        };

        match self.lock().get_mut(&id) {
            Some(attempt) => attempt.timer = Some(handle),
            None => handle.cancel(),
        }

        tracing::info!(
            "Attempt {} started on quiz {} (time limit: {:?} min)",
            id,
            status.quiz_id,
            time_limit
        );
        Ok(status)
    }

    pub fn status(&self, id: &str, user_id: &str) -> Result<AttemptStatus, AppError> {
        let attempts = self.lock();
        let attempt = owned_attempt(attempts.get(id), user_id)?;
        Ok(attempt.status(id))
    }

    /// Merges answers into the attempt; later values replace earlier ones per question.
    pub fn save_answers(
        &self,
        id: &str,
        user_id: &str,
        answers: Answers,
    ) -> Result<AttemptStatus, AppError> {
        let mut attempts = self.lock();
        owned_attempt(attempts.get(id), user_id)?;

        let Some(attempt) = attempts.get_mut(id) else {
            return Err(attempt_gone());
        };
        attempt.answers.extend(answers);
        attempt.last_active = Instant::now();
        Ok(attempt.status(id))
    }

    /// Manual submit. Cancels the countdown.
    pub async fn submit(
        &self,
        store: &Store,
        id: &str,
        user_id: &str,
    ) -> Result<Stored<Submission>, AppError> {
        let mut attempt = self.take(id, user_id)?;
        attempt.stop_timer();

        let quiz = quizzes::require_quiz(store.as_ref(), &attempt.quiz_id).await?;
        let time_spent = attempt.elapsed_seconds();
        submissions::submit_answers(
            store.as_ref(),
            &quiz,
            &attempt.attempter,
            attempt.answers,
            time_spent,
            false,
        )
        .await
    }

    /// Drops the attempt without submitting (the taker left the quiz).
    pub fn abandon(&self, id: &str, user_id: &str) -> Result<(), AppError> {
        let mut attempt = self.take(id, user_id)?;
        attempt.stop_timer();
        tracing::info!("Attempt {} abandoned", id);
        Ok(())
    }

    fn take(&self, id: &str, user_id: &str) -> Result<Attempt, AppError> {
        let mut attempts = self.lock();
        owned_attempt(attempts.get(id), user_id)?;
        attempts.remove(id).ok_or_else(attempt_gone)
    }

    /// Countdown callback: submits whatever was saved, unless a manual submit won.
    async fn expire(&self, store: Store, id: &str) {
        let Some(attempt) = self.lock().remove(id) else {
            return;
        };

        let time_spent = attempt
            .time_limit
            .map(|m| u64::from(m) * 60)
            .unwrap_or_else(|| attempt.elapsed_seconds());

        let result = async {
            let quiz = quizzes::require_quiz(store.as_ref(), &attempt.quiz_id).await?;
            submissions::submit_answers(
                store.as_ref(),
                &quiz,
                &attempt.attempter,
                attempt.answers,
                time_spent,
                true,
            )
            .await
        }
        .await;

        match result {
            Ok(submission) => {
                tracing::info!("Attempt {} auto-submitted as {}", id, submission.id)
            }
            Err(e) => tracing::error!("Auto-submit of attempt {} failed: {}", id, e),
        }
    }

    /// Idle watch for untimed attempts: drops the attempt once no answers were
    /// saved for `UNTIMED_IDLE`. Nothing is submitted.
    async fn drop_when_idle(&self, id: &str) {
        loop {
            let due = {
                let mut attempts = self.lock();
                let Some(attempt) = attempts.get(id) else {
                    return;
                };
                let due = attempt.last_active + UNTIMED_IDLE;
                if Instant::now() >= due {
                    attempts.remove(id);
                    tracing::info!("Attempt {} dropped after sitting idle", id);
                    return;
                }
                due
            };
            sleep_until(due).await;
        }
    }
}

/// Makes room for one more attempt by `user_id`, evicting their oldest ones.
fn evict_oldest_over_cap(attempts: &mut HashMap<String, Attempt>, user_id: &str) {
    let mut owned: Vec<(u64, String)> = attempts
        .iter()
        .filter(|(_, attempt)| attempt.attempter.user_id == user_id)
        .map(|(id, attempt)| (attempt.seq, id.clone()))
        .collect();
    if owned.len() < MAX_OPEN_ATTEMPTS_PER_USER {
        return;
    }

    owned.sort();
    let excess = owned.len() + 1 - MAX_OPEN_ATTEMPTS_PER_USER;
    for (_, id) in owned.into_iter().take(excess) {
        if let Some(mut attempt) = attempts.remove(&id) {
            attempt.stop_timer();
            tracing::warn!("Attempt {} evicted: {} has too many open attempts", id, user_id);
        }
    }
}

fn attempt_gone() -> AppError {
    AppError::NotFound("Attempt not found or already submitted".to_string())
}

fn owned_attempt<'a>(attempt: Option<&'a Attempt>, user_id: &str) -> Result<&'a Attempt, AppError> {
    let attempt = attempt.ok_or_else(attempt_gone)?;
    if attempt.attempter.user_id != user_id {
        return Err(AppError::Forbidden {
            code: "attempt/not-owner",
            message: "This attempt belongs to another user.".to_string(),
        });
    }
    Ok(attempt)
}
