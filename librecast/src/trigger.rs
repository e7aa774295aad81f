//! Trigger evaluation: deciding, each tick, which schedules fire.
//!
//! The evaluator walks every stored schedule through a fixed decision
//! ladder (deactivation, bootstrap, due-window check) and hands due ones to
//! the publisher. One misbehaving schedule never stops the others; its error
//! is logged and the walk continues. Mutated schedules are persisted in a
//! single save at the end of the tick.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{RecastError, Result};
use crate::publish::PostPublisher;
use crate::recurrence;
use crate::store::{NextPostProvider, ScheduleStore};
use crate::types::{QueuedPost, Schedule};

/// How many upcoming posts and occurrences a lookup reports.
const LOOKUP_COUNT: usize = 3;

/// Read-only preview of what a schedule will do next.
#[derive(Debug, Serialize)]
pub struct ScheduleLookups {
    pub next_posts: Vec<QueuedPost>,
    pub next_occurrences: Vec<DateTime<Utc>>,
}

pub struct TriggerEvaluator {
    store: Arc<dyn ScheduleStore>,
    provider: Arc<dyn NextPostProvider>,
    publisher: PostPublisher,
    /// Width of the due window behind "now". Occurrences older than this
    /// were missed while the daemon was down and are not caught up.
    tick_window: chrono::Duration,
}

impl TriggerEvaluator {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        provider: Arc<dyn NextPostProvider>,
        publisher: PostPublisher,
        tick_window: std::time::Duration,
    ) -> Self {
        let tick_window =
            chrono::Duration::from_std(tick_window).unwrap_or_else(|_| chrono::Duration::minutes(1));
        Self {
            store,
            provider,
            publisher,
            tick_window,
        }
    }

    /// Run one tick against the wall clock.
    pub async fn tick(&self) {
        self.tick_at(Utc::now()).await;
    }

    /// Run one tick at a fixed instant. Never fails: store and schedule
    /// errors are logged and the daemon keeps ticking.
    pub async fn tick_at(&self, now: DateTime<Utc>) {
        let mut schedules = match self.store.load_schedules().await {
            Ok(schedules) => schedules,
            Err(e) => {
                error!("failed to load schedules: {}", e);
                return;
            }
        };

        let mut changed = false;
        for schedule in schedules.iter_mut() {
            match self.evaluate(schedule, now).await {
                Ok(mutated) => changed |= mutated,
                Err(e) => {
                    error!(
                        schedule_id = %schedule.id,
                        schedule = %schedule.name,
                        "schedule evaluation failed: {}",
                        e
                    );
                }
            }
        }

        if changed {
            if let Err(e) = self.store.save_schedules(schedules).await {
                // A conflicting external edit wins; our mutations are
                // recomputed from fresh state on the next tick.
                warn!("failed to persist schedules after tick: {}", e);
            }
        }
    }

    /// Walk one schedule through the decision ladder. Returns whether the
    /// schedule was mutated and needs persisting. The first matching rule
    /// decides; later rules are not consulted.
    async fn evaluate(&self, schedule: &mut Schedule, now: DateTime<Utc>) -> Result<bool> {
        if schedule.id.is_empty() || schedule.group.is_empty() {
            debug!("skipping malformed schedule entry without id or group");
            return Ok(false);
        }

        if let Some(end) = schedule.end_time {
            if end <= now {
                if schedule.is_active {
                    info!(schedule = %schedule.name, "schedule reached its end time, deactivating");
                    schedule.is_active = false;
                    return Ok(true);
                }
                return Ok(false);
            }
        }

        if !schedule.is_active {
            return Ok(false);
        }

        if let Some(start) = schedule.start_time {
            if start > now {
                return Ok(false);
            }
        }

        // First sighting: anchor the recurrence at "now" instead of
        // replaying occurrences since the schedule was created.
        let last_triggered = match schedule.last_triggered {
            Some(at) => at,
            None => {
                debug!(schedule = %schedule.name, "bootstrapping last-triggered time");
                schedule.last_triggered = Some(now);
                schedule.next_trigger =
                    recurrence::resolve(now, &schedule.frequency, 1)
                        .ok()
                        .and_then(|mut v| v.pop());
                return Ok(true);
            }
        };

        let next_run = match recurrence::resolve(last_triggered, &schedule.frequency, 1) {
            Ok(occurrences) => match occurrences.into_iter().next() {
                Some(at) => at,
                None => return Ok(false),
            },
            Err(e) => {
                warn!(
                    schedule = %schedule.name,
                    "cannot compute next occurrence: {}",
                    e
                );
                return Ok(false);
            }
        };

        if next_run > now {
            return Ok(false);
        }

        if next_run < now - self.tick_window {
            // Missed while the daemon was down. No catch-up; the schedule
            // realigns from its next computed occurrence.
            debug!(
                schedule = %schedule.name,
                next_run = %next_run,
                "occurrence fell outside the tick window, skipping"
            );
            return Ok(false);
        }

        info!(schedule = %schedule.name, "schedule is due");
        self.publisher.publish_next(schedule).await;

        schedule.last_triggered = Some(now);
        schedule.next_trigger = recurrence::resolve(now, &schedule.frequency, 1)
            .ok()
            .and_then(|mut v| v.pop());
        Ok(true)
    }

    /// Fire one schedule immediately, bypassing the due-window check.
    /// Inactive schedules are refused; their state never moves.
    pub async fn trigger_now(&self, schedule_id: &str) -> Result<()> {
        let mut schedules = self.store.load_schedules().await?;
        let schedule = schedules
            .iter_mut()
            .find(|s| s.id == schedule_id)
            .ok_or_else(|| RecastError::NotFound(format!("schedule not found: {}", schedule_id)))?;

        if !schedule.is_active {
            return Err(RecastError::InvalidInput(format!(
                "schedule '{}' is inactive",
                schedule_id
            )));
        }

        let now = Utc::now();
        self.publisher.publish_next(schedule).await;
        schedule.last_triggered = Some(now);
        schedule.next_trigger = recurrence::resolve(now, &schedule.frequency, 1)
            .ok()
            .and_then(|mut v| v.pop());

        self.store.save_schedules(schedules).await
    }

    /// Preview the next few posts and occurrences for a schedule without
    /// mutating anything.
    pub async fn compute_lookups(
        &self,
        schedule_id: &str,
        from: Option<DateTime<Utc>>,
    ) -> Result<ScheduleLookups> {
        let schedules = self.store.load_schedules().await?;
        let schedule = schedules
            .iter()
            .find(|s| s.id == schedule_id)
            .ok_or_else(|| RecastError::NotFound(format!("schedule not found: {}", schedule_id)))?;

        let base = from
            .or(schedule.last_triggered)
            .unwrap_or_else(Utc::now);
        let next_occurrences = recurrence::resolve(base, &schedule.frequency, LOOKUP_COUNT)?;
        let next_posts = self.provider.pending_posts(schedule, LOOKUP_COUNT).await?;

        Ok(ScheduleLookups {
            next_posts,
            next_occurrences,
        })
    }
}
