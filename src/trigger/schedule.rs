//! Scheduled trigger
//!
//! Sleeps until the next configured local time, runs the workflow once,
//! and goes back to sleep. Failures are logged; they never stop the loop.

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone};
use std::sync::Arc;
use tokio::sync::watch;

use super::Runner;
use crate::error::{Error, Result};
use crate::logging::Severity;

const SOURCE: &str = "schedule";

/// Fallback sleep when the next tick cannot be placed on the local clock
const RETRY_SLEEP: std::time::Duration = std::time::Duration::from_secs(60);

/// Daily tick times in local time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSchedule {
    times: Vec<NaiveTime>,
}

impl TickSchedule {
    /// Parse `HH:MM` entries, sorted and deduplicated
    ///
    /// # Errors
    ///
    /// Returns a config error for an empty list or a malformed entry
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let mut times = entries
            .iter()
            .map(|entry| {
                let entry = entry.as_ref().trim();
                NaiveTime::parse_from_str(entry, "%H:%M").map_err(|_| {
                    Error::config(format!("Invalid tick time '{entry}'. Expected HH:MM"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if times.is_empty() {
            return Err(Error::config("schedule needs at least one tick time"));
        }

        times.sort();
        times.dedup();
        Ok(Self { times })
    }

    pub fn times(&self) -> &[NaiveTime] {
        &self.times
    }

    /// First tick strictly after `now`
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date();
        if let Some(time) = self.times.iter().find(|t| today.and_time(**t) > now) {
            return today.and_time(*time);
        }

        let tomorrow = today.succ_opt().unwrap_or(today);
        tomorrow.and_time(self.times[0])
    }

    /// Time left until the next tick
    ///
    /// Ticks that fall in a DST gap are skipped by retrying a minute later.
    pub fn duration_until_next(&self, now: DateTime<Local>) -> std::time::Duration {
        let next = self.next_after(now.naive_local());
        match Local.from_local_datetime(&next).earliest() {
            Some(target) => (target - now)
                .max(Duration::zero())
                .to_std()
                .unwrap_or(RETRY_SLEEP),
            None => RETRY_SLEEP,
        }
    }
}

/// Runs the workflow at every tick until stopped
pub struct ScheduledTrigger {
    schedule: TickSchedule,
    runner: Arc<Runner>,
    run_on_startup: bool,
    stop_tx: watch::Sender<bool>,
}

impl ScheduledTrigger {
    pub fn new(schedule: TickSchedule, runner: Arc<Runner>, run_on_startup: bool) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            schedule,
            runner,
            run_on_startup,
            stop_tx,
        }
    }

    /// Run one scheduled event and log its outcome
    pub async fn tick(&self) {
        let report = self.runner.run().await;
        let sink = self.runner.workflow().sink();
        match report.summary() {
            Ok(result) => sink.record(
                SOURCE,
                "tick",
                &format!("Scheduled event completed: {result}"),
                Severity::Info,
            ),
            Err(e) => sink.record(
                SOURCE,
                "tick",
                &format!("Scheduled event error: {e}"),
                // the failing stage already raised the alert
                Severity::Warning,
            ),
        }
    }

    /// Loop until [`stop`](Self::stop) is called
    pub async fn start(&self) {
        let mut stop_rx = self.stop_tx.subscribe();

        if self.run_on_startup {
            self.tick().await;
        }

        while !*stop_rx.borrow() {
            let sleep = self.schedule.duration_until_next(Local::now());
            tracing::info!(
                sleep_secs = sleep.as_secs(),
                next = %self.schedule.next_after(Local::now().naive_local()),
                "waiting for next tick"
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep) => self.tick().await,
                _ = stop_rx.changed() => break,
            }
        }

        tracing::info!("scheduled trigger stopped");
    }

    /// Ask the loop to exit after the current run
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_sorts_and_dedups() {
        let schedule = TickSchedule::parse(&["17:00", "08:30", "17:00"]).unwrap();
        assert_eq!(schedule.times().len(), 2);
        assert_eq!(schedule.times()[0], NaiveTime::from_hms_opt(8, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_bad_entries() {
        assert!(TickSchedule::parse(&["5pm"]).is_err());
        assert!(TickSchedule::parse::<&str>(&[]).is_err());
    }

    #[test]
    fn test_next_tick_later_today() {
        let schedule = TickSchedule::parse(&["08:30", "17:00"]).unwrap();
        assert_eq!(schedule.next_after(at(9, 0)), at(17, 0));
        assert_eq!(schedule.next_after(at(6, 0)), at(8, 30));
    }

    #[test]
    fn test_next_tick_rolls_to_tomorrow() {
        let schedule = TickSchedule::parse(&["17:00"]).unwrap();
        let next = schedule.next_after(at(17, 0));

        assert_eq!(next.date(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(next.time(), NaiveTime::from_hms_opt(17, 0, 0).unwrap());
    }

    #[test]
    fn test_duration_until_next_is_bounded() {
        let schedule = TickSchedule::parse(&["17:00"]).unwrap();
        let sleep = schedule.duration_until_next(Local::now());
        assert!(sleep <= std::time::Duration::from_secs(25 * 3600));
    }
}
