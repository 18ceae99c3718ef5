//! Background jobs: the daily absentee batch and the test status sweep.
//!
//! Both run as tokio tasks owned by [`Scheduler`] and stop when the shutdown
//! channel shared with the HTTP server flips to `true`.

use std::time::Duration;

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, Offset, TimeZone, Utc, Weekday};
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use schoolhub_config::SchedulerConfig;

use crate::modules::assessments::AssessmentService;
use crate::modules::attendance::AttendanceService;

/// The school's local timezone as a fixed offset from UTC.
pub fn school_offset(config: &SchedulerConfig) -> FixedOffset {
    FixedOffset::east_opt(config.utc_offset_minutes * 60)
        .unwrap_or_else(|| Utc.fix())
}

/// Calendar day at the school right now.
pub fn school_today(config: &SchedulerConfig) -> NaiveDate {
    school_date_at(Utc::now(), config)
}

pub fn school_date_at(now: DateTime<Utc>, config: &SchedulerConfig) -> NaiveDate {
    now.with_timezone(&school_offset(config)).date_naive()
}

/// First attendance run strictly after `now`: the configured local time on
/// the next Monday to Saturday.
pub fn next_attendance_run(now: DateTime<Utc>, config: &SchedulerConfig) -> DateTime<Utc> {
    let offset = school_offset(config);
    let local_now = now.with_timezone(&offset);
    let mut day = local_now.date_naive();

    // At most one Sunday is skipped, so eight days always reach a run.
    for _ in 0..8 {
        if day.weekday() != Weekday::Sun {
            let candidate = day
                .and_hms_opt(config.attendance_hour, config.attendance_minute, 0)
                .and_then(|naive| offset.from_local_datetime(&naive).single());
            if let Some(candidate) = candidate {
                if candidate > local_now {
                    return candidate.with_timezone(&Utc);
                }
            }
        }
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }

    now + chrono::Duration::days(1)
}

pub struct Scheduler {
    db: PgPool,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(db: PgPool, config: SchedulerConfig) -> Self {
        Self { db, config }
    }

    /// Spawns both jobs. Returns no handles when the scheduler is disabled.
    pub fn start(self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        if !self.config.enabled {
            info!("Scheduler disabled");
            return Vec::new();
        }

        info!(
            utc_offset_minutes = self.config.utc_offset_minutes,
            attendance_hour = self.config.attendance_hour,
            attendance_minute = self.config.attendance_minute,
            sweep_interval_seconds = self.config.test_sweep_interval_seconds,
            "Starting scheduler"
        );

        vec![
            tokio::spawn(attendance_loop(
                self.db.clone(),
                self.config.clone(),
                shutdown.clone(),
            )),
            tokio::spawn(test_sweep_loop(self.db, self.config, shutdown)),
        ]
    }
}

async fn attendance_loop(db: PgPool, config: SchedulerConfig, mut shutdown: watch::Receiver<bool>) {
    loop {
        let now = Utc::now();
        let next = next_attendance_run(now, &config);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!(next_run = %next, "Attendance batch scheduled");

        tokio::select! {
            _ = shutdown.changed() => {
                info!("Attendance job received shutdown signal");
                break;
            }
            _ = tokio::time::sleep(wait) => {
                let today = school_today(&config);
                if let Err(e) = AttendanceService::run_batch(&db, today).await {
                    error!(error = ?e.error, date = %today, "Attendance batch failed");
                }
            }
        }
    }
}

async fn test_sweep_loop(db: PgPool, config: SchedulerConfig, mut shutdown: watch::Receiver<bool>) {
    let mut timer = interval(Duration::from_secs(config.test_sweep_interval_seconds));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("Test sweep received shutdown signal");
                break;
            }
            _ = timer.tick() => {
                match AssessmentService::complete_due_tests(&db, Utc::now()).await {
                    Ok(0) => {}
                    Ok(count) => info!(count, "Marked tests as completed"),
                    Err(e) => warn!(error = ?e.error, "Test sweep failed"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SchedulerConfig {
        SchedulerConfig::default()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_next_run_same_day() {
        // Tuesday 2026-10-20 00:00 at UTC+05:30 is Monday 18:30 UTC.
        let now = utc("2026-10-19T18:00:00Z");
        assert_eq!(
            next_attendance_run(now, &config()),
            utc("2026-10-19T19:30:00Z")
        );
    }

    #[test]
    fn test_next_run_after_todays_run() {
        // Tuesday 2026-10-20 10:00 local.
        let now = utc("2026-10-20T04:30:00Z");
        assert_eq!(
            next_attendance_run(now, &config()),
            utc("2026-10-20T19:30:00Z")
        );
    }

    #[test]
    fn test_next_run_skips_sunday() {
        // Saturday 2026-10-24 09:00 local; Sunday is skipped, Monday 01:00 local.
        let now = utc("2026-10-24T03:30:00Z");
        assert_eq!(
            next_attendance_run(now, &config()),
            utc("2026-10-25T19:30:00Z")
        );
    }

    #[test]
    fn test_school_date_uses_offset() {
        let now = utc("2026-10-19T20:00:00Z");
        assert_eq!(
            school_date_at(now, &config()),
            NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
        );
        let utc_config = SchedulerConfig {
            utc_offset_minutes: 0,
            ..config()
        };
        assert_eq!(
            school_date_at(now, &utc_config),
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
        );
    }
}
