//! Timing for the background jobs.
//!
//! The attendance job runs Monday to Saturday at `ATTENDANCE_JOB_HOUR:ATTENDANCE_JOB_MINUTE`
//! in the school's local time, expressed as a fixed offset from UTC
//! (`SCHEDULER_UTC_OFFSET_MINUTES`, default 330 for UTC+05:30).

use crate::{env_flag, env_parse};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub utc_offset_minutes: i32,
    pub attendance_hour: u32,
    pub attendance_minute: u32,
    pub test_sweep_interval_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            utc_offset_minutes: 330,
            attendance_hour: 1,
            attendance_minute: 0,
            test_sweep_interval_seconds: 60,
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("SCHEDULER_ENABLED", defaults.enabled),
            utc_offset_minutes: env_parse("SCHEDULER_UTC_OFFSET_MINUTES", defaults.utc_offset_minutes)
                .clamp(-14 * 60, 14 * 60),
            attendance_hour: env_parse("ATTENDANCE_JOB_HOUR", defaults.attendance_hour).min(23),
            attendance_minute: env_parse("ATTENDANCE_JOB_MINUTE", defaults.attendance_minute)
                .min(59),
            test_sweep_interval_seconds: env_parse(
                "TEST_SWEEP_INTERVAL_SECONDS",
                defaults.test_sweep_interval_seconds,
            )
            .max(1),
        }
    }
}
