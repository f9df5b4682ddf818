//! Scheduled triggers: which procedure runs, and when.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::TriggerError;

/// Procedure a trigger invokes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handler {
    CheckInventoryLevels,
    ApplyUsageLog,
    RunAiPrediction,
}

impl Handler {
    pub fn name(&self) -> &'static str {
        match self {
            Handler::CheckInventoryLevels => "check_inventory_levels",
            Handler::ApplyUsageLog => "apply_usage_log",
            Handler::RunAiPrediction => "run_ai_prediction",
        }
    }
}

impl core::fmt::Display for Handler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Schedule kind, used to detect an existing trigger regardless of its hour.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScheduleKind {
    Daily,
    Monthly,
}

/// Cron-like schedule evaluated in the caller's timezone.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "every", rename_all = "snake_case")]
pub enum Schedule {
    /// Every day at `hour`:00.
    Daily { hour: u32 },
    /// Day `day` of every month at `hour`:00.
    Monthly { day: u32, hour: u32 },
}

impl Schedule {
    pub fn daily(hour: u32) -> Result<Self, TriggerError> {
        let schedule = Schedule::Daily { hour };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn monthly(day: u32, hour: u32) -> Result<Self, TriggerError> {
        let schedule = Schedule::Monthly { day, hour };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn kind(&self) -> ScheduleKind {
        match self {
            Schedule::Daily { .. } => ScheduleKind::Daily,
            Schedule::Monthly { .. } => ScheduleKind::Monthly,
        }
    }

    pub fn validate(&self) -> Result<(), TriggerError> {
        let hour = match *self {
            Schedule::Daily { hour } => hour,
            Schedule::Monthly { day, hour } => {
                // Capped at 28 so the trigger fires every month.
                if !(1..=28).contains(&day) {
                    return Err(TriggerError::InvalidSchedule(format!(
                        "day of month must be in 1..=28 (got {day})"
                    )));
                }
                hour
            }
        };
        if hour > 23 {
            return Err(TriggerError::InvalidSchedule(format!(
                "hour must be in 0..=23 (got {hour})"
            )));
        }
        Ok(())
    }

    /// First fire time strictly after `after`, in `after`'s timezone.
    ///
    /// Local times that do not exist (DST gaps) are skipped.
    pub fn next_fire_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = after.timezone();
        let start = after.date_naive();

        match *self {
            Schedule::Daily { hour } => (0..=2u64)
                .filter_map(|offset| {
                    let date = start.checked_add_days(Days::new(offset))?;
                    local_at(&tz, date, hour)
                })
                .find(|candidate| candidate > after),
            Schedule::Monthly { day, hour } => {
                let (mut year, mut month) = (start.year(), start.month());
                for _ in 0..=12 {
                    if let Some(candidate) = NaiveDate::from_ymd_opt(year, month, day)
                        .and_then(|date| local_at(&tz, date, hour))
                    {
                        if candidate > *after {
                            return Some(candidate);
                        }
                    }
                    (year, month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
                }
                None
            }
        }
    }
}

fn local_at<Tz: TimeZone>(tz: &Tz, date: NaiveDate, hour: u32) -> Option<DateTime<Tz>> {
    let naive = date.and_hms_opt(hour, 0, 0)?;
    tz.from_local_datetime(&naive).earliest()
}

impl core::fmt::Display for Schedule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Schedule::Daily { hour } => write!(f, "daily at {hour:02}:00"),
            Schedule::Monthly { day, hour } => write!(f, "monthly on day {day} at {hour:02}:00"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub handler: Handler,
    pub schedule: Schedule,
}

impl Trigger {
    pub fn new(handler: Handler, schedule: Schedule) -> Self {
        Self { handler, schedule }
    }

    /// Same handler and same schedule kind (the hour/day may differ).
    pub fn matches(&self, handler: Handler, kind: ScheduleKind) -> bool {
        self.handler == handler && self.schedule.kind() == kind
    }
}

/// Persistent set of scheduled triggers.
pub trait TriggerRegistry: Send + Sync {
    fn list(&self) -> Result<Vec<Trigger>, TriggerError>;

    fn create(&self, trigger: Trigger) -> Result<(), TriggerError>;
}

impl<R> TriggerRegistry for Arc<R>
where
    R: TriggerRegistry + ?Sized,
{
    fn list(&self) -> Result<Vec<Trigger>, TriggerError> {
        (**self).list()
    }

    fn create(&self, trigger: Trigger) -> Result<(), TriggerError> {
        (**self).create(trigger)
    }
}

/// In-memory registry for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryTriggerRegistry {
    inner: RwLock<Vec<Trigger>>,
}

impl InMemoryTriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TriggerRegistry for InMemoryTriggerRegistry {
    fn list(&self) -> Result<Vec<Trigger>, TriggerError> {
        self.inner
            .read()
            .map(|t| t.clone())
            .map_err(|_| TriggerError::Storage("trigger registry lock poisoned".to_string()))
    }

    fn create(&self, trigger: Trigger) -> Result<(), TriggerError> {
        trigger.schedule.validate()?;
        let mut triggers = self
            .inner
            .write()
            .map_err(|_| TriggerError::Storage("trigger registry lock poisoned".to_string()))?;
        triggers.push(trigger);
        Ok(())
    }
}
