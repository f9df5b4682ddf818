//! One-time workbook and trigger provisioning. Idempotent.

use thiserror::Error;
use tracing::info;

use stockwatch_core::{StoreError, Table, TableStore, Trigger, TriggerError, TriggerRegistry};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Trigger(#[from] TriggerError),
}

/// What `setup` actually changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupReport {
    pub created_tables: Vec<Table>,
    pub created_triggers: Vec<Trigger>,
}

/// Create every missing table (header row only) and register each desired
/// trigger unless one with the same handler and schedule kind exists.
///
/// Existing tables are never touched, so re-running on a populated workbook
/// is safe.
pub fn setup<S, R>(store: &S, registry: &R, desired: &[Trigger]) -> Result<SetupReport, SetupError>
where
    S: TableStore + ?Sized,
    R: TriggerRegistry + ?Sized,
{
    let mut report = SetupReport::default();

    for table in Table::ALL {
        if !store.table_exists(table)? {
            store.create_table(table)?;
            info!(table = %table, "table created");
            report.created_tables.push(table);
        }
    }

    let mut existing = registry.list()?;
    for trigger in desired {
        if existing
            .iter()
            .any(|t| t.matches(trigger.handler, trigger.schedule.kind()))
        {
            continue;
        }
        registry.create(*trigger)?;
        info!(handler = %trigger.handler, schedule = %trigger.schedule, "trigger registered");
        existing.push(*trigger);
        report.created_triggers.push(*trigger);
    }

    Ok(report)
}
