//! Trigger registry persisted as a TOML file.
//!
//! ```toml
//! [[triggers]]
//! handler = "check_inventory_levels"
//! [triggers.schedule]
//! every = "daily"
//! hour = 8
//! ```

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use stockwatch_core::{Trigger, TriggerError, TriggerRegistry};

#[derive(Debug, Default, Serialize, Deserialize)]
struct TriggerFile {
    #[serde(default)]
    triggers: Vec<Trigger>,
}

#[derive(Debug)]
pub struct FileTriggerRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTriggerRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<TriggerFile, TriggerError> {
        if !self.path.exists() {
            return Ok(TriggerFile::default());
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| TriggerError::Storage(format!("read {}: {e}", self.path.display())))?;
        let file: TriggerFile = toml::from_str(&raw)
            .map_err(|e| TriggerError::Storage(format!("parse {}: {e}", self.path.display())))?;
        for trigger in &file.triggers {
            trigger.schedule.validate()?;
        }
        Ok(file)
    }

    fn write(&self, file: &TriggerFile) -> Result<(), TriggerError> {
        let raw = toml::to_string_pretty(file).map_err(|e| TriggerError::Storage(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TriggerError::Storage(e.to_string()))?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, raw)
            .map_err(|e| TriggerError::Storage(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| TriggerError::Storage(format!("replace {}: {e}", self.path.display())))
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, TriggerError> {
        self.lock
            .lock()
            .map_err(|_| TriggerError::Storage("trigger file lock poisoned".to_string()))
    }
}

impl TriggerRegistry for FileTriggerRegistry {
    fn list(&self) -> Result<Vec<Trigger>, TriggerError> {
        let _guard = self.guard()?;
        Ok(self.read()?.triggers)
    }

    fn create(&self, trigger: Trigger) -> Result<(), TriggerError> {
        trigger.schedule.validate()?;
        let _guard = self.guard()?;
        let mut file = self.read()?;
        file.triggers.push(trigger);
        self.write(&file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockwatch_core::{Handler, Schedule};

    #[test]
    fn missing_file_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FileTriggerRegistry::new(dir.path().join("triggers.toml"));
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn created_triggers_survive_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("triggers.toml");

        let registry = FileTriggerRegistry::new(&path);
        registry
            .create(Trigger::new(Handler::CheckInventoryLevels, Schedule::Daily { hour: 8 }))
            .unwrap();
        registry
            .create(Trigger::new(Handler::RunAiPrediction, Schedule::Monthly { day: 1, hour: 9 }))
            .unwrap();

        let reopened = FileTriggerRegistry::new(&path);
        assert_eq!(
            reopened.list().unwrap(),
            vec![
                Trigger::new(Handler::CheckInventoryLevels, Schedule::Daily { hour: 8 }),
                Trigger::new(Handler::RunAiPrediction, Schedule::Monthly { day: 1, hour: 9 }),
            ]
        );
    }

    #[test]
    fn hand_written_file_is_understood() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triggers.toml");
        std::fs::write(
            &path,
            r#"
[[triggers]]
handler = "apply_usage_log"
schedule = { every = "daily", hour = 23 }
"#,
        )
        .unwrap();

        assert_eq!(
            FileTriggerRegistry::new(&path).list().unwrap(),
            vec![Trigger::new(Handler::ApplyUsageLog, Schedule::Daily { hour: 23 })]
        );
    }

    #[test]
    fn invalid_schedules_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triggers.toml");
        let registry = FileTriggerRegistry::new(&path);

        assert!(matches!(
            registry.create(Trigger::new(Handler::RunAiPrediction, Schedule::Monthly { day: 30, hour: 9 })),
            Err(TriggerError::InvalidSchedule(_))
        ));
        assert!(!path.exists());

        std::fs::write(
            &path,
            "[[triggers]]\nhandler = \"apply_usage_log\"\nschedule = { every = \"daily\", hour = 24 }\n",
        )
        .unwrap();
        assert!(registry.list().is_err());
    }
}
