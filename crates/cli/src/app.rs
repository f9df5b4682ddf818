//! Wiring: configuration to adapters to procedures.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Local;
use tracing::{info, warn};

use stockwatch_ai::{PredictionOutcome, PredictionSettings, run_ai_prediction};
use stockwatch_core::{EnvSecrets, Handler, SecretSource, SystemClock, Trigger, TriggerRegistry};
use stockwatch_infra::{
    Config, CsvWorkbook, Dispatch, FileTriggerRegistry, GeminiClient, Scheduler, build_mailer, next_due, setup,
};
use stockwatch_inventory::{AlertCheckReport, ReconcileReport, apply_usage_log, check_inventory_levels, reset_alert_flag};

use crate::cli::Command;

/// Adapters built from one configuration.
pub struct App {
    config: Config,
    workbook: CsvWorkbook,
    registry: Arc<FileTriggerRegistry>,
    secrets: Arc<dyn SecretSource>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_secrets(config, Arc::new(EnvSecrets))
    }

    pub fn with_secrets(config: Config, secrets: Arc<dyn SecretSource>) -> Result<Self> {
        let workbook = CsvWorkbook::open(&config.workbook_dir)
            .with_context(|| format!("opening workbook at {}", config.workbook_dir.display()))?;
        let registry = Arc::new(FileTriggerRegistry::new(&config.schedule.triggers_path));
        Ok(Self {
            config,
            workbook,
            registry,
            secrets,
        })
    }

    pub fn workbook(&self) -> &CsvWorkbook {
        &self.workbook
    }

    pub fn run(self, command: Command) -> Result<()> {
        match command {
            Command::Setup => self.setup(),
            Command::Check => self.check().map(|_| ()),
            Command::ApplyUsage => self.apply_usage().map(|_| ()),
            Command::Predict => self.predict().map(|_| ()),
            Command::ResetAlert { item } => self.reset_alert(&item),
            Command::Triggers => self.print_triggers(),
            Command::RunScheduler => self.run_scheduler(),
        }
    }

    pub fn setup(&self) -> Result<()> {
        let desired = self.config.schedule.default_triggers()?;
        let report = setup(&self.workbook, &*self.registry, &desired).context("setup failed")?;
        info!(
            tables_created = report.created_tables.len(),
            triggers_created = report.created_triggers.len(),
            "setup complete"
        );
        Ok(())
    }

    pub fn check(&self) -> Result<AlertCheckReport> {
        let recipients = self.config.recipients()?;
        let mailer = build_mailer(&self.config.mail, &*self.secrets)?;
        check_inventory_levels(&self.workbook, &*mailer, &SystemClock, &recipients).context("inventory check failed")
    }

    pub fn apply_usage(&self) -> Result<ReconcileReport> {
        apply_usage_log(&self.workbook).context("usage reconciliation failed")
    }

    pub fn predict(&self) -> Result<PredictionOutcome> {
        let client = GeminiClient::from_config(&self.config.prediction).context("building prediction client")?;
        let settings = PredictionSettings {
            api_key_secret: self.config.prediction.api_key_env.clone(),
            ..PredictionSettings::default()
        };
        run_ai_prediction(&self.workbook, &client, &*self.secrets, &SystemClock, &settings)
            .context("prediction run failed")
    }

    pub fn reset_alert(&self, item: &str) -> Result<()> {
        if !reset_alert_flag(&self.workbook, item).context("reset failed")? {
            bail!("no inventory row for item {item:?}");
        }
        Ok(())
    }

    fn print_triggers(&self) -> Result<()> {
        let triggers = self.registry.list()?;
        if triggers.is_empty() {
            println!("no triggers registered (run `stockwatch setup`)");
            return Ok(());
        }
        let now = Local::now();
        for trigger in &triggers {
            let next = trigger
                .schedule
                .next_fire_after(&now)
                .map(|at| at.format("%Y-%m-%d %H:%M %Z").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("{:<24} {:<28} next: {next}", trigger.handler.name(), trigger.schedule.to_string());
        }
        if let Some(due) = next_due(&triggers, &now) {
            info!(next = %due.at, handlers = due.handlers.len(), "next scheduled run");
        }
        Ok(())
    }

    fn run_scheduler(self) -> Result<()> {
        let registry = self.registry.clone();
        if registry.list()?.is_empty() {
            warn!("no triggers registered; run `stockwatch setup` first");
        }
        Scheduler::default()
            .run_forever(registry, Arc::new(self))
            .context("scheduler thread failed to start")
    }

    /// Registered triggers, for callers that want them without printing.
    pub fn triggers(&self) -> Result<Vec<Trigger>> {
        Ok(self.registry.list()?)
    }
}

impl Dispatch for App {
    fn dispatch(&self, handler: Handler) -> Result<()> {
        match handler {
            Handler::CheckInventoryLevels => self.check().map(|_| ()),
            Handler::ApplyUsageLog => self.apply_usage().map(|_| ()),
            Handler::RunAiPrediction => self.predict().map(|_| ()),
        }
    }
}
