//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "stockwatch", version, about = "Inventory monitoring over a tabular workbook")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "PATH", env = "STOCKWATCH_CONFIG", default_value = "stockwatch.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create missing tables and register the recurring triggers.
    Setup,
    /// Scan stock levels and send reorder alerts.
    Check,
    /// Apply pending usage rows to stock levels.
    ApplyUsage,
    /// Replace the prediction table with a fresh stockout forecast.
    Predict,
    /// Clear the alert-sent flag of one item after restocking.
    ResetAlert {
        /// Item name as it appears in the inventory table.
        item: String,
    },
    /// List registered triggers and their next fire time.
    Triggers,
    /// Run registered triggers until interrupted.
    RunScheduler,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["stockwatch", "--config", "/etc/sw.toml", "reset-alert", "Bolt M6"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/sw.toml"));
        assert_eq!(
            cli.command,
            Command::ResetAlert {
                item: "Bolt M6".to_string()
            }
        );

        let cli = Cli::try_parse_from(["stockwatch", "apply-usage"]).unwrap();
        assert_eq!(cli.command, Command::ApplyUsage);
    }

    #[test]
    fn reset_alert_requires_an_item() {
        assert!(Cli::try_parse_from(["stockwatch", "reset-alert"]).is_err());
    }
}
