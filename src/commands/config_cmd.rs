use clap::{Args, Subcommand};

use super::OutputFormat;
use habit_store::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("database_path: {}", config.database_path.value.display());
                        println!("  source: {}", config.database_path.source);
                        println!();

                        println!("remote:");
                        println!(
                            "  base_url: {}",
                            config.remote.base_url.as_deref().unwrap_or("(not set)")
                        );
                        println!(
                            "  user: {}",
                            config.remote.user.as_deref().unwrap_or("(not set)")
                        );
                        println!();

                        let backends = &config.backends;
                        println!("backends:");
                        println!("  habits: {}", backends.habits);
                        println!("  events: {}", backends.events);
                        println!("  categories: {}", backends.categories);
                        println!("  rules: {}", backends.rules);
                        println!("  logs: {}", backends.logs);
                    }
                }
                Ok(())
            }
        }
    }
}
