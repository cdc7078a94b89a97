use clap::ValueEnum;

mod config_cmd;
mod event;
mod habit;

pub use config_cmd::ConfigCommand;
pub use event::EventCommand;
pub use habit::HabitCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
