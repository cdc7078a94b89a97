use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};

use super::OutputFormat;
use habit_store::models::Event;
use habit_store::selector::Repositories;

#[derive(Args)]
pub struct EventCommand {
    #[command(subcommand)]
    pub command: EventSubcommand,
}

#[derive(Subcommand)]
pub enum EventSubcommand {
    /// Record progress for a habit (overwrites the same date)
    Log {
        /// Habit ID
        habit_id: i64,

        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Progress value
        #[arg(long, default_value_t = 1.0)]
        progress: f64,

        /// Free-form note
        #[arg(long)]
        note: Option<String>,
    },

    /// List a habit's events by date
    List {
        /// Habit ID
        habit_id: i64,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete the event of a habit on a date
    Remove {
        /// Habit ID
        habit_id: i64,

        /// Date (YYYY-MM-DD)
        date: NaiveDate,
    },
}

impl EventCommand {
    pub async fn run(&self, repos: &Repositories) -> Result<(), Box<dyn std::error::Error>> {
        let events = repos.events();

        match &self.command {
            EventSubcommand::Log {
                habit_id,
                date,
                progress,
                note,
            } => {
                let date = date.unwrap_or_else(|| Local::now().date_naive());
                let mut event = Event::new(*habit_id, date, *progress);
                event.note = note.clone();

                events.insert_event(&event).await?;
                println!("Logged {} for habit {} on {}", progress, habit_id, date);
            }
            EventSubcommand::List { habit_id, format } => {
                let list = events.get_for_habit(*habit_id).await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&list)?),
                    OutputFormat::Text => {
                        if list.is_empty() {
                            println!("No events for habit {}.", habit_id);
                        }
                        for event in &list {
                            println!("{}", event);
                        }
                    }
                }
            }
            EventSubcommand::Remove { habit_id, date } => {
                events.delete_event(*habit_id, *date).await?;
                println!("Removed event for habit {} on {}", habit_id, date);
            }
        }
        Ok(())
    }
}
