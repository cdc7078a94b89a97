use clap::{Args, Subcommand};

use super::OutputFormat;
use habit_store::models::Habit;
use habit_store::repository::{RepositoryError, UNRESOLVED_ID};
use habit_store::selector::Repositories;

#[derive(Args)]
pub struct HabitCommand {
    #[command(subcommand)]
    pub command: HabitSubcommand,
}

#[derive(Subcommand)]
pub enum HabitSubcommand {
    /// List all habits
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create a new habit
    Add {
        /// Title of the habit
        title: String,

        /// Whether the habit is tracked on the device (false creates it archived)
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        device: bool,
    },

    /// Archive a habit
    Archive {
        /// Habit ID
        id: i64,
    },

    /// Restore an archived habit
    Unarchive {
        /// Habit ID
        id: i64,
    },

    /// Change a habit's title
    Rename {
        /// Habit ID
        id: i64,

        /// New title
        title: String,
    },

    /// Delete a habit and its events
    Remove {
        /// Habit ID
        id: i64,
    },
}

impl HabitCommand {
    pub async fn run(&self, repos: &Repositories) -> Result<(), Box<dyn std::error::Error>> {
        let habits = repos.habits();

        match &self.command {
            HabitSubcommand::List { format } => {
                let all = habits.get_all().await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&all)?),
                    OutputFormat::Text => {
                        if all.is_empty() {
                            println!("No habits found.");
                        }
                        for habit in &all {
                            println!("{}", habit);
                        }
                    }
                }
            }
            HabitSubcommand::Add { title, device } => {
                let mut habit = Habit::new(title.clone());
                habit.archived = !device;

                let id = habits.create(&habit).await?;
                if id == UNRESOLVED_ID {
                    println!("Created habit '{}' (identifier could not be resolved)", title);
                } else {
                    println!("Created habit [{}] {}", id, title);
                }
            }
            HabitSubcommand::Archive { id } => {
                self.set_archived(repos, *id, true).await?;
                println!("Archived habit {}", id);
            }
            HabitSubcommand::Unarchive { id } => {
                self.set_archived(repos, *id, false).await?;
                println!("Unarchived habit {}", id);
            }
            HabitSubcommand::Rename { id, title } => {
                let mut habit = habits
                    .find_by_id(*id)
                    .await?
                    .ok_or_else(|| RepositoryError::not_found("Habit", id))?;
                let old_title = std::mem::replace(&mut habit.title, title.clone());
                habits.update(&habit).await?;
                println!("Renamed '{}' to '{}'", old_title, title);
            }
            HabitSubcommand::Remove { id } => {
                repos.events().delete_for_habit(*id).await?;
                repos.categories().set_categories_for_habit(*id, &[]).await?;
                habits.delete(*id).await?;
                println!("Removed habit {}", id);
            }
        }
        Ok(())
    }

    async fn set_archived(
        &self,
        repos: &Repositories,
        id: i64,
        archived: bool,
    ) -> Result<(), RepositoryError> {
        let habits = repos.habits();
        let mut habit = habits
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Habit", id))?;
        habit.archived = archived;
        habits.update(&habit).await
    }
}
