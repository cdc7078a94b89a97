mod category;
mod event;
mod habit;
mod log;
mod rule;

pub use category::Category;
pub use event::{dedupe_by_date, Event, EventPayload};
pub use habit::{Habit, HabitKind};
pub use log::{Log, LogField};
pub use rule::{weekday_from_index, weekday_index, Rule};
