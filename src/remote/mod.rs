//! Remote store adapters.
//!
//! Each adapter implements a repository contract by calling the remote HTTP
//! service through a [`RemoteClient`]. The service is poorer than the contracts:
//! habits get no id back on creation and are deleted by title, nothing has a
//! bulk endpoint, and ordering is not stored at all. The adapters make up for it
//! with extra round trips; none of these sequences is transactional, and a
//! failure halfway is returned as is.

mod category_remote;
mod client;
mod event_remote;
mod habit_remote;
mod log_remote;
mod rule_remote;
pub mod schema;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use category_remote::RemoteCategoryRepository;
pub use client::RemoteClient;
pub use event_remote::RemoteEventRepository;
pub use habit_remote::{PendingHabit, RemoteHabitRepository};
pub use log_remote::{PendingLog, RemoteLogRepository};
pub use rule_remote::{PendingRule, RemoteRuleRepository};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, Transport};

use crate::repository::UNRESOLVED_ID;

/// Picks the identifier of the single candidate matching a just-created record.
///
/// Zero candidates, several candidates, or a candidate without a usable id all
/// yield [`UNRESOLVED_ID`].
pub(crate) fn resolve_unique<I>(candidates: I, what: &str) -> i64
where
    I: IntoIterator<Item = Option<i64>>,
{
    let candidates: Vec<Option<i64>> = candidates.into_iter().collect();
    match candidates.as_slice() {
        [Some(id)] => *id,
        [None] => {
            tracing::warn!("Remote {} has no numeric id; identity unresolved", what);
            UNRESOLVED_ID
        }
        [] => {
            tracing::warn!("Remote {} not found after creation; identity unresolved", what);
            UNRESOLVED_ID
        }
        many => {
            tracing::warn!(
                "{} remote records match {}; identity unresolved",
                many.len(),
                what
            );
            UNRESOLVED_ID
        }
    }
}
