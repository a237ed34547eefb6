pub mod db;
pub mod memory;
pub mod ticketdb;
pub mod userdb;

use thiserror::Error;

use crate::models::ticketmodel::{StatusCount, TicketStatus};

use self::{ticketdb::TicketExt, userdb::UserExt};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate(db_err.message().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

/// Credential store and ticket store behind one handle, so the application
/// state can hold either the Postgres client or the in-memory store.
pub trait Store: UserExt + TicketExt + Send + Sync {}

impl<T> Store for T where T: UserExt + TicketExt + Send + Sync {}

/// One entry per status, in lifecycle order, including statuses with no
/// tickets.
pub(crate) fn complete_status_counts<I>(counts: I) -> Vec<StatusCount>
where
    I: IntoIterator<Item = (TicketStatus, i64)>,
{
    let counts: Vec<(TicketStatus, i64)> = counts.into_iter().collect();

    TicketStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: counts
                .iter()
                .filter(|(s, _)| s == status)
                .map(|(_, c)| *c)
                .sum(),
        })
        .collect()
}
