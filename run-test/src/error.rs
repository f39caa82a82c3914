use crate::bounded::BoundedError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned by [`crate::TestSchema::create`] when postgres testing has been explicitly
    /// disabled. Callers should skip the test rather than fail it.
    #[error("postgres testing is disabled")]
    Disabled,

    #[error("DATABASE_URL is invalid: {0}")]
    InvalidDatabaseUrl(#[source] sqlx::Error),

    #[error("cannot connect to test database: {0}")]
    Connection(#[source] sqlx::Error),

    /// The schema creation statement failed or timed out.
    ///
    /// `cleanup` holds the outcome of closing the connection afterwards, when that failed too.
    #[error("cannot create test schema {name:?}: {source}{}", cleanup_suffix(.cleanup))]
    Creation {
        name: String,
        #[source]
        source: BoundedError,
        cleanup: Option<BoundedError>,
    },

    #[error("cannot tear down test schema: {0}")]
    Teardown(#[source] BoundedError),

    #[error("{0}")]
    Statement(#[source] BoundedError),

    #[error("cannot query schema catalog: {0}")]
    Catalog(#[source] sqlx::Error),
}

impl Error {
    /// Returns `true` if a bounded operation ran out of time.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Creation { source, .. } => source.is_timeout(),
            Error::Teardown(err) | Error::Statement(err) => err.is_timeout(),
            _ => false,
        }
    }
}

fn cleanup_suffix(cleanup: &Option<BoundedError>) -> String {
    match cleanup {
        Some(err) => format!(" (cleanup also failed: {err})"),
        None => String::new(),
    }
}

/// Combines the outcomes of a primary operation and the cleanup that followed it.
///
/// Precedence is primary error, then secondary error, then success.
pub(crate) fn first_failure<E>(primary: Result<(), E>, secondary: Result<(), E>) -> Result<(), E> {
    primary.and(secondary)
}
