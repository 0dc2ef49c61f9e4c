//! Error types shared by the PostgreSQL storage implementation.

use thiserror::Error;

/// Convenient result alias returning [`PgDaoError`] failures.
pub type PgResult<T> = Result<T, PgDaoError>;

/// Failures that can occur while interacting with PostgreSQL.
#[derive(Debug, Error)]
pub enum PgDaoError {
    /// Required environment variable is missing.
    #[error("missing PostgreSQL environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// The configured table name is not a plain SQL identifier.
    #[error("invalid score table name `{name}`")]
    InvalidTableName {
        /// Rejected name.
        name: String,
    },
    /// The connection pool could not be established.
    #[error("failed to connect to PostgreSQL")]
    Connect {
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },
    /// Creating the score table failed.
    #[error("failed to create score table `{table}`")]
    CreateTable {
        /// Table that could not be created.
        table: String,
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },
    /// A statement against the score table failed.
    #[error("failed to {operation} on score table")]
    Query {
        /// Statement that failed, e.g. `add clicks`.
        operation: &'static str,
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },
    /// A stored click count does not fit the domain model.
    #[error("team `{id}` has an invalid click count {value}")]
    InvalidClicks {
        /// Team holding the value.
        id: String,
        /// Value read from the table.
        value: i64,
    },
}
