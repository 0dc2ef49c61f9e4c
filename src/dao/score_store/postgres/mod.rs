mod config;
mod error;
mod store;

pub use config::PgConfig;
pub use error::PgDaoError;
pub use store::PgScoreStore;

use crate::dao::storage::StorageError;

impl From<PgDaoError> for StorageError {
    fn from(err: PgDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
