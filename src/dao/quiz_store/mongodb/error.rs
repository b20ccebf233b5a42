use mongodb::error::Error as MongoError;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Result alias for MongoDB operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Errors raised by the MongoDB backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection URI could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Offending URI.
        uri: String,
        /// Driver parse failure.
        #[source]
        source: MongoError,
    },
    /// A required environment variable is missing.
    #[error("missing environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// The client could not be constructed from parsed options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver construction failure.
        #[source]
        source: MongoError,
    },
    /// The initial ping never succeeded.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Last ping failure.
        #[source]
        source: MongoError,
    },
    /// A health-check ping failed on an established connection.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Ping failure.
        #[source]
        source: MongoError,
    },
    /// An index could not be created.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection the index belongs to.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver failure.
        #[source]
        source: MongoError,
    },
    /// An insert/replace/update failed.
    #[error("write to collection `{collection}` failed")]
    Write {
        /// Target collection.
        collection: &'static str,
        /// Driver failure.
        #[source]
        source: MongoError,
    },
    /// A find/count failed.
    #[error("read from collection `{collection}` failed")]
    Read {
        /// Target collection.
        collection: &'static str,
        /// Driver failure.
        #[source]
        source: MongoError,
    },
    /// A delete failed.
    #[error("delete from collection `{collection}` failed")]
    Delete {
        /// Target collection.
        collection: &'static str,
        /// Driver failure.
        #[source]
        source: MongoError,
    },
}

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
