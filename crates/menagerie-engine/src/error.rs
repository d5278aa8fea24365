//! Error type for the engine binary.

/// Errors that can abort engine startup or shutdown.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration could not be loaded.
    #[error("config error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: menagerie_core::ConfigError,
    },

    /// The data layer failed during startup hydration.
    #[error("data layer error: {source}")]
    Db {
        /// The underlying data-layer error.
        #[from]
        source: menagerie_db::DbError,
    },

    /// The gateway server failed to start or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: menagerie_gateway::ServerError,
    },
}
