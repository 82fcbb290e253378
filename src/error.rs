use snafu::{Location, Snafu};

use crate::api::ApiError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ApplicationError {
    /// could not parse the configuration from the environment
    ConfigLoad {
        source: envy::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not initialize the logger
    InitializeLogger {
        source: tracing_subscriber::util::TryInitError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not create the HTTP client for the funnel API
    ApiClient {
        source: ApiError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not listen for the shutdown signal
    ShutdownSignal {
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },
}
