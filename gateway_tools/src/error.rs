use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayClientError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The gateway did not issue an access token")]
    MissingAccessToken,
    #[error("The gateway response is missing the field {0}")]
    MissingField(&'static str),
    #[error("The gateway is unreachable: {0}")]
    GatewayUnavailable(String),
}
