use thiserror::Error;

/// Failures raised by the data mesh operations themselves.
///
/// Remote-call failures are not represented here: they propagate as the SDK
/// error wrapped in an `anyhow::Error` with context. Callers that need to
/// tell these apart can `downcast_ref::<MeshError>()`.
#[derive(Debug, Error)]
pub enum MeshError {
    /// No `AWS_REGION` in the environment and no region supplied.
    #[error("Cannot initialize a Data Mesh without an AWS Region")]
    MissingRegion,

    #[error("Invalid AWS account id '{0}': expected 12 digits")]
    InvalidAccountId(String),

    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),

    /// The caller is not operating in the data mesh account.
    #[error("Must be run in the Data Mesh Account (role '{role_name}' not found)")]
    NotMeshAccount { role_name: String },

    #[error("Table '{database}.{table}' does not exist in the mesh catalog")]
    TableNotFound { database: String, table: String },

    #[error("Unknown table permission '{0}'")]
    InvalidPermission(String),

    #[error("Request must name at least one {0}")]
    EmptyRequest(&'static str),

    /// An AWS response did not carry a field the operation depends on.
    #[error("AWS response missing field '{0}'")]
    MissingField(&'static str),

    /// Standard input closed while a prompt was waiting.
    #[error("Input closed")]
    EndOfInput,

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}
