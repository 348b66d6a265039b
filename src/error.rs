use crate::domain::transaction::PortName;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("callback request carries no transaction id")]
    InvalidRequest,

    #[error("amount must be a positive number of Rials, got {0}")]
    InvalidAmount(i64),

    #[error("missing or invalid internal api key")]
    Unauthorized,

    #[error("transaction not found")]
    NotFoundTransaction,

    #[error("transaction was already finalized")]
    Retry,

    #[error("gateway `{0}` is not supported")]
    PortNotFound(String),

    #[error("{port} error {code}: {message}")]
    Bank {
        port: PortName,
        code: String,
        message: String,
    },

    #[error("soap fault: {0}")]
    SoapFault(String),

    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payload cipher: {0}")]
    Cipher(String),

    #[error("configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn bank(port: PortName, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Bank {
            port,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code used in the HTTP error envelope.
    pub fn code(&self) -> String {
        match self {
            Self::InvalidRequest => "INVALID_REQUEST".to_string(),
            Self::InvalidAmount(_) => "INVALID_AMOUNT".to_string(),
            Self::Unauthorized => "UNAUTHORIZED".to_string(),
            Self::NotFoundTransaction => "TRANSACTION_NOT_FOUND".to_string(),
            Self::Retry => "TRANSACTION_ALREADY_FINALIZED".to_string(),
            Self::PortNotFound(_) => "GATEWAY_NOT_FOUND".to_string(),
            Self::Bank { port, code, .. } => format!("{}_{}", port.as_str(), code),
            Self::SoapFault(_) => "SOAP_FAULT".to_string(),
            Self::Transport(e) if e.is_timeout() => "TIMEOUT".to_string(),
            Self::Transport(_) => "NETWORK_ERROR".to_string(),
            Self::Cipher(_) => "CIPHER_ERROR".to_string(),
            Self::Config(_) => "CONFIG_ERROR".to_string(),
            Self::Storage(_) => "STORAGE_ERROR".to_string(),
        }
    }
}

pub type Result<T, E = GatewayError> = std::result::Result<T, E>;
