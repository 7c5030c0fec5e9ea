use thiserror::Error;

use crate::lexicon::Category;

#[derive(Error, Debug)]
pub enum ZhquizError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bincode encode error: {0}")]
    BincodeEncode(Box<bincode::error::EncodeError>),

    #[error("Bincode decode error: {0}")]
    BincodeDecode(Box<bincode::error::DecodeError>),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("Remote source error: {0}")]
    Remote(String),

    #[error("Invalid {category} record '{entry}': {reason}")]
    Validation {
        category: Category,
        entry: String,
        reason: String,
    },

    #[error("Next review for '{0}' falls outside the supported date range")]
    ReviewOutOfRange(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("ZhquizError: {0}")]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, ZhquizError>;

impl From<std::io::Error> for ZhquizError {
    fn from(error: std::io::Error) -> Self {
        ZhquizError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for ZhquizError {
    fn from(error: reqwest::Error) -> Self {
        ZhquizError::Reqwest(Box::new(error))
    }
}

impl From<bincode::error::EncodeError> for ZhquizError {
    fn from(error: bincode::error::EncodeError) -> Self {
        ZhquizError::BincodeEncode(Box::new(error))
    }
}

impl From<bincode::error::DecodeError> for ZhquizError {
    fn from(error: bincode::error::DecodeError) -> Self {
        ZhquizError::BincodeDecode(Box::new(error))
    }
}
