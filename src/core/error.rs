use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    /// Caller mistake: bad options, ineligible bridge, colliding address.
    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error(transparent)]
    Netlink(#[from] rtnetlink::Error),

    #[error(transparent)]
    Engine(#[from] bollard::errors::Error),

    #[error("Unexpected error: {message}")]
    Unexpected {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl DriverError {
    pub fn validation(message: impl Into<String>) -> Self {
        DriverError::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        DriverError::NotFound {
            message: message.into(),
        }
    }

    pub fn unexpected(
        message: &str,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        DriverError::Unexpected {
            message: message.to_string(),
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DriverError::Validation { .. } => StatusCode::BAD_REQUEST,
            DriverError::NotFound { .. } => StatusCode::NOT_FOUND,
            DriverError::Netlink(_) | DriverError::Engine(_) | DriverError::Unexpected { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            DriverError::validation("No bridge provided").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DriverError::not_found("Link dh-abc not found").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DriverError::unexpected("boom", None).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = DriverError::validation("DHCPv4 is currently unsupported");
        assert_eq!(err.to_string(), "DHCPv4 is currently unsupported");
    }
}
