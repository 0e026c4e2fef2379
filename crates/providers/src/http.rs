use crate::traits::ProviderError;
use reqwest::{Client, StatusCode};
use std::time::Duration;

pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Map a non-success HTTP status onto a provider error with the body attached.
pub(crate) fn status_error(status: StatusCode, body: &str, has_key: bool) -> ProviderError {
    match status.as_u16() {
        401 | 403 => {
            if has_key {
                ProviderError::Auth(format!(
                    "Authentication failed. Check your API key. Details: {}",
                    body
                ))
            } else {
                ProviderError::Auth(format!(
                    "Authentication required ({}). Details: {}",
                    status, body
                ))
            }
        }
        404 => ProviderError::Api(format!("Invalid endpoint or model (404). Details: {}", body)),
        429 => ProviderError::Api(format!("Rate limit exceeded. Details: {}", body)),
        500..=599 => ProviderError::Api(format!("Server error: {}. Details: {}", status, body)),
        _ => ProviderError::Api(format!("HTTP error: {}. Details: {}", status, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_without_key() {
        let err = status_error(StatusCode::UNAUTHORIZED, "nope", false);
        assert!(matches!(err, ProviderError::Auth(_)));
        assert!(err.to_string().contains("Authentication required"));
    }

    #[test]
    fn test_server_error_keeps_body() {
        let err = status_error(StatusCode::BAD_GATEWAY, "upstream down", true);
        assert!(err.to_string().contains("upstream down"));
    }
}
