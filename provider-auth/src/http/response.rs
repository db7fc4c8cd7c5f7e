//! Classification of provider responses.

use std::time::SystemTime;

use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};

use crate::error::{api_key_error, http_error, ApiKeyErrorKind, Error, HttpErrorKind};

/// Passes successful responses through and turns everything else into a typed error.
///
/// 401/403 become `ApiKey(Rejected)`, 429 becomes `RateLimited` carrying the parsed
/// `Retry-After` header, any other status becomes `Status(code)` with the body as context.
pub async fn error_for_status(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_seconds = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);
        return Err(http_error(
            HttpErrorKind::RateLimited {
                retry_after_seconds,
            },
            "provider rate limit exceeded",
        ));
    }

    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let message = format!("{} returned {}: {}", url.path(), status, truncate(&body, 300));

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(api_key_error(ApiKeyErrorKind::Rejected, &message));
    }

    Err(http_error(HttpErrorKind::Status(status.as_u16()), &message))
}

/// `Retry-After` is either delay-seconds or an HTTP date.
fn parse_retry_after(value: &str) -> Option<u64> {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(seconds);
    }

    let at = httpdate::parse_http_date(value.trim()).ok()?;
    Some(
        at.duration_since(SystemTime::now())
            .map(|d| d.as_secs())
            .unwrap_or(0),
    )
}

fn truncate(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("30"), Some(30));
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn test_parse_retry_after_date_in_past_is_zero() {
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), Some(0));
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/limited")
            .with_status(429)
            .with_header("retry-after", "7")
            .create_async()
            .await;

        let response = reqwest::get(format!("{}/limited", server.url()))
            .await
            .unwrap();
        let err = error_for_status(response).await.unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Http(HttpErrorKind::RateLimited {
                retry_after_seconds: Some(7)
            })
        );
    }

    #[tokio::test]
    async fn test_unauthorized_response_is_rejected_key() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/secret")
            .with_status(401)
            .with_body("bad key")
            .create_async()
            .await;

        let response = reqwest::get(format!("{}/secret", server.url()))
            .await
            .unwrap();
        let err = error_for_status(response).await.unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::ApiKey(ApiKeyErrorKind::Rejected));
    }

    #[tokio::test]
    async fn test_server_error_keeps_status_code() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/broken")
            .with_status(503)
            .create_async()
            .await;

        let response = reqwest::get(format!("{}/broken", server.url()))
            .await
            .unwrap();
        let err = error_for_status(response).await.unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Http(HttpErrorKind::Status(503)));
    }
}
