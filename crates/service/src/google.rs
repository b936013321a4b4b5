//! Google Translate web endpoint as a [`TranslationPort`].

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use xlate_core::{Error, Result, TranslationFailure, TranslationPort};

/// Public single-shot endpoint used by the web client.
pub const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Per-call timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Translates one text per HTTP GET.
///
/// The call is bounded by the client timeout; a slow provider surfaces as
/// [`TranslationFailure::Timeout`] and the engine moves on.
pub struct GoogleTranslatePort {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl GoogleTranslatePort {
    /// Port against a custom endpoint (a proxy or a test server).
    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("xlate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::IoError(std::io::Error::other(e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TranslationPort for GoogleTranslatePort {
    fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> std::result::Result<String, TranslationFailure> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .map_err(|e| self.request_failure(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(status_failure(status, &body));
        }

        let body = response.text().map_err(|e| self.request_failure(e))?;
        parse_response(&body)
    }

    fn name(&self) -> &str {
        "google-translate"
    }
}

impl GoogleTranslatePort {
    fn request_failure(&self, e: reqwest::Error) -> TranslationFailure {
        if e.is_timeout() {
            TranslationFailure::Timeout(self.timeout)
        } else {
            TranslationFailure::Network(e.to_string())
        }
    }
}

/// Map a non-success HTTP status to a failure kind.
fn status_failure(status: StatusCode, body: &str) -> TranslationFailure {
    let detail = format!("HTTP {}: {}", status, body.chars().take(200).collect::<String>());
    match status {
        StatusCode::TOO_MANY_REQUESTS => TranslationFailure::Quota(detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            TranslationFailure::Network(detail)
        }
        s if s.is_client_error() => TranslationFailure::Rejected(detail),
        _ => TranslationFailure::Network(detail),
    }
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The body is a nested JSON array whose first element lists
/// `[translated, original, ...]` segments, one per source sentence.
fn parse_response(body: &str) -> std::result::Result<String, TranslationFailure> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| TranslationFailure::MalformedResponse(format!("invalid JSON: {}", e)))?;
    let segments = value
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationFailure::MalformedResponse("no segment list".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();
    if translated.is_empty() {
        return Err(TranslationFailure::MalformedResponse(
            "response has no translated text".to_string(),
        ));
    }
    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one connection on a local port, replying with `response`
    /// (or never replying when it is `None`).
    fn serve_once(response: Option<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 4096];
            let _ = stream.read(&mut request);
            match response {
                Some(response) => {
                    let _ = stream.write_all(response.as_bytes());
                }
                None => thread::sleep(Duration::from_secs(2)),
            }
        });
        format!("http://{}/translate_a/single", addr)
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    #[test]
    fn test_silent_server_times_out() {
        let endpoint = serve_once(None);
        let port = GoogleTranslatePort::with_endpoint(endpoint, Duration::from_millis(200)).unwrap();
        assert_eq!(
            port.translate("猫", "ja", "en"),
            Err(TranslationFailure::Timeout(Duration::from_millis(200)))
        );
    }

    #[test]
    fn test_rate_limited_server_is_quota() {
        let endpoint = serve_once(Some(http_response("429 Too Many Requests", "{}")));
        let port = GoogleTranslatePort::with_endpoint(endpoint, Duration::from_secs(5)).unwrap();
        assert!(matches!(
            port.translate("猫", "ja", "en"),
            Err(TranslationFailure::Quota(_))
        ));
    }

    #[test]
    fn test_translation_over_http() {
        let body = r#"[[["Cat","猫",null,null,1]],null,"ja"]"#;
        let endpoint = serve_once(Some(http_response("200 OK", body)));
        let port = GoogleTranslatePort::with_endpoint(endpoint, Duration::from_secs(5)).unwrap();
        assert_eq!(port.translate("猫", "ja", "en").unwrap(), "Cat");
    }

    #[test]
    fn test_parse_single_segment() {
        let body = r#"[[["Hello","こんにちは",null,null,10]],null,"ja",null,null,null,1,[],[["ja"],null,[1],["ja"]]]"#;
        assert_eq!(parse_response(body).unwrap(), "Hello");
    }

    #[test]
    fn test_parse_joins_sentences() {
        let body = r#"[[["Tax. ","税金。",null,null,3],["Total","合計",null,null,3],[null,null,"Zeikin"]],null,"ja"]"#;
        assert_eq!(parse_response(body).unwrap(), "Tax. Total");
    }

    #[test]
    fn test_parse_malformed() {
        for body in ["<html>", "{}", "[null]", "[[]]"] {
            assert!(matches!(
                parse_response(body),
                Err(TranslationFailure::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_failure(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            TranslationFailure::Quota(_)
        ));
        assert!(matches!(
            status_failure(StatusCode::BAD_REQUEST, ""),
            TranslationFailure::Rejected(_)
        ));
        assert!(matches!(
            status_failure(StatusCode::SERVICE_UNAVAILABLE, ""),
            TranslationFailure::Network(_)
        ));
    }

    #[test]
    fn test_custom_endpoint() {
        let port = GoogleTranslatePort::with_endpoint("http://127.0.0.1:1/t", Duration::from_millis(50))
            .unwrap();
        assert_eq!(port.endpoint(), "http://127.0.0.1:1/t");
        assert_eq!(port.name(), "google-translate");
    }
}
