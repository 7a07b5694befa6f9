use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::Value;

use gifcover_contracts::{PluginError, PluginResult};

const ERROR_BODY_MAX_CHARS: usize = 512;

/// One client per invocation; clones share the connection pool.
pub(crate) fn build_client() -> HttpClient {
    HttpClient::new()
}

/// Maps a failed send (connect, timeout, TLS) to a transport error with no
/// status.
pub(crate) fn send_failed(target: &str, err: reqwest::Error) -> PluginError {
    let reason = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    PluginError::transport(target, 0, format!("{reason}: {err}"))
}

pub(crate) fn response_text(target: &str, response: HttpResponse) -> PluginResult<(u16, String)> {
    let code = response.status().as_u16();
    let body = response
        .text()
        .map_err(|err| PluginError::parse(format!("{target} response body read failed: {err}")))?;
    Ok((code, body))
}

pub(crate) fn json_or_error(target: &str, code: u16, body: &str) -> PluginResult<Value> {
    if !(200..300).contains(&code) {
        return Err(PluginError::transport(
            target,
            code,
            truncate_text(body, ERROR_BODY_MAX_CHARS),
        ));
    }
    serde_json::from_str(body)
        .map_err(|err| PluginError::parse(format!("{target} returned invalid JSON payload: {err}")))
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use gifcover_contracts::PluginError;

    use super::{json_or_error, truncate_text};

    #[test]
    fn non_success_status_is_transport_error() {
        let err = json_or_error("gallery search", 503, "upstream down");
        assert!(matches!(
            err,
            Err(PluginError::Transport { status: 503, ref body, .. }) if body == "upstream down"
        ));
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = json_or_error("gallery search", 200, "<html>");
        assert!(matches!(err, Err(PluginError::Parse(_))));
    }

    #[test]
    fn success_returns_parsed_body() -> anyhow::Result<()> {
        assert_eq!(json_or_error("x", 200, r#"{"data": []}"#)?, json!({"data": []}));
        Ok(())
    }

    #[test]
    fn truncate_text_marks_cut() {
        assert_eq!(truncate_text("abcdef", 3), "abc…");
        assert_eq!(truncate_text("abc", 3), "abc");
    }
}
