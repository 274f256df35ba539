//! cURL renderings of outbound requests, for copy-paste reproduction.

use core_types::HttpMethod;
use serde_json::Value;

/// The parts of a request needed to render it as a cURL command.
#[derive(Debug, Clone)]
pub struct CurlRequest<'a> {
    pub url: &'a str,
    pub method: HttpMethod,
    pub headers: &'a [(&'a str, &'a str)],
    pub body: Option<&'a Value>,
}

/// Quote a string for a POSIX shell.
pub fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Render a request as a multi-line cURL command.
pub fn to_curl(request: &CurlRequest<'_>) -> String {
    let mut parts = vec![format!(
        "curl -X {} {}",
        request.method,
        shell_quote(request.url)
    )];

    for (name, value) in request.headers {
        parts.push(format!("-H {}", shell_quote(&format!("{name}: {value}"))));
    }

    if let Some(body) = request.body {
        let text = match body {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        };
        parts.push(format!("-d {}", shell_quote(&text)));
    }

    parts.join(" \\\n  ")
}

/// Unique id for a logged call.
pub fn generate_call_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
