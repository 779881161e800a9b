//! Live-reload script injection for served HTML.

use crate::embed::serve::script_tag;

/// Inject the live-reload script if content is HTML and live reload is on.
pub fn maybe_inject_hotreload(body: Vec<u8>, content_type: &str, live_reload: bool) -> Vec<u8> {
    if live_reload && content_type.starts_with("text/html") {
        inject_hotreload_script(&body)
    } else {
        body
    }
}

/// Inject the script before the last `</body>`, or append it.
fn inject_hotreload_script(content: &[u8]) -> Vec<u8> {
    const PATTERN: &[u8] = b"</body>";

    let script = script_tag();
    let script_bytes = script.as_bytes();
    let pos = content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
        .unwrap_or(content.len());

    let mut result = Vec::with_capacity(content.len() + script_bytes.len());
    result.extend_from_slice(&content[..pos]);
    result.extend_from_slice(script_bytes);
    result.extend_from_slice(&content[pos..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mime::types::{CSS, HTML};

    #[test]
    fn test_injects_before_body_close() {
        let body = b"<html><body><p>hi</p></BODY></html>".to_vec();
        let out = String::from_utf8(maybe_inject_hotreload(body, HTML, true)).unwrap();
        let script = script_tag();
        assert!(out.contains(&format!("<p>hi</p>{script}</BODY>")));
    }

    #[test]
    fn test_appends_without_body() {
        let out = maybe_inject_hotreload(b"<p>fragment</p>".to_vec(), HTML, true);
        assert!(String::from_utf8(out).unwrap().ends_with(&script_tag()));
    }

    #[test]
    fn test_leaves_other_content_alone() {
        let css = b"body{}".to_vec();
        assert_eq!(maybe_inject_hotreload(css.clone(), CSS, true), css);

        let html = b"<body></body>".to_vec();
        assert_eq!(maybe_inject_hotreload(html.clone(), HTML, false), html);
    }
}
