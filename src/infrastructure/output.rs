use crate::domain::entities::ResponseView;
use crate::domain::trace::TraceInfo;
use colored::Colorize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::io::{self, Write};

/// How a response is rendered
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Print the body exactly as received
    pub raw: bool,
    /// Print request and response heads before the body
    pub dump_headers: bool,
    /// Colour pretty-printed JSON; only wanted when writing to a terminal
    pub color: bool,
}

/// Renders head dump, body and trace report, in that order
pub fn render(response: &ResponseView, options: RenderOptions, out: &mut impl Write) -> io::Result<()> {
    if options.dump_headers {
        write_dump(response, out)?;
    }
    let body = format_body(&response.body, options.raw);
    match body {
        Cow::Owned(pretty) if options.color => {
            let text = String::from_utf8_lossy(&pretty);
            writeln!(out, "{}", text.trim_end().green())?;
        }
        body => out.write_all(&body)?,
    }
    if let Some(trace) = &response.trace {
        write_trace(trace, out)?;
    }
    out.flush()
}

/// Pretty-prints JSON objects with two-space indentation. Anything else,
/// arrays and invalid JSON included, passes through untouched.
pub fn format_body(body: &[u8], raw: bool) -> Cow<'_, [u8]> {
    if raw {
        return Cow::Borrowed(body);
    }
    let Ok(object) = serde_json::from_slice::<Map<String, Value>>(body) else {
        return Cow::Borrowed(body);
    };
    match serde_json::to_vec_pretty(&object) {
        Ok(mut pretty) => {
            pretty.push(b'\n');
            Cow::Owned(pretty)
        }
        Err(_) => Cow::Borrowed(body),
    }
}

fn write_dump(response: &ResponseView, out: &mut impl Write) -> io::Result<()> {
    let sent = &response.sent;
    writeln!(out, "> {} {} {:?}", sent.method, sent.target, sent.version)?;
    for (name, value) in &sent.headers {
        writeln!(out, "> {name}: {value}")?;
    }
    writeln!(out, ">")?;

    writeln!(
        out,
        "< {:?} {} {}",
        response.version,
        response.status.as_u16(),
        response.status.canonical_reason().unwrap_or_default()
    )?;
    for (name, value) in &response.headers {
        writeln!(out, "< {}: {}", name, String::from_utf8_lossy(value.as_bytes()))?;
    }
    writeln!(out, "<")
}

fn write_trace(trace: &TraceInfo, out: &mut impl Write) -> io::Result<()> {
    write!(out, "\n\n{}\n", "------- TRACE INFO -------".bold())?;
    writeln!(out, "{trace}")?;
    writeln!(out, "\n{}", trace.blame())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::SentRequest;
    use hyper::header::CONTENT_TYPE;
    use hyper::header::HeaderValue;
    use hyper::{StatusCode, Version};
    use std::time::Duration;

    fn rendered(response: &ResponseView, options: RenderOptions) -> String {
        let mut out = Vec::new();
        render(response, options, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn pretty_prints_json_objects() {
        let body = br#"{"name":"user","tags":["a","b"],"nested":{"ok":true}}"#;
        let pretty = format_body(body, false);
        let text = std::str::from_utf8(&pretty).unwrap();
        assert!(text.contains("\n  \"name\": \"user\""), "{text}");

        let original: Value = serde_json::from_slice(body).unwrap();
        let reparsed: Value = serde_json::from_slice(&pretty).unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn non_objects_pass_through() {
        for body in [&b"plain text"[..], b"[1,2,3]", b"{broken", b"\"string\"", b""] {
            assert_eq!(&format_body(body, false)[..], body);
        }
    }

    #[test]
    fn raw_mode_never_reformats() {
        let body = br#"{"name": "user"}"#;
        assert_eq!(&format_body(body, true)[..], &body[..]);
    }

    #[test]
    fn raw_mode_keeps_binary_bodies() {
        let body = [0u8, 159, 146, 150, 255];
        let response = ResponseView::new(StatusCode::OK, body.to_vec());
        let mut out = Vec::new();
        render(&response, RenderOptions { raw: true, ..RenderOptions::default() }, &mut out).unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn dump_shows_both_heads_before_body() {
        let mut response = ResponseView::new(StatusCode::OK, "hello");
        response.headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        response.sent = SentRequest {
            method: "HEAD".into(),
            target: "/".into(),
            version: Version::HTTP_11,
            headers: vec![("Host".into(), "example.com".into())],
        };
        let text = rendered(&response, RenderOptions { dump_headers: true, ..RenderOptions::default() });
        assert!(text.starts_with("> HEAD / HTTP/1.1\n> Host: example.com\n>\n< HTTP/1.1 200 OK\n"));
        assert!(text.contains("< content-type: text/plain\n<\n"));
        assert!(text.ends_with("hello"));
    }

    #[test]
    fn trace_section_follows_body() {
        let mut response = ResponseView::new(StatusCode::OK, "body");
        response.trace = Some(TraceInfo {
            first_byte: Duration::from_millis(40),
            total: Duration::from_millis(50),
            ..TraceInfo::default()
        });
        let text = rendered(&response, RenderOptions::default());
        let body_at = text.find("body").unwrap();
        let header_at = text.find("TRACE INFO").unwrap();
        assert!(body_at < header_at);
        assert!(text.contains("TotalTime"));
        assert!(text.contains("first response byte"));
    }

    #[test]
    fn no_trace_section_without_trace() {
        let response = ResponseView::new(StatusCode::OK, "body");
        assert_eq!(rendered(&response, RenderOptions::default()), "body");
    }

    #[test]
    fn colour_applies_to_pretty_json_only() {
        colored::control::set_override(true);
        let json = ResponseView::new(StatusCode::OK, r#"{"name":"user"}"#);
        let text = ResponseView::new(StatusCode::OK, "plain");
        let coloured = RenderOptions { color: true, ..RenderOptions::default() };

        let pretty = rendered(&json, coloured);
        let plain = rendered(&text, coloured);
        let piped = rendered(&json, RenderOptions::default());
        colored::control::unset_override();

        assert!(pretty.starts_with("\x1b["), "{pretty:?}");
        assert!(pretty.contains("\"name\": \"user\""));
        assert!(pretty.ends_with('\n'));
        assert_eq!(plain, "plain");
        assert_eq!(piped, "{\n  \"name\": \"user\"\n}\n");
    }
}
