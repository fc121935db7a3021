//! Minimal page shell. The client bundle reads its initial state from the
//! embedded props object.

use serde_json::Value;

/// Serialize props so they can sit inside a `<script>` element without
/// closing it or breaking out of a JS string literal.
pub fn escape_props(props: &Value) -> String {
    let json = props.to_string();
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Render a page: `page` names the client entry point that hydrates the
/// `#props` payload.
pub fn render_page(title: &str, page: &str, props: &Value) -> String {
    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body>
<div id="target" data-page="{page}"></div>
<script id="props" type="application/json">{props}</script>
<script src="/js/{page}.js"></script>
</body>
</html>
"#,
        title = escape_html(title),
        page = escape_html(page),
        props = escape_props(props),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_props_neutralizes_script_close() {
        let escaped = escape_props(&json!({"note": "</script><b>&"}));
        assert!(!escaped.contains("</script>"));
        assert_eq!(escaped, r#"{"note":"\u003c/script\u003e\u003cb\u003e\u0026"}"#);

        let back: Value = serde_json::from_str(&escaped).unwrap();
        assert_eq!(back["note"], "</script><b>&");
    }

    #[test]
    fn test_escape_props_line_separators() {
        let escaped = escape_props(&json!("a\u{2028}b\u{2029}"));
        assert_eq!(escaped, r#""a\u2028b\u2029""#);
    }

    #[test]
    fn test_render_page_escapes_title() {
        let html = render_page("Revision <1>", "revision", &json!({"id": 1}));
        assert!(html.contains("<title>Revision &lt;1&gt;</title>"));
        assert!(html.contains(r#"{"id":1}"#));
        assert!(html.contains("/js/revision.js"));
    }
}
