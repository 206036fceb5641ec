use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::AppResult;

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

/// The HTML 404 page.
pub fn sorry(what: &str) -> AppResult<Response> {
    Ok((
        StatusCode::NOT_FOUND,
        Html(include_res!(str, "/pages/sorry.html").replace("{what}", &escape_html(what))),
    )
        .into_response())
}

/// Substitutes `{key}` placeholders in one pass, so inserted text is never re-expanded.
/// Braces that do not name a known key are kept as they are.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let hit = after.find('}').and_then(|end| {
            let key = &after[..end];
            values.iter().find(|(k, _)| *k == key).map(|(_, value)| (*value, end))
        });
        match hit {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html(r#"<b>"Tom" & 'Jerry'</b>"#), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
    }

    #[test]
    fn fill_is_single_pass() {
        let out = fill("<h1>{title}</h1><p>{body}</p>{ margin: 0 }", &[("title", "{body}"), ("body", "hi")]);
        assert_eq!(out, "<h1>{body}</h1><p>hi</p>{ margin: 0 }");
    }

    #[test]
    fn sorry_is_404() {
        let response = sorry("page").unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
