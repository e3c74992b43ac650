//! Script extraction from page markup.
//!
//! Only `<script>` elements matter to the headless surface; everything else in
//! the document is ignored.

/// One `<script>` element, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    /// The `src` attribute, if any.
    pub src: Option<String>,
    /// The `type` attribute, if any.
    pub kind: Option<String>,
    /// Inline body.
    pub source: String,
}

impl ScriptElement {
    /// Whether this element runs as a classic script.
    ///
    /// Module scripts are not run: the surface has no module loader.
    pub fn is_javascript(&self) -> bool {
        match self.kind.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(kind) => kind.to_ascii_lowercase().contains("javascript"),
        }
    }
}

const OPEN: &str = "<script";
const CLOSE: &str = "</script";

/// All script elements in `html`.
pub fn scripts(html: &str) -> Vec<ScriptElement> {
    // ASCII lowercasing keeps byte offsets valid for `html`.
    let lower = html.to_ascii_lowercase();
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = lower[cursor..].find(OPEN) {
        let after_name = cursor + offset + OPEN.len();

        // `<scripts>` and friends are not script elements.
        match lower[after_name..].chars().next() {
            Some(c) if c.is_ascii_whitespace() || c == '>' || c == '/' => {}
            _ => {
                cursor = after_name;
                continue;
            }
        }

        let Some(tag_len) = lower[after_name..].find('>') else {
            break;
        };
        let attributes = &html[after_name..after_name + tag_len];
        let body_start = after_name + tag_len + 1;

        let (source, next) = match lower[body_start..].find(CLOSE) {
            Some(len) => (&html[body_start..body_start + len], body_start + len + CLOSE.len()),
            None => (&html[body_start..], html.len()),
        };

        found.push(ScriptElement {
            src: attribute(attributes, "src"),
            kind: attribute(attributes, "type"),
            source: source.to_string(),
        });
        cursor = next;
    }

    found
}

/// Value of attribute `name`. Present without a value reads as empty.
fn attribute(attributes: &str, name: &str) -> Option<String> {
    let mut rest = attributes;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '/');
        if rest.is_empty() {
            return None;
        }

        let key_len = rest
            .find(|c: char| c.is_ascii_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let key = &rest[..key_len];
        rest = rest[key_len..].trim_start();

        let value = match rest.strip_prefix('=') {
            Some(after_eq) => {
                let after_eq = after_eq.trim_start();
                let (value, remaining) = match after_eq.chars().next() {
                    Some(quote @ ('"' | '\'')) => {
                        let inner = &after_eq[1..];
                        let end = inner.find(quote).unwrap_or(inner.len());
                        (&inner[..end], inner.get(end + 1..).unwrap_or(""))
                    }
                    _ => {
                        let end = after_eq.find(|c: char| c.is_ascii_whitespace()).unwrap_or(after_eq.len());
                        (&after_eq[..end], &after_eq[end..])
                    }
                };
                rest = remaining;
                value
            }
            None => "",
        };

        if key.eq_ignore_ascii_case(name) {
            return Some(value.to_string());
        }
    }
}
