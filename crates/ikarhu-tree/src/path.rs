//! JSON Pointer (RFC 6901) helpers for view paths.

/// Decodes one pointer component: `~1` is `/`, `~0` is `~`.
///
/// A `~` followed by anything else is kept as written.
pub fn unescape_component(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    let mut chars = component.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('~', Some('1')) => {
                chars.next();
                out.push('/');
            }
            ('~', Some('0')) => {
                chars.next();
                out.push('~');
            }
            (c, _) => out.push(c),
        }
    }
    out
}

/// Encodes one key as a pointer component.
pub fn escape_component(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '~' => out.push_str("~0"),
            '/' => out.push_str("~1"),
            c => out.push(c),
        }
    }
    out
}

/// Parse a pointer into keys. A missing leading `/` is tolerated.
pub fn parse_pointer(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    let body = pointer.strip_prefix('/').unwrap_or(pointer);
    body.split('/').map(unescape_component).collect()
}

/// Format root-to-node keys as a pointer.
pub fn format_pointer<S: AsRef<str>>(path: &[S]) -> String {
    let mut out = String::new();
    for component in path {
        out.push('/');
        out.push_str(&escape_component(component.as_ref()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_escapes() {
        let path = vec!["a/b".to_string(), "c~d".to_string(), "0".to_string()];
        let ptr = format_pointer(&path);
        assert_eq!(ptr, "/a~1b/c~0d/0");
        assert_eq!(parse_pointer(&ptr), path);
    }

    #[test]
    fn escapes_decode_left_to_right() {
        assert_eq!(unescape_component("~01"), "~1");
        assert_eq!(unescape_component("~10"), "/0");
        assert_eq!(unescape_component("a~"), "a~");
        assert_eq!(escape_component("~1"), "~01");
    }

    #[test]
    fn relaxed_and_empty() {
        assert_eq!(parse_pointer("a/b"), vec!["a", "b"]);
        assert!(parse_pointer("").is_empty());
        assert_eq!(format_pointer::<String>(&[]), "");
    }
}
