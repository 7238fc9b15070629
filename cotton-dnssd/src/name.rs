//! Converting DNS names to and from presentation format
//!
//! Service instance names are free-form UTF-8 (RFC 6763 s4.3), so a
//! single label can contain dots, spaces, or non-ASCII text. Labels
//! are kept in escaped form (`Printer\ 1`) wherever a name is composed
//! from its parts, and only unescaped for display.

use hickory_proto::rr::Name;

fn needs_backslash(b: u8) -> bool {
    matches!(
        b,
        b'.' | b'\\' | b' ' | b'"' | b'(' | b')' | b';' | b'@' | b'$'
    )
}

/// Escape one raw DNS label into presentation format
#[must_use]
pub fn escape_label(label: &[u8]) -> String {
    let mut s = String::with_capacity(label.len());
    for &b in label {
        if needs_backslash(b) {
            s.push('\\');
            s.push(char::from(b));
        } else if b.is_ascii_graphic() {
            s.push(char::from(b));
        } else {
            s.push_str(&format!("\\{b:03}"));
        }
    }
    s
}

/// Undo presentation-format escaping
///
/// `\X` becomes `X`, and `\DDD` becomes the byte with decimal value
/// DDD. The resulting bytes are decoded as UTF-8, replacing any
/// invalid sequences. A trailing lone backslash is kept as-is.
#[must_use]
pub fn unescape(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            let digits = &bytes[i + 1..bytes.len().min(i + 4)];
            if digits.len() == 3 && digits.iter().all(u8::is_ascii_digit) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 10 + u32::from(d - b'0'));
                if let Ok(b) = u8::try_from(value) {
                    out.push(b);
                    i += 4;
                    continue;
                }
            }
            out.push(bytes[i + 1]);
            i += 2;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// A name's labels, each escaped
pub(crate) fn labels(name: &Name) -> Vec<String> {
    name.iter().map(escape_label).collect()
}

/// Fully-qualified presentation form, always with a trailing dot
#[must_use]
pub fn fqdn(name: &Name) -> String {
    let mut s = labels(name).join(".");
    s.push('.');
    s
}

/// Append the trailing dot of a fully-qualified name, if absent
pub(crate) fn ensure_trailing_dot(s: &str) -> String {
    if s.ends_with('.') {
        s.to_string()
    } else {
        format!("{s}.")
    }
}

/// Build a name from raw (unescaped) labels
#[cfg(test)]
pub(crate) fn test_name(labels: &[&str]) -> Name {
    Name::from_labels(labels.iter().map(|l| l.as_bytes())).unwrap()
}
