//! Lexical normalisation of stored file paths
//!
//! Paths in the library may come from either platform, so this works on the
//! string form and never touches the filesystem.

const VERBATIM_PREFIX: &str = r"\\?\";

/// Normalise a stored `filePath`
///
/// Strips a `\\?\` verbatim prefix, resolves `.` and `..` components and
/// collapses repeated separators. The separator style of the input is kept
/// (backslashes win when both appear). A leading UNC `\\` pair and a drive
/// prefix such as `C:` are preserved.
pub fn normalize_file_path(path: &str) -> String {
    let path = path.strip_prefix(VERBATIM_PREFIX).unwrap_or(path);
    if path.is_empty() {
        return String::new();
    }

    let sep = if path.contains('\\') { '\\' } else { '/' };
    let is_sep = |c: char| c == '/' || c == '\\';

    let mut rest = path;
    let mut prefix = String::new();

    // Drive letter
    let bytes = rest.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        prefix.push_str(&rest[..2]);
        rest = &rest[2..];
    }

    let leading = rest.chars().take_while(|&c| is_sep(c)).count();
    let absolute = leading > 0;
    if prefix.is_empty() && leading >= 2 {
        prefix.push(sep);
        prefix.push(sep);
    } else if absolute {
        prefix.push(sep);
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in rest.split(is_sep) {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join(&sep.to_string());
    if prefix.is_empty() && joined.is_empty() {
        return ".".to_string();
    }
    prefix + &joined
}
