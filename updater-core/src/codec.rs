//! Reads and rewrites the pinned version line of a `pkg.yaml`.
//!
//! A package definition looks like
//!
//! ```yaml
//! packages:
//!   - name: cli/cli@v2.40.0
//! ```
//!
//! The pin always sits on the second line. Rewriting touches that line only,
//! so the rest of the file keeps its formatting byte for byte.

use crate::error::CodecError;

const NAME_MARKER: &str = "- name: ";

/// Result of [`replace_version_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// File content after the rewrite (the input when `changed` is false).
    pub content: String,
    /// Version after the first `@` of the generated line; empty when there
    /// was nothing to pin.
    pub new_version: String,
    pub changed: bool,
}

impl Replacement {
    fn unchanged(content: &str, new_version: &str) -> Self {
        Self {
            content: content.to_owned(),
            new_version: new_version.to_owned(),
            changed: false,
        }
    }
}

/// Version pinned by the first `- name: <package>@<version>` line.
pub fn extract_current_version(package: &str, content: &str) -> Result<String, CodecError> {
    let needle = format!("{NAME_MARKER}{package}@");
    content
        .lines()
        .find_map(|line| {
            line.find(&needle)
                .map(|idx| line[idx + needle.len()..].trim_end_matches('\r').to_owned())
        })
        .ok_or_else(|| CodecError::NotFound {
            package: package.to_owned(),
        })
}

/// Replace the second line of `content` with `generated`.
///
/// `generated` is a `name@version` token; the `- name: ` marker printed by the
/// generator is tolerated. The existing line's indentation and marker are
/// kept. Re-applying the same token is a no-op.
pub fn replace_version_line(content: &str, generated: &str) -> Replacement {
    let token = strip_marker(generated.trim());
    let Some((_, new_version)) = token.split_once('@') else {
        return Replacement::unchanged(content, "");
    };

    let lines: Vec<&str> = content.split('\n').collect();
    if lines.len() < 2 {
        return Replacement::unchanged(content, new_version);
    }

    let line = lines[1].trim_end_matches('\r');
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];
    let (marker, existing) = match body.strip_prefix(NAME_MARKER) {
        Some(rest) => (NAME_MARKER, rest),
        None => ("", body),
    };
    if existing.trim() == token {
        return Replacement::unchanged(content, new_version);
    }

    let carriage = if lines[1].ends_with('\r') { "\r" } else { "" };
    let rewritten = format!("{indent}{marker}{token}{carriage}");
    let content = lines
        .iter()
        .enumerate()
        .map(|(idx, l)| if idx == 1 { rewritten.as_str() } else { *l })
        .collect::<Vec<_>>()
        .join("\n");
    Replacement {
        content,
        new_version: new_version.to_owned(),
        changed: true,
    }
}

fn strip_marker(line: &str) -> &str {
    line.strip_prefix(NAME_MARKER).unwrap_or(line).trim()
}
