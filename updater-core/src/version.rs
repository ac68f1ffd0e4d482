//! Prefix-aware version comparison.
//!
//! A tag such as `cli-v2.1.0` splits into the prefix `cli-` and the version
//! `2.1.0`. Two tags are only ordered against each other when their prefixes
//! are byte-equal, so `edge-v3.0.0` never counts as an upgrade of
//! `stable-v2.0.0`.

use std::cmp::Ordering;
use std::str::FromStr;

use semver::{BuildMetadata, Prerelease, Version};

use crate::error::VersionError;

/// A tag decomposed into `(prefix, version)`.
///
/// Components past the third (`1.2.3.4`) are kept in `extra` and ordered
/// after `patch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionToken {
    pub prefix: String,
    pub version: Version,
    pub extra: Vec<u64>,
}

impl VersionToken {
    /// Split `tag` at the longest suffix that parses as a version.
    pub fn parse(tag: &str) -> Result<Self, VersionError> {
        for (idx, c) in tag.char_indices() {
            if !(c.is_ascii_digit() || c == 'v' || c == 'V') {
                continue;
            }
            if let Some((version, extra)) = parse_lenient(&tag[idx..]) {
                return Ok(Self {
                    prefix: tag[..idx].to_owned(),
                    version,
                    extra,
                });
            }
        }
        Err(VersionError::Parse(tag.to_owned()))
    }

    /// Precedence order; build metadata is ignored.
    pub fn precedence(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.version, &other.version);
        (a.major, a.minor, a.patch)
            .cmp(&(b.major, b.minor, b.patch))
            .then_with(|| {
                let len = self.extra.len().max(other.extra.len());
                let padded = |v: &[u64], i: usize| v.get(i).copied().unwrap_or(0);
                (0..len)
                    .map(|i| padded(&self.extra, i).cmp(&padded(&other.extra, i)))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.pre.cmp(&b.pre))
    }
}

impl FromStr for VersionToken {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// `Ok(true)` iff `new` shares `current`'s prefix and is a strictly greater
/// version. Different prefixes yield `Ok(false)`, not an error.
pub fn compare(current: &str, new: &str) -> Result<bool, VersionError> {
    let current = VersionToken::parse(current)?;
    let new = VersionToken::parse(new)?;
    if current.prefix != new.prefix {
        return Ok(false);
    }
    Ok(new.precedence(&current) == Ordering::Greater)
}

/// Accepts an optional `v`, one or more numeric components (missing ones up
/// to the third are zero), then optional `-prerelease` / `+build`.
///
/// Zero-padded numbers (`2024.01.15`, `rc.09`) are read as integers.
fn parse_lenient(s: &str) -> Option<(Version, Vec<u64>)> {
    let s = s.strip_prefix(['v', 'V']).unwrap_or(s);
    let split = s.find(['-', '+']).unwrap_or(s.len());
    let (core, rest) = s.split_at(split);

    let mut numbers = core
        .split('.')
        .map(parse_number)
        .collect::<Option<Vec<u64>>>()?;
    let extra = if numbers.len() > 3 { numbers.split_off(3) } else { Vec::new() };
    numbers.resize(3, 0);
    let mut version = Version::new(numbers[0], numbers[1], numbers[2]);

    let (pre, build) = match rest.split_once('+') {
        Some((pre, build)) => (pre, Some(build)),
        None => (rest, None),
    };
    if let Some(pre) = pre.strip_prefix('-') {
        let identifiers = pre
            .split('.')
            .map(normalize_identifier)
            .collect::<Vec<_>>()
            .join(".");
        version.pre = Prerelease::new(&identifiers).ok()?;
    } else if !pre.is_empty() {
        return None;
    }
    if let Some(build) = build {
        version.build = BuildMetadata::new(build).ok()?;
    }
    Some((version, extra))
}

fn parse_number(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// `09` becomes `9`; alphanumeric identifiers pass through.
fn normalize_identifier(identifier: &str) -> String {
    match parse_number(identifier) {
        Some(n) => n.to_string(),
        None => identifier.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::normal("v2.0.0", "v2.1.0", true)]
    #[case::old("v2.1.0", "v2.0.0", false)]
    #[case::different_prefix("edge-v2.0.0", "stable-v2.1.0", false)]
    #[case::same_prefix("cli-v2.0.0", "cli-v2.1.0", true)]
    #[case::same_prefix_but_old("cli-v2.1.0", "cli-v2.0.0", false)]
    #[case::equal("v1.0.0", "v1.0.0", false)]
    #[case::no_v("1.2.3", "1.10.0", true)]
    #[case::leading_v_is_not_a_prefix("v1.0.0", "1.1.0", true)]
    #[case::prerelease_to_release("v1.0.0-rc.1", "v1.0.0", true)]
    #[case::release_to_prerelease("v1.0.0", "v1.1.0-beta.1", true)]
    #[case::release_beats_its_prerelease("v1.1.0", "v1.1.0-beta.1", false)]
    #[case::two_components("v1.2", "v1.3", true)]
    #[case::go_style_prefix("go1.21.0", "go1.22.1", true)]
    #[case::calendar_zero_padded("2024.01.15", "2024.02.01", true)]
    #[case::calendar_older("2024.02.01", "2024.01.15", false)]
    #[case::zero_padded_prerelease("v1.0.0-rc.09", "v1.0.0-rc.10", true)]
    #[case::zero_padded_prerelease_equal("v1.0.0-rc.09", "v1.0.0-rc.9", false)]
    #[case::four_components("v1.2.3.4", "v1.2.3.5", true)]
    #[case::four_components_major_bump("v1.2.3.4", "v2.0.0.0", true)]
    #[case::fourth_component_added("v1.2.3", "v1.2.3.1", true)]
    #[case::fourth_component_zero("v1.2.3", "v1.2.3.0", false)]
    #[case::build_metadata_ignored("v1.0.0+1", "v1.0.0+2", false)]
    fn compares(#[case] current: &str, #[case] new: &str, #[case] expected: bool) {
        assert_eq!(compare(current, new), Ok(expected), "{current} -> {new}");
    }

    #[test]
    fn prefixes_must_match_byte_for_byte() {
        // Numerically newer, but a channel switch.
        assert_eq!(compare("edge-v2.0.0", "stable-v9.0.0"), Ok(false));
        assert_eq!(compare("Cli-v1.0.0", "cli-v2.0.0"), Ok(false));
    }

    #[test]
    fn tokens_split_prefix_and_version() {
        let token = VersionToken::parse("cli-v2.1.0").expect("parse");
        assert_eq!(token.prefix, "cli-");
        assert_eq!(token.version, Version::new(2, 1, 0));

        let token: VersionToken = "v12.0.3".parse().expect("parse");
        assert_eq!(token.prefix, "");
        assert_eq!(token.version, Version::new(12, 0, 3));
        assert!(token.extra.is_empty());
    }

    #[test]
    fn zero_padded_components_are_integers() {
        let token = VersionToken::parse("2024.02.01").expect("parse");
        assert_eq!(token.prefix, "");
        assert_eq!(token.version, Version::new(2024, 2, 1));

        let token = VersionToken::parse("v1.0.0-rc.09").expect("parse");
        assert_eq!(token.version.pre.as_str(), "rc.9");
    }

    #[test]
    fn components_past_the_third_are_kept() {
        let token = VersionToken::parse("v1.2.3.4").expect("parse");
        assert_eq!(token.prefix, "");
        assert_eq!(token.version, Version::new(1, 2, 3));
        assert_eq!(token.extra, vec![4]);
    }

    #[rstest]
    #[case("latest")]
    #[case("")]
    #[case("release-candidate")]
    fn unparsable_tokens_are_errors(#[case] tag: &str) {
        assert_eq!(
            VersionToken::parse(tag),
            Err(VersionError::Parse(tag.to_owned()))
        );
        assert!(compare("v1.0.0", tag).is_err());
        assert!(compare(tag, "v1.0.0").is_err());
    }
}
