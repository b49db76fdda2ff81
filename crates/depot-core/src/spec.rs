//! Asset reference grammar.
//!
//! A reference names an asset, optionally pins a version, and optionally
//! selects a sub-path inside the asset payload:
//!
//! ```text
//! name[:major[.minor]][[sub/part]]
//! ```
//!
//! e.g. `embeddings/fr:2.3[vocab/tokens.txt]`. Version fields are kept as
//! their original decimal text so that a reference re-serializes exactly.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// Character class for asset names and sub-part segments: lowercase
/// alphanumerics with `-`, `_`, `.` or `/` separators, never starting or
/// ending on a separator.
const NAME_PATTERN: &str = r"[a-z0-9]([a-z0-9\-_./]*[a-z0-9])?";

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{NAME_PATTERN}$")).expect("asset name pattern"));

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9]+$").expect("version pattern"));

static SUB_PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^(/?{NAME_PATTERN})+$")).expect("sub-part pattern"));

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<name>{NAME_PATTERN})(:(?P<major_version>[0-9]+)(\.(?P<minor_version>[0-9]+))?)?(\[(?P<sub_part>(/?{NAME_PATTERN})+)\])?$"
    ))
    .expect("asset reference grammar")
});

/// Malformed asset reference. Carries one message per violated field;
/// construction is atomic, so no partially valid spec ever escapes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid asset spec `{}`: {}", .reference, .issues.join("; "))]
pub struct InvalidAssetSpec {
    pub reference: String,
    pub issues: Vec<String>,
}

/// Parsed, validated form of an asset reference string. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AssetSpec {
    name: String,
    major_version: Option<String>,
    minor_version: Option<String>,
    sub_part: Option<String>,
}

impl AssetSpec {
    /// Assemble a spec from parts, running the full field validation.
    ///
    /// This is the same validation `parse` applies, so callers building a
    /// spec directly cannot produce one that a reference string could not
    /// express.
    pub fn new(
        name: impl Into<String>,
        major_version: Option<String>,
        minor_version: Option<String>,
        sub_part: Option<String>,
    ) -> Result<Self, InvalidAssetSpec> {
        let name = name.into();
        let mut issues = Vec::new();

        if !NAME_RE.is_match(&name) {
            issues.push(format!(
                "invalid name `{name}`, can only contain [a-z], [0-9], `-`, `_`, `.` or `/`"
            ));
        }
        if let Some(major) = &major_version {
            if !VERSION_RE.is_match(major) {
                issues.push(format!("invalid major version `{major}`"));
            }
        }
        if let Some(minor) = &minor_version {
            if !VERSION_RE.is_match(minor) {
                issues.push(format!("invalid minor version `{minor}`"));
            }
            if major_version.is_none() {
                issues.push("cannot specify a minor version without a major version".to_string());
            }
        }
        if let Some(sub) = &sub_part {
            if !SUB_PART_RE.is_match(sub) {
                issues.push(format!("invalid sub-part `{sub}`"));
            }
        }

        if !issues.is_empty() {
            return Err(InvalidAssetSpec {
                reference: format_reference(
                    &name,
                    major_version.as_deref(),
                    minor_version.as_deref(),
                    sub_part.as_deref(),
                ),
                issues,
            });
        }

        Ok(AssetSpec {
            name,
            major_version,
            minor_version,
            sub_part,
        })
    }

    /// Parse a reference string. One anchored match over the whole input;
    /// anything that does not match the grammar is rejected.
    pub fn parse(reference: &str) -> Result<Self, InvalidAssetSpec> {
        let caps = REFERENCE_RE.captures(reference).ok_or_else(|| InvalidAssetSpec {
            reference: reference.to_string(),
            issues: vec![
                "does not match the reference grammar `name[:major[.minor]][[sub/part]]`"
                    .to_string(),
            ],
        })?;

        Self::new(
            &caps["name"],
            caps.name("major_version").map(|m| m.as_str().to_string()),
            caps.name("minor_version").map(|m| m.as_str().to_string()),
            caps.name("sub_part").map(|m| m.as_str().to_string()),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn major_version(&self) -> Option<&str> {
        self.major_version.as_deref()
    }

    pub fn minor_version(&self) -> Option<&str> {
        self.minor_version.as_deref()
    }

    pub fn sub_part(&self) -> Option<&str> {
        self.sub_part.as_deref()
    }

    /// Whether both version fields are pinned.
    pub fn is_fully_versioned(&self) -> bool {
        self.major_version.is_some() && self.minor_version.is_some()
    }
}

impl FromStr for AssetSpec {
    type Err = InvalidAssetSpec;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for AssetSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&format_reference(
            &self.name,
            self.major_version.as_deref(),
            self.minor_version.as_deref(),
            self.sub_part.as_deref(),
        ))
    }
}

fn format_reference(
    name: &str,
    major_version: Option<&str>,
    minor_version: Option<&str>,
    sub_part: Option<&str>,
) -> String {
    let mut out = String::from(name);
    if let Some(major) = major_version {
        out.push(':');
        out.push_str(major);
        if let Some(minor) = minor_version {
            out.push('.');
            out.push_str(minor);
        }
    }
    if let Some(sub) = sub_part {
        out.push('[');
        out.push_str(sub);
        out.push(']');
    }
    out
}
