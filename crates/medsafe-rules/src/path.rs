//! Field path resolution over the raw JSON payload.
//!
//! Patterns are dotted paths whose segments may carry an index (`[0]`) or a
//! wildcard (`[*]`): `patient.age`, `medications[*].dose`, `diagnoses[*]`.
//! Resolution yields one match per concrete path, e.g. `medications[1].dose`.
//!
//! A missing value or JSON `null` still yields a match with `value: None`, so
//! `Required` rules can report it. A wildcard over something that is not an
//! array yields nothing.

use medsafe_contracts::error::{MedsafeError, MedsafeResult};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Index {
    At(usize),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    key: String,
    indices: Vec<Index>,
}

/// A parsed field pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pattern: String,
    segments: Vec<Segment>,
}

/// One resolved location.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatch<'v> {
    pub path: String,
    pub value: Option<&'v Value>,
}

impl FieldPath {
    /// Parse `pattern`. Empty segments and malformed brackets are rejected.
    pub fn parse(pattern: &str) -> MedsafeResult<Self> {
        let invalid = |reason: &str| MedsafeError::DataError {
            field: pattern.to_string(),
            reason: reason.to_string(),
        };

        if pattern.trim().is_empty() {
            return Err(invalid("empty field path"));
        }

        let mut segments = Vec::new();
        for raw in pattern.split('.') {
            let (key, mut rest) = match raw.find('[') {
                Some(pos) => (&raw[..pos], &raw[pos..]),
                None => (raw, ""),
            };
            if key.is_empty() && rest.is_empty() {
                return Err(invalid("empty path segment"));
            }

            let mut indices = Vec::new();
            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(|| invalid("unclosed '['"))?;
                let inner = rest
                    .get(1..close)
                    .ok_or_else(|| invalid("malformed index"))?;
                indices.push(match inner {
                    "*" => Index::All,
                    n => Index::At(n.parse().map_err(|_| invalid("index must be a number or '*'"))?),
                });
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(invalid("unexpected text after ']'"));
                }
            }

            segments.push(Segment { key: key.to_string(), indices });
        }

        Ok(Self { pattern: pattern.to_string(), segments })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments
            .iter()
            .any(|s| s.indices.contains(&Index::All))
    }

    /// Every concrete location this pattern names in `root`.
    pub fn resolve<'v>(&self, root: &'v Value) -> Vec<PathMatch<'v>> {
        let mut matches = vec![PathMatch { path: String::new(), value: Some(root) }];

        for segment in &self.segments {
            let mut next = Vec::new();
            for m in matches {
                let mut path = m.path;
                let mut value = m.value;
                if !segment.key.is_empty() {
                    if !path.is_empty() {
                        path.push('.');
                    }
                    path.push_str(&segment.key);
                    value = value.and_then(|v| v.get(&segment.key)).filter(|v| !v.is_null());
                }
                expand(path, value, &segment.indices, &mut next);
            }
            matches = next;
        }

        matches
    }
}

fn expand<'v>(path: String, value: Option<&'v Value>, indices: &[Index], out: &mut Vec<PathMatch<'v>>) {
    let Some((first, rest)) = indices.split_first() else {
        out.push(PathMatch { path, value });
        return;
    };

    match first {
        Index::At(i) => {
            let item = value.and_then(|v| v.get(*i)).filter(|v| !v.is_null());
            expand(format!("{path}[{i}]"), item, rest, out);
        }
        Index::All => {
            if let Some(items) = value.and_then(Value::as_array) {
                for (i, item) in items.iter().enumerate() {
                    let item = Some(item).filter(|v| !v.is_null());
                    expand(format!("{path}[{i}]"), item, rest, out);
                }
            }
        }
    }
}
