use serde::{Deserialize, Serialize};

/// Identifier assigned by the remote CMDB to a configuration item. It is
/// immutable once created and never known ahead of the create call.
pub type DisplayId = u64;

/// An asset row from an architecture-modeling export.
///
/// The `external_id` is the stable identifier minted by the upstream
/// modeling tool; it is stored in the CMDB's free-text asset-tag field and
/// serves as the natural join key against remote records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredAsset {
    /// Display name, possibly carrying a parenthetical suffix that is
    /// stripped before comparison or upload.
    pub name: String,
    /// Enumerated type tag, e.g. `ApplicationComponent` or `Node`.
    pub type_tag: String,
    /// Stable unique identifier from the source modeling tool.
    pub external_id: String,
    /// Free-text documentation carried into the remote description field.
    pub documentation: String,
}

impl DesiredAsset {
    /// Returns the canonical form of the asset name: parentheticals
    /// stripped, whitespace trimmed.
    pub fn canonical_name(&self) -> String {
        canonical_name(&self.name)
    }
}

/// A relationship row from an architecture-modeling export. Both endpoints
/// reference asset `external_id`s from the same export batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRelationship {
    pub source_external_id: String,
    pub target_external_id: String,
    /// Enumerated relationship tag, e.g. `FlowRelationship`.
    pub type_tag: String,
}

/// A configuration item as reported by the remote listing endpoint. Fields
/// outside the reconciliation comparison set are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
    pub display_id: DisplayId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// Remote numeric type identifier, transported as a string.
    #[serde(default, deserialize_with = "lenient_string")]
    pub ci_type_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    /// Holds the desired asset's `external_id`; the join key.
    #[serde(default, deserialize_with = "lenient_string")]
    pub asset_tag: String,
}

/// Strips any `(...)` parenthetical runs from a name and trims surrounding
/// whitespace. Idempotent: applying it twice equals applying it once.
pub fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut depth = 0usize;
    for ch in name.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_string()
}

// The listing endpoint reports numeric type ids as numbers or strings and
// nulls out blank text fields, so every comparison field is read leniently.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Number(number) => number.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
