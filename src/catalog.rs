use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Maps the enumerated type tags used in modeling exports to the numeric
/// identifiers the remote CMDB assigns to its CI and relationship types.
///
/// The mapping is configuration data, not code: deployments load it from
/// the config file or derive it from the remote type listings, and the
/// built-in default covers the standard ArchiMate vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCatalog {
    /// Asset type tag → remote CI type id.
    pub asset_types: BTreeMap<String, String>,
    /// Relationship type tag → remote relationship type id.
    pub relationship_types: BTreeMap<String, String>,
}

impl TypeCatalog {
    /// Loads a catalog from a TOML file with `[asset_types]` and
    /// `[relationship_types]` tables.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Resolves an asset type tag to its remote CI type id.
    pub fn asset_type_id(&self, tag: &str) -> Result<&str> {
        self.asset_types
            .get(tag)
            .map(String::as_str)
            .ok_or_else(|| SyncError::UnknownType(tag.to_string()))
    }

    /// Resolves a relationship type tag to its remote relationship type id.
    pub fn relationship_type_id(&self, tag: &str) -> Result<&str> {
        self.relationship_types
            .get(tag)
            .map(String::as_str)
            .ok_or_else(|| SyncError::UnknownRelationshipType(tag.to_string()))
    }

    /// Rebuilds the relationship half of the catalog from the remote
    /// relationship-type listing. Remote display names such as
    /// `"Sends data to"` are normalized (whitespace and filler words
    /// removed, `Relationship` suffix appended) and matched against the
    /// known tag vocabulary; unmatched entries are ignored.
    pub fn merge_remote_relationships(&mut self, remote: &[RemoteRelationshipType]) {
        let known: Vec<String> = self.relationship_types.keys().cloned().collect();
        for entry in remote {
            let candidate = normalize_relationship_name(&entry.forward_relationship);
            if known.iter().any(|tag| *tag == candidate) {
                self.relationship_types
                    .insert(candidate, entry.id.to_string());
            }
        }
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        let asset_types = [
            ("ApplicationComponent", "10001075119"),
            ("ApplicationInterface", "10001075120"),
            ("ApplicationService", "10001075121"),
            ("ApplicationProcess", "10001075122"),
            ("Artifact", "10001075124"),
            ("Node", "10001075125"),
            ("TechnologyInterface", "10001075126"),
            ("TechnologyProcess", "10001075127"),
            ("TechnologyService", "10001075128"),
            ("DataObject", "10001075342"),
            ("Grouping", "10001075579"),
            ("Contract", "10001075891"),
            ("BusinessService", "10000946884"),
            ("BusinessProcess", "10001075893"),
            ("Representation", "10001075894"),
            ("BusinessEvent", "10001075895"),
        ];
        let relationship_types = [
            ("CompositionRelationship", "10000527161"),
            ("RealizationRelationship", "10000527162"),
            ("AccessRelationship", "10000527160"),
            ("AssignmentRelationship", "10000527163"),
            ("FlowRelationship", "10000527164"),
            ("TriggeringRelationship", "10000527166"),
            ("AssociationRelationship", "10000527165"),
            ("ServingRelationship", "10000527167"),
        ];
        Self {
            asset_types: to_map(&asset_types),
            relationship_types: to_map(&relationship_types),
        }
    }
}

/// One entry of the remote `relationship_types` listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRelationshipType {
    pub id: u64,
    #[serde(default)]
    pub forward_relationship: String,
}

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(tag, id)| (tag.to_string(), id.to_string()))
        .collect()
}

fn normalize_relationship_name(display: &str) -> String {
    let mut compact = display.replace(' ', "");
    for filler in ["to", "with"] {
        compact = compact.replace(filler, "");
    }
    format!("{compact}Relationship")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_resolves_known_tags() {
        let catalog = TypeCatalog::default();
        assert_eq!(catalog.asset_type_id("Node").unwrap(), "10001075125");
        assert_eq!(
            catalog.relationship_type_id("FlowRelationship").unwrap(),
            "10000527164"
        );
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let catalog = TypeCatalog::default();
        assert!(matches!(
            catalog.asset_type_id("Mainframe"),
            Err(SyncError::UnknownType(tag)) if tag == "Mainframe"
        ));
        assert!(matches!(
            catalog.relationship_type_id("UsesRelationship"),
            Err(SyncError::UnknownRelationshipType(_))
        ));
    }

    #[test]
    fn remote_relationship_names_merge_by_normalized_match() {
        let mut catalog = TypeCatalog::default();
        let remote = vec![
            RemoteRelationshipType {
                id: 42,
                forward_relationship: "Flow".to_string(),
            },
            RemoteRelationshipType {
                id: 77,
                forward_relationship: "Depends on".to_string(),
            },
        ];
        catalog.merge_remote_relationships(&remote);
        assert_eq!(catalog.relationship_type_id("FlowRelationship").unwrap(), "42");
        // Unmatched remote names never widen the vocabulary.
        assert!(catalog.relationship_type_id("DependsonRelationship").is_err());
    }
}
