use std::collections::BTreeMap;

use tracing::warn;

use crate::model::{DisplayId, RemoteAsset, canonical_name};

/// Per-run read model over the remote asset table. Built once from a full
/// listing fetch and never refreshed: staleness beyond a single run is not
/// tolerated, so every reconciliation starts with a rebuild.
#[derive(Debug, Default)]
pub struct RemoteAssetIndex {
    name_to_id: BTreeMap<String, DisplayId>,
    tag_to_id: BTreeMap<String, DisplayId>,
}

impl RemoteAssetIndex {
    /// Derives the lookup maps from a freshly fetched asset table. Names
    /// are canonicalized before indexing because the remote system stores
    /// either the suffixed or the stripped form, depending on when the
    /// record was entered.
    pub fn build(assets: &[RemoteAsset]) -> Self {
        let mut index = Self::default();
        for asset in assets {
            let name = canonical_name(&asset.name);
            if let Some(previous) = index.name_to_id.insert(name.clone(), asset.display_id) {
                warn!(
                    name,
                    kept = asset.display_id,
                    shadowed = previous,
                    "duplicate remote asset name; later record wins"
                );
            }
            if !asset.asset_tag.is_empty() {
                index.tag_to_id.insert(asset.asset_tag.clone(), asset.display_id);
            }
        }
        index
    }

    /// Looks up a remote id by canonical asset name. Callers pass names
    /// already run through [`canonical_name`].
    pub fn id_by_name(&self, name: &str) -> Option<DisplayId> {
        self.name_to_id.get(name).copied()
    }

    /// Looks up a remote id by asset tag (the desired asset's external id).
    /// Exact match only.
    pub fn id_by_tag(&self, tag: &str) -> Option<DisplayId> {
        self.tag_to_id.get(tag).copied()
    }

    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty()
    }
}
