use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, error, info, instrument, warn};

use crate::archive::{ArchiveClient, ArchivePurpose};
use crate::catalog::TypeCatalog;
use crate::cmdb::{
    AssociatePayload, CmdbClient, ConfigItemFields, ConfigItemPayload, RemoteAssetIndex,
};
use crate::error::{Result, SyncError};
use crate::io::table_read;
use crate::model::{DesiredAsset, DesiredRelationship, DisplayId, RemoteAsset};

/// Action the reconciler decided on for a single desired asset.
#[derive(Debug, Clone)]
pub enum AssetAction {
    /// No remote record carries this asset's external id yet.
    Create { item: ConfigItemPayload },
    /// A remote record exists but one of name, type id, or description
    /// diverges from the desired state.
    Update {
        display_id: DisplayId,
        item: ConfigItemPayload,
    },
    /// The remote record already matches; no call will be made.
    Unchanged { external_id: String },
    /// The row references a type tag outside the catalog. Decided before
    /// any network traffic; the rest of the batch is unaffected.
    Rejected { external_id: String, reason: String },
}

/// Row-level outcome counters for a batch. `rejected` counts rows the
/// input made unprocessable (unknown tags, unresolvable ids); `excluded`
/// counts rows dropped by batch-scoping policy, which is not an error.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub excluded: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl RunReport {
    pub fn rows(&self) -> usize {
        self.created
            + self.updated
            + self.unchanged
            + self.deleted
            + self.excluded
            + self.rejected
            + self.failed
    }
}

/// Computes the create/update/no-op decision for every desired asset
/// against the current remote table. Pure: issues no network calls.
///
/// Existence is decided by exact equality between the remote `asset_tag`
/// and the desired `external_id`. The import scripts this replaces used a
/// substring match here, which falsely matched ids prefixing longer ids.
///
/// When `provenance` is given, each payload carries a
/// `file_imported_from_<type id>` attribute naming the source file.
pub fn plan_assets(
    desired: &[DesiredAsset],
    remote: &[RemoteAsset],
    catalog: &TypeCatalog,
    provenance: Option<&str>,
) -> Vec<AssetAction> {
    desired
        .iter()
        .map(|asset| plan_one_asset(asset, remote, catalog, provenance))
        .collect()
}

fn plan_one_asset(
    asset: &DesiredAsset,
    remote: &[RemoteAsset],
    catalog: &TypeCatalog,
    provenance: Option<&str>,
) -> AssetAction {
    let type_id = match catalog.asset_type_id(&asset.type_tag) {
        Ok(type_id) => type_id.to_string(),
        Err(reason) => {
            return AssetAction::Rejected {
                external_id: asset.external_id.clone(),
                reason: reason.to_string(),
            };
        }
    };

    let name = asset.canonical_name();
    let mut attributes = BTreeMap::new();
    if let Some(file) = provenance {
        attributes.insert(format!("file_imported_from_{type_id}"), file.to_string());
    }
    let item = ConfigItemPayload {
        cmdb_config_item: ConfigItemFields {
            name: name.clone(),
            ci_type_id: type_id.clone(),
            description: asset.documentation.clone(),
            asset_tag: asset.external_id.clone(),
            level_field_attributes: attributes,
        },
    };

    match remote
        .iter()
        .find(|record| record.asset_tag == asset.external_id)
    {
        None => AssetAction::Create { item },
        Some(record) => {
            let in_sync = record.name.trim() == name
                && record.ci_type_id == type_id
                && record.description.trim() == asset.documentation.trim();
            if in_sync {
                AssetAction::Unchanged {
                    external_id: asset.external_id.clone(),
                }
            } else {
                AssetAction::Update {
                    display_id: record.display_id,
                    item,
                }
            }
        }
    }
}

/// Applies a planned batch of asset actions. Each create/update is an
/// independent round trip whose outcome is logged; a rejected remote call
/// is counted in the report and never stops the remaining rows.
#[instrument(level = "info", skip_all, fields(actions = plan.len()))]
pub fn reconcile_assets(client: &CmdbClient, plan: &[AssetAction]) -> RunReport {
    let mut report = RunReport::default();
    for action in plan {
        match action {
            AssetAction::Create { item } => {
                let tag = &item.cmdb_config_item.asset_tag;
                match client.create_asset(item) {
                    Ok(_) => {
                        info!(asset_tag = %tag, name = %item.cmdb_config_item.name, "asset created");
                        report.created += 1;
                    }
                    Err(err) => {
                        error!(asset_tag = %tag, %err, "asset create failed");
                        report.failed += 1;
                    }
                }
            }
            AssetAction::Update { display_id, item } => {
                let tag = &item.cmdb_config_item.asset_tag;
                match client.update_asset(*display_id, item) {
                    Ok(_) => {
                        info!(asset_tag = %tag, display_id, "asset updated");
                        report.updated += 1;
                    }
                    Err(err) => {
                        error!(asset_tag = %tag, display_id, %err, "asset update failed");
                        report.failed += 1;
                    }
                }
            }
            AssetAction::Unchanged { external_id } => {
                debug!(asset_tag = %external_id, "asset already in sync");
                report.unchanged += 1;
            }
            AssetAction::Rejected {
                external_id,
                reason,
            } => {
                error!(asset_tag = %external_id, reason, "asset row rejected");
                report.rejected += 1;
            }
        }
    }
    report
}

/// A relationship whose endpoints resolved to remote record ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAssociation {
    pub source_id: DisplayId,
    pub target_id: DisplayId,
    pub relationship_type_id: String,
}

/// Resolves desired relationships against the asset batch and the remote
/// index. Pure: issues no network calls.
///
/// Relationships with an endpoint absent from the accompanying asset batch
/// are excluded silently; that is batch-scoping policy, not an error.
/// Name-resolution failures and unknown relationship tags are reported per
/// relationship and skipped, leaving the rest of the batch intact.
pub fn resolve_relationships(
    desired: &[DesiredRelationship],
    assets: &[DesiredAsset],
    catalog: &TypeCatalog,
    index: &RemoteAssetIndex,
) -> (Vec<ResolvedAssociation>, RunReport) {
    let names_by_id: BTreeMap<&str, String> = assets
        .iter()
        .map(|asset| (asset.external_id.as_str(), asset.canonical_name()))
        .collect();

    let mut resolved = Vec::new();
    let mut report = RunReport::default();
    for relationship in desired {
        let (Some(source_name), Some(target_name)) = (
            names_by_id.get(relationship.source_external_id.as_str()),
            names_by_id.get(relationship.target_external_id.as_str()),
        ) else {
            debug!(
                source = %relationship.source_external_id,
                target = %relationship.target_external_id,
                "relationship endpoint outside asset batch; excluded"
            );
            report.excluded += 1;
            continue;
        };

        let relationship_type_id = match catalog.relationship_type_id(&relationship.type_tag) {
            Ok(id) => id.to_string(),
            Err(err) => {
                error!(source = %source_name, target = %target_name, %err, "relationship row rejected");
                report.rejected += 1;
                continue;
            }
        };

        match (index.id_by_name(source_name), index.id_by_name(target_name)) {
            (Some(source_id), Some(target_id)) => {
                resolved.push(ResolvedAssociation {
                    source_id,
                    target_id,
                    relationship_type_id,
                });
            }
            (source_id, _) => {
                let missing = if source_id.is_none() {
                    source_name
                } else {
                    target_name
                };
                let err = SyncError::Resolution {
                    name: missing.clone(),
                    source_name: source_name.clone(),
                    target_name: target_name.clone(),
                };
                warn!(%err, "relationship endpoint not resolvable; skipped");
                report.failed += 1;
            }
        }
    }
    (resolved, report)
}

/// Issues one association call per resolved relationship, directionally:
/// the source owns the association, the target rides in the payload with
/// the forward direction tag. Failures are logged and counted; the batch
/// always runs to completion.
#[instrument(level = "info", skip_all, fields(associations = resolved.len()))]
pub fn apply_associations(client: &CmdbClient, resolved: &[ResolvedAssociation]) -> RunReport {
    let mut report = RunReport::default();
    for association in resolved {
        let payload = AssociatePayload::forward(
            association.target_id,
            association.relationship_type_id.clone(),
        );
        match client.associate(association.source_id, &payload) {
            Ok(_) => {
                info!(
                    source_id = association.source_id,
                    target_id = association.target_id,
                    "relationship created"
                );
                report.created += 1;
            }
            Err(err) => {
                error!(
                    source_id = association.source_id,
                    target_id = association.target_id,
                    %err,
                    "association call failed"
                );
                report.failed += 1;
            }
        }
    }
    report
}

/// Resolves each external id through the index and deletes the matching
/// remote record (softly unless `permanent`). Unresolvable ids are
/// reported, not raised.
#[instrument(level = "info", skip_all, fields(ids = external_ids.len(), permanent))]
pub fn delete_batch(
    client: &CmdbClient,
    external_ids: &[String],
    index: &RemoteAssetIndex,
    permanent: bool,
) -> RunReport {
    let mut report = RunReport::default();
    for external_id in external_ids {
        let Some(display_id) = index.id_by_tag(external_id) else {
            warn!(asset_tag = %external_id, "no remote asset for tag; skipped");
            report.rejected += 1;
            continue;
        };
        match client.delete_asset(display_id, permanent) {
            Ok(_) => {
                info!(asset_tag = %external_id, display_id, "asset deleted");
                report.deleted += 1;
            }
            Err(err) => {
                error!(asset_tag = %external_id, display_id, %err, "asset delete failed");
                report.failed += 1;
            }
        }
    }
    report
}

/// Soft-deletes remote records whose asset tag does not appear in the
/// desired batch. Opt-in only: reconciliation itself never deletes.
#[instrument(level = "info", skip_all)]
pub fn prune_missing(
    client: &CmdbClient,
    desired: &[DesiredAsset],
    remote: &[RemoteAsset],
) -> RunReport {
    let mut report = RunReport::default();
    for record in remote {
        if record.asset_tag.is_empty() {
            continue;
        }
        if desired
            .iter()
            .any(|asset| asset.external_id == record.asset_tag)
        {
            continue;
        }
        match client.delete_asset(record.display_id, false) {
            Ok(_) => {
                info!(asset_tag = %record.asset_tag, display_id = record.display_id, "stale asset pruned");
                report.deleted += 1;
            }
            Err(err) => {
                error!(asset_tag = %record.asset_tag, display_id = record.display_id, %err, "prune failed");
                report.failed += 1;
            }
        }
    }
    report
}

/// Full ingest run: reconcile assets, resolve and apply relationships,
/// then archive the source files. The remote index is rebuilt between the
/// asset and relationship phases so freshly created records resolve.
#[instrument(
    level = "info",
    skip_all,
    fields(elements = %element_file.display(), relationships = %relationship_file.display())
)]
pub fn ingest(
    client: &CmdbClient,
    archive: Option<&ArchiveClient>,
    catalog: &TypeCatalog,
    element_file: &Path,
    relationship_file: &Path,
    prune: bool,
) -> Result<RunReport> {
    client.reset_calls();
    let assets = table_read::read_assets(element_file)?;
    let relationships = table_read::read_relationships(relationship_file)?;
    info!(
        asset_rows = assets.len(),
        relationship_rows = relationships.len(),
        "exports loaded"
    );

    let remote = client.fetch_all_assets()?;
    let provenance = element_file
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string);
    let plan = plan_assets(&assets, &remote, catalog, provenance.as_deref());
    let mut report = reconcile_assets(client, &plan);

    if prune {
        let pruned = prune_missing(client, &assets, &remote);
        report.deleted += pruned.deleted;
        report.failed += pruned.failed;
    }

    // Relationships need post-reconciliation ids, including the ones the
    // creates just minted.
    let index = RemoteAssetIndex::build(&client.fetch_all_assets()?);
    let (resolved, resolution) = resolve_relationships(&relationships, &assets, catalog, &index);
    let association = apply_associations(client, &resolved);
    report.excluded += resolution.excluded;
    report.rejected += resolution.rejected;
    report.failed += resolution.failed + association.failed;

    if let Some(archive) = archive {
        let uploads = [
            (element_file, ArchivePurpose::Elements),
            (relationship_file, ArchivePurpose::Relations),
        ];
        for (file, purpose) in uploads {
            match archive.upload(purpose, file) {
                Ok(link) => info!(file = %file.display(), link, "export archived"),
                // The sync already completed; the archive copy is best effort.
                Err(err) => warn!(file = %file.display(), %err, "archive upload failed"),
            }
        }
    }

    info!(
        created = report.created,
        updated = report.updated,
        unchanged = report.unchanged,
        deleted = report.deleted,
        excluded = report.excluded,
        rejected = report.rejected,
        failed = report.failed,
        calls = client.calls_made(),
        "ingest complete"
    );
    Ok(report)
}

/// Batch delete driven by an element export: every id listed in the file
/// is resolved and soft-deleted (or permanently removed with `permanent`).
#[instrument(level = "info", skip_all, fields(elements = %element_file.display(), permanent))]
pub fn delete_from_file(
    client: &CmdbClient,
    element_file: &Path,
    permanent: bool,
) -> Result<RunReport> {
    client.reset_calls();
    let assets = table_read::read_assets(element_file)?;
    let external_ids: Vec<String> = assets.into_iter().map(|asset| asset.external_id).collect();
    let index = RemoteAssetIndex::build(&client.fetch_all_assets()?);
    let report = delete_batch(client, &external_ids, &index, permanent);
    info!(
        deleted = report.deleted,
        rejected = report.rejected,
        failed = report.failed,
        calls = client.calls_made(),
        "delete run complete"
    );
    Ok(report)
}
