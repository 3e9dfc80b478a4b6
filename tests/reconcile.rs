use cmdb_sync::catalog::TypeCatalog;
use cmdb_sync::cmdb::RemoteAssetIndex;
use cmdb_sync::model::{DesiredAsset, DesiredRelationship, RemoteAsset};
use cmdb_sync::sync::{AssetAction, plan_assets, resolve_relationships};

fn desired(name: &str, type_tag: &str, external_id: &str, documentation: &str) -> DesiredAsset {
    DesiredAsset {
        name: name.to_string(),
        type_tag: type_tag.to_string(),
        external_id: external_id.to_string(),
        documentation: documentation.to_string(),
    }
}

fn remote(display_id: u64, name: &str, ci_type_id: &str, description: &str, tag: &str) -> RemoteAsset {
    RemoteAsset {
        display_id,
        name: name.to_string(),
        ci_type_id: ci_type_id.to_string(),
        description: description.to_string(),
        asset_tag: tag.to_string(),
    }
}

#[test]
fn absent_asset_plans_exactly_one_create_with_canonical_fields() {
    let catalog = TypeCatalog::default();
    let batch = vec![desired("Server1 (old)", "Node", "g1", "d1")];

    let plan = plan_assets(&batch, &[], &catalog, Some("elements.csv"));

    assert_eq!(plan.len(), 1);
    let AssetAction::Create { item } = &plan[0] else {
        panic!("expected a create, got {:?}", plan[0]);
    };
    let fields = &item.cmdb_config_item;
    assert_eq!(fields.name, "Server1");
    assert_eq!(fields.ci_type_id, "10001075125");
    assert_eq!(fields.asset_tag, "g1");
    assert_eq!(fields.description, "d1");
    assert_eq!(
        fields.level_field_attributes.get("file_imported_from_10001075125"),
        Some(&"elements.csv".to_string())
    );
}

#[test]
fn matching_asset_plans_no_call() {
    let catalog = TypeCatalog::default();
    let batch = vec![desired("Server1 (old)", "Node", "g1", "d1")];
    let table = vec![remote(7, "Server1", "10001075125", "d1", "g1")];

    let plan = plan_assets(&batch, &table, &catalog, None);

    assert!(matches!(&plan[0], AssetAction::Unchanged { external_id } if external_id == "g1"));
}

#[test]
fn diverging_documentation_plans_exactly_one_update() {
    let catalog = TypeCatalog::default();
    let batch = vec![desired("Server1", "Node", "g1", "new text")];
    let table = vec![remote(7, "Server1", "10001075125", "old text", "g1")];

    let plan = plan_assets(&batch, &table, &catalog, None);

    let AssetAction::Update { display_id, item } = &plan[0] else {
        panic!("expected an update, got {:?}", plan[0]);
    };
    assert_eq!(*display_id, 7);
    assert_eq!(item.cmdb_config_item.description, "new text");
}

#[test]
fn comparison_trims_whitespace_before_deciding() {
    let catalog = TypeCatalog::default();
    let batch = vec![desired("Server1", "Node", "g1", "  d1  ")];
    let table = vec![remote(7, " Server1 ", "10001075125", "d1", "g1")];

    let plan = plan_assets(&batch, &table, &catalog, None);

    assert!(matches!(&plan[0], AssetAction::Unchanged { .. }));
}

#[test]
fn unknown_type_tag_is_rejected_without_planning_a_call() {
    let catalog = TypeCatalog::default();
    let batch = vec![
        desired("A", "Mainframe", "g1", ""),
        desired("B", "Node", "g2", ""),
    ];

    let plan = plan_assets(&batch, &[], &catalog, None);

    assert!(matches!(&plan[0], AssetAction::Rejected { external_id, .. } if external_id == "g1"));
    // The bad row never affects its neighbours.
    assert!(matches!(&plan[1], AssetAction::Create { .. }));
}

#[test]
fn tag_matching_is_exact_not_substring() {
    let catalog = TypeCatalog::default();
    let batch = vec![desired("A", "Node", "g1", "")];
    // A remote tag that merely contains "g1" must not count as a match.
    let table = vec![remote(9, "Other", "10001075125", "", "g12")];

    let plan = plan_assets(&batch, &table, &catalog, None);

    assert!(matches!(&plan[0], AssetAction::Create { .. }));
}

fn relationship(source: &str, target: &str, type_tag: &str) -> DesiredRelationship {
    DesiredRelationship {
        source_external_id: source.to_string(),
        target_external_id: target.to_string(),
        type_tag: type_tag.to_string(),
    }
}

#[test]
fn dangling_relationship_is_excluded_silently() {
    let catalog = TypeCatalog::default();
    let assets = vec![desired("Server1", "Node", "g1", "")];
    let index = RemoteAssetIndex::build(&[remote(1, "Server1", "10001075125", "", "g1")]);
    let batch = vec![relationship("g1", "g2", "FlowRelationship")];

    let (resolved, report) = resolve_relationships(&batch, &assets, &catalog, &index);

    assert!(resolved.is_empty());
    // Batch-scoping policy, not a bad row: counted apart from rejections.
    assert_eq!(report.excluded, 1);
    assert_eq!(report.rejected, 0);
    assert_eq!(report.failed, 0);
}

#[test]
fn one_unresolvable_relationship_never_blocks_the_rest() {
    let catalog = TypeCatalog::default();
    let assets = vec![
        desired("Server1", "Node", "g1", ""),
        desired("Server2", "Node", "g2", ""),
        desired("Ghost", "Node", "g3", ""),
    ];
    // "Ghost" never made it into the CMDB, so g1->g3 cannot resolve.
    let index = RemoteAssetIndex::build(&[
        remote(1, "Server1", "10001075125", "", "g1"),
        remote(2, "Server2", "10001075125", "", "g2"),
    ]);
    let batch = vec![
        relationship("g1", "g3", "FlowRelationship"),
        relationship("g1", "g2", "ServingRelationship"),
    ];

    let (resolved, report) = resolve_relationships(&batch, &assets, &catalog, &index);

    assert_eq!(report.failed, 1);
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].source_id, 1);
    assert_eq!(resolved[0].target_id, 2);
    assert_eq!(resolved[0].relationship_type_id, "10000527167");
}

#[test]
fn unknown_relationship_tag_is_reported_and_skipped() {
    let catalog = TypeCatalog::default();
    let assets = vec![
        desired("Server1", "Node", "g1", ""),
        desired("Server2", "Node", "g2", ""),
    ];
    let index = RemoteAssetIndex::build(&[
        remote(1, "Server1", "10001075125", "", "g1"),
        remote(2, "Server2", "10001075125", "", "g2"),
    ]);
    let batch = vec![
        relationship("g1", "g2", "UsesRelationship"),
        relationship("g2", "g1", "FlowRelationship"),
    ];

    let (resolved, report) = resolve_relationships(&batch, &assets, &catalog, &index);

    assert_eq!(report.rejected, 1);
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].source_id, 2);
}

#[test]
fn relationships_resolve_through_canonical_names() {
    let catalog = TypeCatalog::default();
    let assets = vec![
        desired("Server1 (legacy)", "Node", "g1", ""),
        desired("Server2", "Node", "g2", ""),
    ];
    // The remote table stored the suffixed historical spelling.
    let index = RemoteAssetIndex::build(&[
        remote(1, "Server1 (legacy)", "10001075125", "", "g1"),
        remote(2, "Server2", "10001075125", "", "g2"),
    ]);
    let batch = vec![relationship("g1", "g2", "FlowRelationship")];

    let (resolved, report) = resolve_relationships(&batch, &assets, &catalog, &index);

    assert_eq!(report.rows(), 0);
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].source_id, 1);
}
