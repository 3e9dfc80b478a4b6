use std::fs;

use cmdb_sync::SyncError;
use cmdb_sync::io::table_read::{read_assets, read_relationships};
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

#[test]
fn reads_assets_from_csv_by_header_name() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("elements.csv");
    fs::write(
        &path,
        "ID,Name,Type,Documentation\n\
         g1,Server1 (old),Node,d1\n\
         g2, Portal ,ApplicationComponent,\n\
         ,Skipped,Node,no id\n",
    )
    .expect("CSV written");

    let assets = read_assets(&path).expect("assets read");

    assert_eq!(assets.len(), 2);
    assert_eq!(assets[0].external_id, "g1");
    assert_eq!(assets[0].name, "Server1 (old)");
    assert_eq!(assets[0].canonical_name(), "Server1");
    assert_eq!(assets[1].name, "Portal");
    assert_eq!(assets[1].documentation, "");
}

#[test]
fn reads_relationships_from_csv() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("relations.csv");
    fs::write(
        &path,
        "Source,Target,Type,ID\n\
         g1,g2,FlowRelationship,r1\n\
         ,g2,FlowRelationship,r2\n",
    )
    .expect("CSV written");

    let relationships = read_relationships(&path).expect("relationships read");

    assert_eq!(relationships.len(), 1);
    assert_eq!(relationships[0].source_external_id, "g1");
    assert_eq!(relationships[0].target_external_id, "g2");
    assert_eq!(relationships[0].type_tag, "FlowRelationship");
}

#[test]
fn reads_assets_from_xlsx_first_sheet() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("elements.xlsx");

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    // Leading index column, like the tool exports produce.
    for (col, header) in ["Idx", "Name", "Type", "ID", "Documentation"]
        .iter()
        .enumerate()
    {
        worksheet.write_string(0, col as u16, *header).expect("header");
    }
    for (row, cells) in [
        ["1", "Server1 (old)", "Node", "g1", "d1"],
        ["2", "Portal", "ApplicationComponent", "g2", "doc"],
    ]
    .iter()
    .enumerate()
    {
        for (col, cell) in cells.iter().enumerate() {
            worksheet
                .write_string((row + 1) as u32, col as u16, *cell)
                .expect("cell");
        }
    }
    workbook.save(&path).expect("workbook saved");

    let assets = read_assets(&path).expect("assets read");

    assert_eq!(assets.len(), 2);
    assert_eq!(assets[0].external_id, "g1");
    assert_eq!(assets[1].type_tag, "ApplicationComponent");
}

#[test]
fn missing_column_is_an_input_error() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("broken.csv");
    fs::write(&path, "Name,Type,Documentation\nA,Node,d\n").expect("CSV written");

    let error = read_assets(&path).expect_err("must fail");
    assert!(matches!(error, SyncError::InvalidTable(message) if message.contains("'ID'")));
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("elements.ods");
    fs::write(&path, "x").expect("file written");

    let error = read_assets(&path).expect_err("must fail");
    assert!(matches!(error, SyncError::UnsupportedFormat(_)));
}
