use anyhow::Result;
use std::{
    collections::BTreeMap,
    fs,
    io::{Cursor, Write},
    path::Path,
};
use tablecmp::{
    config::RunConfig,
    output::{render, Format, RenderOptions},
    run, CellValue, FileLoader, RunOptions,
};
use zip::write::SimpleFileOptions;

fn write(dir: &Path, name: &str, body: &str) -> Result<String> {
    let path = dir.join(name);
    fs::write(&path, body)?;
    Ok(path.display().to_string())
}

/// Two-sheet workbook; `Staff` holds the people table, `Notes` is unrelated.
fn write_workbook(dir: &Path, name: &str) -> Result<String> {
    const WORKBOOK: &str = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Notes" sheetId="1" r:id="rId1"/><sheet name="Staff" sheetId="2" r:id="rId2"/></sheets></workbook>"#;
    const RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/></Relationships>"#;
    const NOTES: &str = r#"<worksheet><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>memo</t></is></c></row></sheetData></worksheet>"#;
    const STAFF: &str = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>ID</t></is></c><c r="B1" t="inlineStr"><is><t>Name</t></is></c></row>
<row r="2"><c r="A2"><v>1</v></c><c r="B2" t="inlineStr"><is><t>Alice</t></is></c></row>
<row r="3"><c r="A3"><v>2.0</v></c><c r="B3" t="inlineStr"><is><t>Robert</t></is></c></row>
</sheetData></worksheet>"#;

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        for (part, body) in [
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/worksheets/sheet1.xml", NOTES),
            ("xl/worksheets/sheet2.xml", STAFF),
        ] {
            zip.start_file(part, SimpleFileOptions::default())?;
            zip.write_all(body.as_bytes())?;
        }
        zip.finish()?;
    }
    let path = dir.join(name);
    fs::write(&path, buf)?;
    Ok(path.display().to_string())
}

#[test]
fn workbook_sheet_is_compared_against_csv() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let csv = write(dir.path(), "people.csv", "ID,Name\n1,Alice\n2,Bob\n")?;
    let book = write_workbook(dir.path(), "people.xlsx")?;

    let config = RunConfig::from_yaml("sheets:\n  people.xlsx: Staff\n")?.merge(RunConfig {
        sources: vec![csv, book],
        ..Default::default()
    });
    let report = run(&config.resolve_sources()?, &FileLoader, &RunOptions::default());

    let pair = report
        .get("people.csv_vs_people.xlsx")
        .and_then(|o| o.comparison())
        .expect("pair compared");
    assert!(pair.notices.is_empty());
    // spreadsheet 2.0 matches CSV 2
    let id = pair.columns.get("ID_vs_ID").expect("ID column");
    assert_eq!((id.rows_compared, id.rows_equal), (2, 2));
    let name = pair.columns.get("Name_vs_Name").expect("Name column");
    assert_eq!(name.rows_equal, 1);
    assert_eq!(name.discrepancies[0].row, 1);
    assert_eq!(name.discrepancies[0].left, CellValue::from("Bob"));
    assert_eq!(name.discrepancies[0].right, CellValue::from("Robert"));

    // without the selector the header-only first sheet is read
    let unselected = RunConfig {
        sources: config.sources.clone(),
        ..Default::default()
    };
    let report = run(&unselected.resolve_sources()?, &FileLoader, &RunOptions::default());
    let failure = report
        .get("people.csv_vs_people.xlsx")
        .and_then(|o| o.failure())
        .expect("pair failed");
    assert_eq!(failure.errors[0].kind(), "EmptyColumnComparison");
    assert!(failure.errors[0].to_string().contains("`memo`"));

    // an unknown sheet fails the pair, not the run
    let missing = RunConfig {
        sources: config.sources.clone(),
        sheets: BTreeMap::from([("people.xlsx".to_string(), "Payroll".to_string())]),
        ..Default::default()
    };
    let report = run(&missing.resolve_sources()?, &FileLoader, &RunOptions::default());
    let failure = report
        .get("people.csv_vs_people.xlsx")
        .and_then(|o| o.failure())
        .expect("pair failed");
    assert_eq!(failure.errors[0].kind(), "SheetNotFound");
    Ok(())
}

#[test]
fn compares_every_pair_of_files_on_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write(dir.path(), "a.csv", "ID,Name\n1,Alice\n2,Bob\n")?;
    let b = write(dir.path(), "b.csv", "ID,Name\n1,Alice\n2,Robert\n")?;
    let c = write(dir.path(), "c.tsv", "ID\tName\tExtra\n1.0\tAlice\tx\n2\tBob\ty\n3\tCarol\tz\n")?;

    let config = RunConfig {
        sources: vec![a, b, c],
        ..Default::default()
    };
    let sources = config.resolve_sources()?;
    let report = run(&sources, &FileLoader, &RunOptions { jobs: Some(2) });

    let keys: Vec<_> = report.pairs.keys().collect();
    assert_eq!(keys, vec!["a.csv_vs_b.csv", "a.csv_vs_c.tsv", "b.csv_vs_c.tsv"]);
    assert!(!report.has_failures());

    let ab = report.get("a.csv_vs_b.csv").unwrap().comparison().unwrap();
    let name = ab.columns.get("Name_vs_Name").unwrap();
    assert_eq!((name.rows_compared, name.rows_equal), (2, 1));
    assert_eq!(name.discrepancies[0].row, 1);
    assert_eq!(name.discrepancies[0].left, CellValue::from("Bob"));
    assert_eq!(name.discrepancies[0].right, CellValue::from("Robert"));

    // 1.0 in the TSV equals 1 in the CSV; the extra column and row are skipped
    let ac = report.get("a.csv_vs_c.tsv").unwrap().comparison().unwrap();
    assert_eq!(ac.columns.len(), 2);
    assert_eq!(ac.notices.len(), 2);
    let id = ac.columns.get("ID_vs_ID").unwrap();
    assert_eq!((id.rows_compared, id.rows_equal), (2, 2));
    assert!(ac.is_identical());
    Ok(())
}

#[test]
fn load_failures_are_reported_per_pair() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write(dir.path(), "a.csv", "x\n1\n")?;
    let b = write(dir.path(), "b.csv", "x\n1\n")?;
    let bad = write(dir.path(), "notes.txt", "x\n1\n")?;
    let gone = dir.path().join("gone.csv").display().to_string();

    let config = RunConfig {
        sources: vec![a, b, bad, gone],
        ..Default::default()
    };
    let report = run(&config.resolve_sources()?, &FileLoader, &RunOptions::default());

    assert!(report.get("a.csv_vs_b.csv").unwrap().comparison().is_some());
    let kinds: BTreeMap<&str, Vec<&str>> = report
        .failures()
        .map(|(k, f)| (k, f.errors.iter().map(|e| e.kind()).collect()))
        .collect();
    assert_eq!(kinds["a.csv_vs_notes.txt"], vec!["UnsupportedSourceFormat"]);
    assert_eq!(kinds["b.csv_vs_gone.csv"], vec!["SourceNotFound"]);
    assert_eq!(
        kinds["notes.txt_vs_gone.csv"],
        vec!["UnsupportedSourceFormat", "SourceNotFound"]
    );
    assert_eq!(kinds.len(), 5);
    Ok(())
}

#[test]
fn json_output_is_stable_across_runs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let pattern = dir.path().join("*.csv").display().to_string();
    write(dir.path(), "one.csv", "k,v\n1,a\n2,b\n3,c\n")?;
    write(dir.path(), "two.csv", "k,v\n1,a\n2,x\n3,c\n")?;
    write(dir.path(), "three.csv", "k,v\n1,a\n")?;

    let config = RunConfig {
        sources: vec![pattern],
        ..Default::default()
    };
    let sources = config.resolve_sources()?;
    let render_once = || -> Result<String> {
        let report = run(&sources, &FileLoader, &RunOptions { jobs: Some(3) });
        Ok(render(&report, Format::Json, &RenderOptions::default())?)
    };
    let first = render_once()?;
    assert_eq!(first, render_once()?);

    let value: serde_json::Value = serde_json::from_str(&first)?;
    let pair = &value["one.csv_vs_three.csv"];
    assert_eq!(pair["status"], "compared");
    assert_eq!(pair["columns"]["v_vs_v"]["rows_compared"], 1);
    assert_eq!(pair["notices"][0]["kind"], "RowCountMismatch");
    Ok(())
}
