use std::fs;
use std::path::Path;

use rust_xlsxwriter::{Workbook, Worksheet};
use serde_json::{Value, json};
use sheet_exporter::generator::GeneratorRegistry;
use sheet_exporter::{Configuration, Engine, ExportError};
use tempfile::tempdir;

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Bool(bool),
}

use Cell::{Bool, Number, Text};

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<Cell>]) {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let (row_idx, col_idx) = (row_idx as u32, col_idx as u16);
            match cell {
                Text(value) => worksheet.write_string(row_idx, col_idx, *value),
                Number(value) => worksheet.write_number(row_idx, col_idx, *value),
                Bool(value) => worksheet.write_boolean(row_idx, col_idx, *value),
            }
            .expect("cell written");
        }
    }
}

fn write_workbook(path: &Path, sheets: &[(&str, Vec<Vec<Cell>>)]) {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).expect("sheet named");
        write_rows(worksheet, rows);
    }
    fs::create_dir_all(path.parent().expect("parent directory")).expect("directory created");
    workbook.save(path).expect("workbook saved");
}

fn people() -> Vec<Vec<Cell<'static>>> {
    vec![
        vec![Text("int"), Text("string"), Text("string")],
        vec![Text("id"), Text("name desc"), Text("internal note")],
        vec![Text("id"), Text("name"), Text("*secret")],
        vec![Number(1.0), Text("Alice"), Text("a")],
        vec![Number(2.0), Text("Bob"), Text("b")],
        vec![Number(1.0), Text("Carol"), Text("c")],
    ]
}

fn items() -> Vec<Vec<Cell<'static>>> {
    vec![
        vec![Text("string"), Text("array<int>"), Text("dict<string, float>"), Text("bool")],
        vec![Text("key"), Text("drops"), Text("stats"), Text("stackable")],
        vec![Text("key"), Text("drops"), Text("stats"), Text("stackable")],
        vec![Text("potion"), Text("1,2,3"), Text(r#"{"heal": 25}"#), Bool(true)],
        vec![Text("sword"), Number(7.0), Text("atk:4.5"), Bool(false)],
    ]
}

fn broken() -> Vec<Vec<Cell<'static>>> {
    vec![
        vec![Text("int"), Text("int")],
        vec![Text("id"), Text("level")],
        vec![Text("id"), Text("level")],
        vec![Number(1.0), Text("high")],
    ]
}

fn config_for(root: &Path) -> Configuration {
    Configuration {
        input: root.join("data"),
        output: root.join("dist"),
        ..Configuration::default()
    }
}

fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path).expect("artifact read");
    serde_json::from_str(&text).expect("artifact is JSON")
}

#[test]
fn exports_every_sheet_and_isolates_failures() {
    let temp_dir = tempdir().expect("temporary directory");
    let config = config_for(temp_dir.path());
    write_workbook(
        &config.input.join("units.xlsx"),
        &[
            ("People-people", people()),
            ("~Draft", broken()),
            ("Broken", broken()),
        ],
    );
    write_workbook(&config.input.join("shop/goods.xlsx"), &[("Items", items())]);

    let engine = Engine::from_registry(config.clone(), &GeneratorRegistry::builtin())
        .expect("engine built");
    let report = engine.export_all().expect("batch finished");

    assert_eq!(report.written.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].sheet.as_deref(), Some("Broken"));
    assert!(report.failures[0].reason.contains("level"));

    let people = read_json(&config.output.join("units/people.json"));
    assert_eq!(
        people,
        json!({
            "1": {"id": 1, "name": "Carol"},
            "2": {"id": 2, "name": "Bob"}
        })
    );

    let goods = read_json(&config.output.join("shop/goods/Items.json"));
    assert_eq!(
        goods,
        json!({
            "potion": {"key": "potion", "drops": [1, 2, 3], "stats": {"heal": 25.0}, "stackable": true},
            "sword": {"key": "sword", "drops": [7], "stats": {"atk": 4.5}, "stackable": false}
        })
    );

    assert!(!config.output.join("units/Broken.json").exists());
    assert!(!config.output.join("units/~Draft.json").exists());
}

#[test]
fn unreadable_workbooks_and_lock_files_do_not_stop_the_batch() {
    let temp_dir = tempdir().expect("temporary directory");
    let config = config_for(temp_dir.path());
    write_workbook(&config.input.join("units.xlsx"), &[("People", people())]);
    fs::write(config.input.join("~$units.xlsx"), b"lock").expect("lock file written");
    fs::write(config.input.join("corrupt.xlsx"), b"not a zip").expect("corrupt file written");

    let engine = Engine::from_registry(config.clone(), &GeneratorRegistry::builtin())
        .expect("engine built");
    let report = engine.export_all().expect("batch finished");

    assert_eq!(report.written, vec![config.output.join("units/People.json")]);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].workbook.ends_with("corrupt.xlsx"));
    assert_eq!(report.failures[0].sheet, None);
}

#[test]
fn gdscript_generator_writes_constant_dictionary() {
    let temp_dir = tempdir().expect("temporary directory");
    let config = Configuration {
        generator: "gdscript".to_string(),
        ..config_for(temp_dir.path())
    };
    let workbook = config.input.join("units.xlsx");
    write_workbook(&workbook, &[("People", people())]);

    let engine = Engine::from_registry(config.clone(), &GeneratorRegistry::builtin())
        .expect("engine built");
    let report = engine.export_file(&workbook).expect("workbook exported");
    assert!(report.is_clean());

    let script = fs::read_to_string(config.output.join("units/People.gd")).expect("script read");
    assert!(script.contains("const DATA := {"));
    assert!(script.contains("\t1: {\"id\": 1, \"name\": \"Carol\"},"));
    assert!(!script.contains("secret"));
}

#[test]
fn workbook_outside_input_is_rejected() {
    let temp_dir = tempdir().expect("temporary directory");
    let config = config_for(temp_dir.path());
    fs::create_dir_all(&config.input).expect("input created");
    let stray = temp_dir.path().join("elsewhere/units.xlsx");
    write_workbook(&stray, &[("People", people())]);

    let engine = Engine::from_registry(config.clone(), &GeneratorRegistry::builtin())
        .expect("engine built");
    let error = engine.export_file(&stray).expect_err("file outside input");

    assert!(matches!(error, ExportError::IllegalFile { .. }));
    assert!(error.is_fatal());
    assert!(!config.output.exists());
}
