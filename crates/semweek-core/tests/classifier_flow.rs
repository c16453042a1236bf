use std::ffi::OsString;
use std::fs;
use std::sync::Arc;
use std::thread;

use semweek_core::{
    AcademicWeekClassifier, CalendarDate, GridWeekStart, LabelCatalog, Locale, SharedRegistry,
    TableError, WeekClassificationTable, WeekTableRegistry,
};
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> CalendarDate {
    CalendarDate::from_ymd(y, m, d).expect("valid date")
}

#[test]
fn tables_file_drives_classification() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("weeks.toml");
    fs::write(
        &path,
        "# 2030: blocus, break, two teaching weeks, Easter\n\"2030\" = [-3, -2, 1, 2, -1]\n",
    )
    .expect("write tables");

    let registry = WeekTableRegistry::load(&path).expect("load tables");
    let classifier = AcademicWeekClassifier::with_default_labels(Arc::new(registry));

    // 2030-01-01 is a Tuesday in ISO week 2030-W01.
    let labels: Vec<String> = (0..6)
        .map(|week| {
            let day = date(2030, 1, 1).add_days(7 * week).expect("date");
            classifier.classify(day, Locale::En).label
        })
        .collect();
    assert_eq!(labels, vec!["Blocus", "Break", "S1", "S2", "Easter", "-"]);

    let fr = classifier.classify(date(2030, 1, 8), Locale::Fr);
    assert_eq!(fr.label, "Congé");
}

#[test]
fn malformed_tables_file_is_rejected_with_year() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("weeks.json");
    fs::write(&path, r#"{ "2030": [1, 2, -7] }"#).expect("write tables");

    let err = WeekTableRegistry::load(&path).expect_err("invalid code");
    assert!(matches!(
        err,
        TableError::InvalidCode {
            year: 2030,
            week: 3,
            code: -7
        }
    ));

    let missing = temp.path().join("missing.json");
    assert!(matches!(
        WeekTableRegistry::load(&missing),
        Err(TableError::Io { .. })
    ));
}

#[test]
fn custom_labels_are_injected() {
    let registry = WeekTableRegistry::builtin().expect("builtin tables");
    let mut labels = LabelCatalog::default();
    labels
        .set(Locale::Fr, "blocus", "Session".to_string())
        .expect("override");
    let classifier = AcademicWeekClassifier::new(Arc::new(registry), labels);

    // Sunday 2022-05-15 heads the grid row of ISO week 2022-W20.
    let cell = classifier.classify_grid_cell(date(2022, 5, 15), GridWeekStart::Sunday, Locale::Fr);
    assert_eq!(cell.week_number, 20);
    assert_eq!(cell.code, -3);
    assert_eq!(cell.label, "Session");
    assert_eq!(
        classifier
            .classify_grid_cell(date(2022, 5, 15), GridWeekStart::Sunday, Locale::En)
            .label,
        "Blocus"
    );
    assert_eq!(classifier.classify(date(2022, 5, 15), Locale::Fr).label, "S13");
}

#[test]
fn readers_keep_their_snapshot_during_reload() {
    let shared = SharedRegistry::new(WeekTableRegistry::builtin().expect("builtin tables"));
    let day = date(2022, 2, 1);

    let before = AcademicWeekClassifier::with_default_labels(shared.snapshot());

    thread::scope(|scope| {
        scope.spawn(|| {
            let table = WeekClassificationTable::new(2022, &[0, 0, 0, 0, -2]).expect("table");
            shared.replace_year(2022, table);
        });
        for _ in 0..100 {
            let label = before.classify(day, Locale::En).label;
            assert_eq!(label, "S1");
        }
    });

    let after = AcademicWeekClassifier::with_default_labels(shared.snapshot());
    assert_eq!(after.classify(day, Locale::En).label, "Break");
    assert_eq!(before.classify(day, Locale::En).label, "S1");
}

#[test]
fn cli_runs_against_rc_and_tables_files() {
    let temp = tempdir().expect("tempdir");
    let tables = temp.path().join("tables.json");
    fs::write(&tables, r#"{ "2030": [1, 2, 3] }"#).expect("write tables");
    let rc = temp.path().join("weekrc");
    fs::write(
        &rc,
        "locale = en\nweeks.file = tables.json\noutput.format = json\ncolor = off\n",
    )
    .expect("write weekrc");

    let args = |rest: &[&str]| -> Vec<OsString> {
        let mut out = vec![
            OsString::from("semweek"),
            OsString::from("-q"),
            OsString::from("--weekrc"),
            rc.clone().into_os_string(),
        ];
        out.extend(rest.iter().map(OsString::from));
        out
    };

    let output = |rest: &[&str]| -> anyhow::Result<String> {
        let mut buf = Vec::new();
        semweek_core::run_with_output(args(rest), &mut buf)?;
        Ok(String::from_utf8(buf).expect("utf8 output"))
    };
    let json_rows = |text: &str| -> Vec<serde_json::Value> {
        serde_json::from_str(text.trim()).expect("json rows")
    };

    let years = output(&["years"]).expect("years");
    let summary: Vec<&str> = years
        .lines()
        .nth(2)
        .expect("year row")
        .split_whitespace()
        .collect();
    assert_eq!(summary, vec!["2030", "3", "3", "0", "0"]);

    let week = json_rows(&output(&["2030-01-08", "rc.grid.first_day=monday"]).expect("week"));
    assert_eq!(
        week,
        vec![serde_json::json!({
            "date": "2030-01-08",
            "iso_year": 2030,
            "week_number": 2,
            "code": 2,
            "label": "S2"
        })]
    );

    // Sunday 2030-01-13 heads the grid row of 2030-W03.
    let cell = json_rows(&output(&["cell", "2030-01-13"]).expect("cell"));
    assert_eq!(cell[0]["week_number"], 3);
    assert_eq!(cell[0]["label"], "S3");

    let weeks = json_rows(&output(&["weeks", "2030"]).expect("weeks"));
    assert_eq!(weeks.len(), 52);
    assert_eq!(weeks[0]["date"], "2029-12-31");
    let labels: Vec<&str> = weeks[..4]
        .iter()
        .map(|row| row["label"].as_str().expect("label"))
        .collect();
    assert_eq!(labels, vec!["S1", "S2", "S3", "-"]);

    let export: serde_json::Value =
        serde_json::from_str(&output(&["export"]).expect("export")).expect("export json");
    assert_eq!(export, serde_json::json!({ "2030": [1, 2, 3] }));

    let bad = temp.path().join("bad.json");
    fs::write(&bad, r#"{ "x": [1] }"#).expect("write bad tables");
    let bad_arg = bad.to_string_lossy().to_string();
    let mut buf = Vec::new();
    assert!(semweek_core::run_with_output(args(&["check", bad_arg.as_str()]), &mut buf).is_err());
    let report = String::from_utf8(buf).expect("utf8 output");
    assert!(report.contains("year key \"x\" is not an integer"), "{report}");

    assert!(output(&["weeks", "2030", "2031"]).is_err());
    semweek_core::run(args(&["version"])).expect("version to stdout");
}
