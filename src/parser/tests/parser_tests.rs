//! End-to-end tests over complete in-memory ESO content.

use super::sample_eso;
use crate::config::ParseConfig;
use crate::error::EsoError;
use crate::file::EsoFile;
use crate::models::{Frequency, Variable};
use crate::parser::parse_reader;
use crate::tree::VariablePattern;
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Cursor;

fn parse(content: &str, config: &ParseConfig) -> crate::error::Result<crate::parser::ParsedEso> {
    parse_reader(Cursor::new(content.as_bytes().to_vec()), config)
}

fn dt(y: i32, mo: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

#[test]
fn test_parse_sample_end_to_end() {
    let parsed = parse(&sample_eso(), &ParseConfig::default()).unwrap();

    assert_eq!(
        parsed.header.frequencies(),
        vec![Frequency::Hourly, Frequency::Daily]
    );
    assert_eq!(parsed.header.ids(Frequency::Hourly), vec![7, 9]);
    assert_eq!(
        parsed.header.get(Frequency::Hourly, 9),
        Some(&Variable::new(
            Frequency::Hourly,
            "Meter",
            "Electricity:Facility",
            "J"
        ))
    );

    assert_eq!(parsed.environments.len(), 1);
    let env = &parsed.environments[0];
    assert_eq!(env.name, "TEST ENVIRONMENT");

    let hourly = &env.tables[&Frequency::Hourly];
    assert_eq!(hourly.height(), 2);
    assert_eq!(hourly.values(7).unwrap(), vec![20.0, 21.0]);
    assert_eq!(hourly.values(9).unwrap(), vec![100.0, 110.0]);
    assert!(hourly.has_day_column());
    // Tuesday January 1st on a non-leap year resolves to 2019.
    assert_eq!(
        hourly.timestamps(),
        &[dt(2019, 1, 1, 1), dt(2019, 1, 1, 2)]
    );

    let daily = &env.tables[&Frequency::Daily];
    assert_eq!(daily.values(8).unwrap(), vec![20.5]);
    assert_eq!(daily.timestamps(), &[dt(2019, 1, 1, 0)]);
}

#[test]
fn test_peak_tables_carry_occurrence_timestamps() {
    let parsed = parse(&sample_eso(), &ParseConfig::default()).unwrap();
    let env = &parsed.environments[0];

    let min = &env.local_min[&Frequency::Daily];
    let min_values = min.df.column("8").unwrap().as_materialized_series().f64().unwrap();
    assert_eq!(min_values.get(0), Some(15.0));

    let max = &env.local_max[&Frequency::Daily];
    let max_values = max.df.column("8").unwrap().as_materialized_series().f64().unwrap();
    assert_eq!(max_values.get(0), Some(25.0));
    // Hour-ending 14 with the end-of-hour marker lands at 14:00.
    let occ = max
        .df
        .column("8 timestamp")
        .unwrap()
        .as_materialized_series()
        .datetime()
        .unwrap()
        .as_datetime_iter()
        .next()
        .unwrap();
    assert_eq!(occ, Some(dt(2019, 1, 1, 14)));
}

#[test]
fn test_peaks_disabled_builds_no_peak_tables() {
    let config = ParseConfig::new().with_peaks(false);
    let parsed = parse(&sample_eso(), &config).unwrap();
    let env = &parsed.environments[0];
    assert!(env.local_min.is_empty());
    assert!(env.local_max.is_empty());
    assert_eq!(env.tables[&Frequency::Daily].values(8).unwrap(), vec![20.5]);
}

#[test]
fn test_unreported_step_is_nan() {
    let content = sample_eso().replace("\n9,110.0", "");
    let parsed = parse(&content, &ParseConfig::default()).unwrap();
    let values = parsed.environments[0].tables[&Frequency::Hourly]
        .values(9)
        .unwrap();
    assert_eq!(values[0], 100.0);
    assert!(values[1].is_nan());
}

#[test]
fn test_duplicate_definition_purged_keeping_first_id() {
    let content = sample_eso().replace(
        "9,1,Electricity:Facility [J] !Hourly",
        "9,1,Electricity:Facility [J] !Hourly\n\
         10,1,Environment,Site Outdoor Air Drybulb Temperature [C] !Hourly",
    );
    let parsed = parse(&content, &ParseConfig::default()).unwrap();

    assert_eq!(parsed.header.ids(Frequency::Hourly), vec![7, 9]);
    let pattern = VariablePattern::exact(&Variable::new(
        Frequency::Hourly,
        "Environment",
        "Site Outdoor Air Drybulb Temperature",
        "C",
    ));
    assert_eq!(parsed.tree.find_ids(&pattern, false), vec![7]);
    assert_eq!(
        parsed.environments[0].tables[&Frequency::Hourly].ids(),
        vec![7, 9]
    );
}

#[test]
fn test_blank_line_aborts_whole_file() {
    let content = sample_eso().replace("\n7,21.0\n", "\n\n7,21.0\n");
    let err = parse(&content, &ParseConfig::default()).unwrap_err();
    assert!(matches!(err, EsoError::BlankLine { .. }));
}

#[test]
fn test_missing_dictionary_sentinel() {
    // Truncate at the sentinel so the header reader runs into EOF.
    let sample = sample_eso();
    let content = &sample[..sample.find("End of Data Dictionary").unwrap()];
    let err = parse(content, &ParseConfig::default()).unwrap_err();
    assert!(matches!(err, EsoError::MissingSentinel { .. }));
}

#[test]
fn test_removed_sentinel_fails_on_first_body_line() {
    // Without the sentinel the first body line reaches the dictionary
    // parser and fails its syntax check.
    let content = sample_eso().replace("End of Data Dictionary\n", "");
    let err = parse(&content, &ParseConfig::default()).unwrap_err();
    assert!(matches!(err, EsoError::InvalidHeaderLine { .. }));
}

#[test]
fn test_pre_annual_version_has_shorter_preamble() {
    let content = sample_eso()
        .replace("Version 9.1.0-08d2e308bb", "Version 8.1.0-abc1234567")
        .replace("6,1,Calendar Year of Simulation[]\n", "");
    let parsed = parse(&content, &ParseConfig::default()).unwrap();
    assert_eq!(
        parsed.environments[0].tables[&Frequency::Hourly]
            .values(7)
            .unwrap(),
        vec![20.0, 21.0]
    );
}

#[test]
fn test_invalid_version_line() {
    let err = parse("not an eso file\n", &ParseConfig::default()).unwrap_err();
    assert!(matches!(err, EsoError::InvalidVersion { .. }));
}

#[test]
fn test_explicit_year_validated_against_start_day() {
    // 2018-01-01 was a Monday; the file starts on a Tuesday.
    let config = ParseConfig::new().with_year(2018);
    let err = parse(&sample_eso(), &config).unwrap_err();
    assert!(matches!(err, EsoError::StartDayMismatch { .. }));

    let config = ParseConfig::new().with_year(2019);
    let parsed = parse(&sample_eso(), &config).unwrap();
    assert_eq!(
        parsed.environments[0].tables[&Frequency::Hourly].timestamps()[0],
        dt(2019, 1, 1, 1)
    );
}

#[test]
fn test_excluded_frequency_absent_from_results() {
    let config = ParseConfig::new().with_excluded([Frequency::Daily]);
    let parsed = parse(&sample_eso(), &config).unwrap();
    assert_eq!(parsed.header.frequencies(), vec![Frequency::Hourly]);
    let env = &parsed.environments[0];
    assert!(!env.tables.contains_key(&Frequency::Daily));
    assert!(env.local_min.is_empty());
}

mod file_ops {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_file() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.eso");
        fs::write(&path, sample_eso()).unwrap();
        (dir, path)
    }

    fn drybulb() -> Variable {
        Variable::new(
            Frequency::Hourly,
            "Environment",
            "Site Outdoor Air Drybulb Temperature",
            "C",
        )
    }

    #[test]
    fn test_from_path_attaches_metadata() {
        let (_dir, path) = sample_file();
        let file = EsoFile::from_path(&path).unwrap();
        assert_eq!(file.file_name(), "sample");
        assert_eq!(file.frequencies(), vec![Frequency::Hourly, Frequency::Daily]);
        assert_eq!(file.values(Frequency::Hourly, 7).unwrap(), vec![20.0, 21.0]);
        assert_eq!(
            file.find_ids(&VariablePattern::exact(&drybulb()), false),
            vec![7]
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = EsoFile::from_path("/nonexistent/path.eso").unwrap_err();
        assert!(matches!(err, EsoError::FileNotFound { .. }));
    }

    #[test]
    fn test_try_from_path_honors_suppress_mode() {
        let suppressed = ParseConfig::new().with_suppressed_errors(true);
        assert!(EsoFile::try_from_path("/nonexistent/path.eso", &suppressed)
            .unwrap()
            .is_none());
        assert!(EsoFile::try_from_path("/nonexistent/path.eso", &ParseConfig::default()).is_err());

        let (_dir, path) = sample_file();
        assert!(EsoFile::try_from_path(&path, &suppressed).unwrap().is_some());
    }

    #[test]
    fn test_rename_updates_header_tree_and_tables() {
        let (_dir, path) = sample_file();
        let mut file = EsoFile::from_path(&path).unwrap();

        let renamed = file
            .rename_variable(Frequency::Hourly, 7, "Outside")
            .unwrap();
        assert_eq!(renamed.key(), "Outside");
        assert_eq!(
            file.find_ids(&VariablePattern::exact(&renamed), false),
            vec![7]
        );
        assert!(file
            .find_ids(&VariablePattern::exact(&drybulb()), false)
            .is_empty());
        assert_eq!(
            file.table(Frequency::Hourly).unwrap().variable(7),
            Some(&renamed)
        );
        // Column data is untouched by a metadata rename.
        assert_eq!(file.values(Frequency::Hourly, 7).unwrap(), vec![20.0, 21.0]);
    }

    #[test]
    fn test_rename_updates_peak_table_metadata() {
        let (_dir, path) = sample_file();
        let mut file = EsoFile::from_path(&path).unwrap();

        let renamed = file
            .rename_variable(Frequency::Daily, 8, "Outside")
            .unwrap();
        // Numeric and peak tables must agree on the variable metadata.
        assert_eq!(
            file.table(Frequency::Daily).unwrap().variable(8),
            Some(&renamed)
        );
        assert_eq!(
            file.local_min(Frequency::Daily).unwrap().variables[&8],
            renamed
        );
        assert_eq!(
            file.local_max(Frequency::Daily).unwrap().variables[&8],
            renamed
        );
    }

    #[test]
    fn test_rename_collision_gets_suffix() {
        let (_dir, path) = sample_file();
        let mut file = EsoFile::from_path(&path).unwrap();

        // Id 9 is (Meter, Electricity:Facility, J); renaming id 7 into
        // an occupied tuple is impossible here, but re-inserting the
        // same tuple demonstrates the suffix rule.
        let (id, stored) = file
            .insert_variable(
                Variable::new(Frequency::Hourly, "Meter", "Electricity:Facility", "J"),
                vec![1.0, 2.0],
            )
            .unwrap();
        assert_eq!(id, 10);
        assert_eq!(stored.key(), "Meter (1)");
        assert_eq!(file.values(Frequency::Hourly, 10).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_insert_requires_existing_table() {
        let (_dir, path) = sample_file();
        let mut file = EsoFile::from_path(&path).unwrap();
        let err = file
            .insert_variable(
                Variable::new(Frequency::Monthly, "Zone", "Temp", "C"),
                vec![1.0],
            )
            .unwrap_err();
        assert!(matches!(err, EsoError::VariableShapeMismatch { .. }));
    }

    #[test]
    fn test_delete_last_variable_drops_frequency() {
        let (_dir, path) = sample_file();
        let mut file = EsoFile::from_path(&path).unwrap();

        file.delete_variables(Frequency::Hourly, &[7]).unwrap();
        assert!(file.values(Frequency::Hourly, 7).is_err());
        assert_eq!(file.table(Frequency::Hourly).unwrap().ids(), vec![9]);

        file.delete_variables(Frequency::Hourly, &[9]).unwrap();
        assert!(file.table(Frequency::Hourly).is_none());
        assert_eq!(file.frequencies(), vec![Frequency::Daily]);

        file.delete_variables(Frequency::Daily, &[8]).unwrap();
        assert!(file.table(Frequency::Daily).is_none());
        assert!(file.local_max(Frequency::Daily).is_none());
        assert!(file.frequencies().is_empty());
    }
}
