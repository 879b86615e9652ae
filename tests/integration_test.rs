use std::{
    fs, io,
    path::{Path, PathBuf},
};

use cpra_freq::{
    GenerateConfig, InputError, OutputError, OutputFormat, TemplateError,
    generate_frequency_files,
};
use tempfile::tempdir;

fn write_typings(dir: &tempfile::TempDir, name: &str, contents: &str) -> io::Result<PathBuf> {
    let path = dir.path().join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

fn base_config(input: PathBuf, output_dir: &Path) -> GenerateConfig {
    GenerateConfig {
        output_dir: output_dir.to_path_buf(),
        ..GenerateConfig::new(input, "bwh")
    }
}

/// Frequency rows keyed by the set of antigens in their label.
fn parse_freq(contents: &str) -> Vec<(Vec<String>, u64, f64, u64)> {
    contents
        .lines()
        .map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 4, "unexpected row {line}");
            let mut antigens: Vec<String> = fields[0]
                .split(';')
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect();
            antigens.sort();
            (
                antigens,
                fields[1].parse().unwrap(),
                fields[2].parse().unwrap(),
                fields[3].parse().unwrap(),
            )
        })
        .collect()
}

#[test]
fn swapped_typings_collapse_into_one_row() {
    let dir = tempdir().unwrap();
    let input = write_typings(&dir, "typings.csv", "A1,A2,B1,B2\n1,2,7,44\n2,1,44,7\n").unwrap();

    let summary = generate_frequency_files(&base_config(input, dir.path())).expect("generate");
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.distinct_sets, 1);
    assert_eq!(summary.frequency_path, dir.path().join("bwh_freq.csv"));
    assert_eq!(summary.metadata_path, dir.path().join("bwh_meta.csv"));

    let freq = fs::read_to_string(&summary.frequency_path).unwrap();
    assert_eq!(freq, "A1;A2;B44;B7,2,1.000000000000000000000000,2\n");

    let rows = parse_freq(&freq);
    assert_eq!(rows[0].0, vec!["A1", "A2", "B44", "B7"]);
    assert_eq!(rows[0].1, 2);
    assert_eq!(rows[0].2, 1.0);
    assert_eq!(rows[0].3, 2);

    let meta = fs::read_to_string(&summary.metadata_path).unwrap();
    assert_eq!(meta, "bwh,Default,1.00\n");
}

#[test]
fn sentinel_alleles_are_dropped_from_labels() {
    let dir = tempdir().unwrap();
    let input = write_typings(&dir, "typings.csv", "A1,A2,B1,B2\n1,A,7,B\n1,,7,\n").unwrap();

    let summary = generate_frequency_files(&base_config(input, dir.path())).unwrap();
    let rows = parse_freq(&fs::read_to_string(&summary.frequency_path).unwrap());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, vec!["A1", "B7"]);
    assert_eq!(rows[0].1, 2);
}

#[test]
fn counts_and_probabilities_are_consistent() {
    let dir = tempdir().unwrap();
    let input = write_typings(
        &dir,
        "typings.csv",
        "id,A1,A2,B1,B2\n\
         1,1,2,7,44\n\
         2,2,1,44,7\n\
         3,3,24,35,51\n\
         4,,,8,\n\
         5,,,,\n\
         6,24,3,51,35\n\
         7,1,1,8,8\n",
    )
    .unwrap();

    let summary = generate_frequency_files(&base_config(input, dir.path())).unwrap();
    assert_eq!(summary.rows, 7);
    assert_eq!(summary.distinct_sets, 5);
    assert_eq!(summary.empty_rows, 1);
    assert_eq!(summary.blank_a_rows, 2);
    assert_eq!(summary.blank_b_rows, 1);

    let rows = parse_freq(&fs::read_to_string(&summary.frequency_path).unwrap());
    assert_eq!(rows.len(), 5);
    assert_eq!(rows.iter().map(|r| r.1).sum::<u64>(), 7);
    assert!(rows.iter().all(|r| r.3 == 7));
    assert!(rows.iter().all(|r| (0.0..=1.0).contains(&r.2)));
    let total: f64 = rows.iter().map(|r| r.2).sum();
    assert!((total - 1.0).abs() < 1e-9);

    let empty = rows.iter().find(|r| r.0.is_empty()).expect("empty antigen set row");
    assert_eq!(empty.1, 1);
}

#[test]
fn repeated_runs_are_byte_identical() {
    let dir = tempdir().unwrap();
    let input = write_typings(
        &dir,
        "typings.csv",
        "A1,A2,B1,B2\n1,2,7,44\n3,24,35,51\n11,2,7,8\n2,1,44,7\n",
    )
    .unwrap();
    let first_dir = dir.path().join("first");
    let second_dir = dir.path().join("second");

    let first = generate_frequency_files(&base_config(input.clone(), &first_dir)).unwrap();
    let second = generate_frequency_files(&base_config(input, &second_dir)).unwrap();

    assert_eq!(
        fs::read(&first.frequency_path).unwrap(),
        fs::read(&second.frequency_path).unwrap()
    );
    assert_eq!(
        fs::read(&first.metadata_path).unwrap(),
        fs::read(&second.metadata_path).unwrap()
    );
}

#[test]
fn precision_controls_probability_digits() {
    let dir = tempdir().unwrap();
    let input = write_typings(&dir, "typings.csv", "A1,A2,B1,B2\n1,2,7,44\n3,24,35,51\n2,1,7,44\n")
        .unwrap();
    let config = GenerateConfig {
        precision: 4,
        ..base_config(input, dir.path())
    };

    let summary = generate_frequency_files(&config).unwrap();
    let freq = fs::read_to_string(&summary.frequency_path).unwrap();
    assert_eq!(freq, "A1;A2;B44;B7,2,0.6667,3\nA24;A3;B35;B51,1,0.3333,3\n");
}

#[test]
fn header_only_input_writes_empty_table() {
    let dir = tempdir().unwrap();
    let input = write_typings(&dir, "typings.csv", "A1,A2,B1,B2\n").unwrap();

    let summary = generate_frequency_files(&base_config(input, dir.path())).unwrap();
    assert_eq!(summary.rows, 0);
    assert_eq!(fs::read_to_string(&summary.frequency_path).unwrap(), "");
    assert_eq!(
        fs::read_to_string(&summary.metadata_path).unwrap(),
        "bwh,Default,1.00\n"
    );
}

#[test]
fn calculator_format_is_loadable_configuration() {
    let dir = tempdir().unwrap();
    let input = write_typings(&dir, "typings.csv", "A1,A2,B1,B2\n1,2,7,44\n3,24,35,51\n").unwrap();
    let config = GenerateConfig {
        format: OutputFormat::Calculator,
        precision: 2,
        ..base_config(input, dir.path())
    };

    let summary = generate_frequency_files(&config).unwrap();

    let freq = fs::read_to_string(&summary.frequency_path).unwrap();
    let lines: Vec<&str> = freq.lines().collect();
    assert_eq!(lines[0], "key,value,comment");
    assert_eq!(lines[1], "hlaDiplotypeFrequencies:bwh:A1;A2;B44;B7,0.50,1 of 2");
    assert_eq!(lines[2], "hlaDiplotypeFrequencies:bwh:A24;A3;B35;B51,0.50,1 of 2");

    let meta = fs::read_to_string(&summary.metadata_path).unwrap();
    assert!(meta.starts_with("key,value,comment\n"));
    assert!(meta.contains("hlaCpraVersions,bwh,\n"));
    assert!(meta.contains("hlaCpraCalculatorType:bwh,diplotype,\n"));
    assert!(meta.contains("hlaEthnicities:bwh,Default,\n"));
    assert!(meta.contains("hlaEthnicFrequencies:bwh,1.00,\n"));
    assert!(meta.contains("hlaAlleles:bwh,A;B,\n"));
}

#[test]
fn custom_templates_override_builtin_set() {
    let dir = tempdir().unwrap();
    let templates = dir.path().join("templates");
    fs::create_dir(&templates).unwrap();
    fs::write(
        templates.join("template_freq.csv"),
        "antigens,n\n{% for f in frequencies %}{{ f.label }},{{ f.count }}\n{% endfor %}",
    )
    .unwrap();
    fs::write(
        templates.join("template_meta.csv"),
        "{{ freq_name }}: {{ denominator }} typings\n",
    )
    .unwrap();
    let input = write_typings(&dir, "typings.csv", "A1,A2,B1,B2\n1,2,7,44\n").unwrap();
    let config = GenerateConfig {
        template_dir: Some(templates),
        ..base_config(input, dir.path())
    };

    let summary = generate_frequency_files(&config).unwrap();
    assert_eq!(
        fs::read_to_string(&summary.frequency_path).unwrap(),
        "antigens,n\nA1;A2;B44;B7,1\n"
    );
    assert_eq!(
        fs::read_to_string(&summary.metadata_path).unwrap(),
        "bwh: 1 typings\n"
    );
}

#[test]
fn broken_template_fails_before_writing() {
    let dir = tempdir().unwrap();
    let templates = dir.path().join("templates");
    fs::create_dir(&templates).unwrap();
    fs::write(templates.join("template_freq.csv"), "{{ nope }}").unwrap();
    fs::write(templates.join("template_meta.csv"), "{{ freq_name }}").unwrap();
    let input = write_typings(&dir, "typings.csv", "A1,A2,B1,B2\n1,2,7,44\n").unwrap();
    let config = GenerateConfig {
        template_dir: Some(templates),
        ..base_config(input, dir.path())
    };

    let err = generate_frequency_files(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TemplateError>(),
        Some(TemplateError::UnknownVariable { .. })
    ));
    assert!(!dir.path().join("bwh_freq.csv").exists());
}

#[test]
fn report_is_written_on_request() {
    let dir = tempdir().unwrap();
    let input = write_typings(&dir, "typings.csv", "A1,A2,B1,B2\n1,2,7,44\n,,,\n").unwrap();
    let config = GenerateConfig {
        write_report: true,
        ..base_config(input, dir.path())
    };

    let summary = generate_frequency_files(&config).unwrap();
    let report_path = summary.report_path.expect("report path");
    assert_eq!(report_path, dir.path().join("bwh_report.json"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(json["statistics"]["rows"], 2);
    assert_eq!(json["statistics"]["distinct_sets"], 2);
    assert_eq!(json["statistics"]["empty_rows"], 1);
}

#[test]
fn missing_input_is_an_input_error() {
    let dir = tempdir().unwrap();
    let config = base_config(dir.path().join("absent.csv"), dir.path());

    let err = generate_frequency_files(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<InputError>(),
        Some(InputError::Open { .. })
    ));
}

#[test]
fn missing_column_is_an_input_error() {
    let dir = tempdir().unwrap();
    let input = write_typings(&dir, "typings.csv", "A1,A2,B1\n1,2,7\n").unwrap();

    let err = generate_frequency_files(&base_config(input, dir.path())).unwrap_err();
    match err.downcast_ref::<InputError>() {
        Some(InputError::MissingColumns { missing }) => assert_eq!(missing, &vec!["B2"]),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!dir.path().join("bwh_freq.csv").exists());
}

#[test]
fn malformed_row_is_an_input_error() {
    let dir = tempdir().unwrap();
    let input = write_typings(&dir, "typings.csv", "A1,A2,B1,B2\n1,2,7,44\n1,2,7\n").unwrap();

    let err = generate_frequency_files(&base_config(input, dir.path())).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<InputError>(),
        Some(InputError::Malformed { line: 3, .. })
    ));
}

#[test]
fn hash_prefixed_ids_are_counted() {
    let dir = tempdir().unwrap();
    let input = write_typings(
        &dir,
        "typings.csv",
        "id,A1,A2,B1,B2\n#17,1,2,7,44\n18,3,24,35,51\n",
    )
    .unwrap();

    let summary = generate_frequency_files(&base_config(input, dir.path())).unwrap();
    assert_eq!(summary.rows, 2);
    let rows = parse_freq(&fs::read_to_string(&summary.frequency_path).unwrap());
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.1 == 1 && r.2 == 0.5 && r.3 == 2));
}

#[test]
fn hash_prefixed_header_is_resolved() {
    let dir = tempdir().unwrap();
    let input = write_typings(&dir, "typings.csv", "#id,A1,A2,B1,B2\n1,1,2,7,44\n").unwrap();

    let summary = generate_frequency_files(&base_config(input, dir.path())).unwrap();
    assert_eq!(summary.rows, 1);
    assert!(
        fs::read_to_string(&summary.frequency_path)
            .unwrap()
            .starts_with("A1;A2;B44;B7,1,1.0")
    );
}

#[test]
fn trailing_comma_rows_are_accepted() {
    let dir = tempdir().unwrap();
    let input = write_typings(&dir, "typings.csv", "A1,A2,B1,B2\n1,2,7,44,\n2,1,44,7,\n").unwrap();

    let summary = generate_frequency_files(&base_config(input, dir.path())).unwrap();
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.distinct_sets, 1);
}

#[test]
fn quoted_allele_with_comma_is_rejected() {
    let dir = tempdir().unwrap();
    let input = write_typings(&dir, "typings.csv", "A1,A2,B1,B2\n\"1,2\",2,7,44\n").unwrap();

    let err = generate_frequency_files(&base_config(input, dir.path())).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<InputError>(),
        Some(InputError::InvalidAllele { line: 2, .. })
    ));
    assert!(!dir.path().join("bwh_freq.csv").exists());
}

#[test]
fn unwritable_destination_is_an_output_error() {
    let dir = tempdir().unwrap();
    let input = write_typings(&dir, "typings.csv", "A1,A2,B1,B2\n1,2,7,44\n").unwrap();
    // a regular file where the output directory should be
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();

    let err = generate_frequency_files(&base_config(input, &blocker.join("out"))).unwrap_err();
    assert!(err.downcast_ref::<OutputError>().is_some());
}

#[test]
fn freq_name_with_separator_is_rejected() {
    let dir = tempdir().unwrap();
    let input = write_typings(&dir, "typings.csv", "A1,A2,B1,B2\n1,2,7,44\n").unwrap();
    let config = GenerateConfig {
        freq_name: "../bwh".to_string(),
        ..base_config(input, dir.path())
    };

    assert!(generate_frequency_files(&config).is_err());
}
