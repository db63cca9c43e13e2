//! End-to-end pipeline: raw CSV export → load → outlier removal → partition
//! files, driven the way the binary drives it (config + path provider).

use std::collections::BTreeMap;
use std::fs;

use trialprep::config::PreprocessConfig;
use trialprep::data::filter::{filter_table, remove_outliers, DEFAULT_Z_THRESHOLD};
use trialprep::data::loader::{load_registry, load_table, ColumnType, Exclusion, LoadSpec, Rename};
use trialprep::data::split::{split_and_save, SplitColumns};
use trialprep::paths::{purpose, FixedPaths, PathProvider};

fn raw_export() -> String {
    let mut csv = String::from("PARTICIPANT,CONCLUDED,GROUP,SESSION,CONDITION,NetRT,HEVC\n");
    // Two groups x two sessions x two participants, clean trials.
    for group in ["Placebo", "Probiotics"] {
        for session in [1, 2] {
            for subj in ["PT0001", "PT0002"] {
                for trial in 0..5 {
                    csv.push_str(&format!(
                        "{subj},DONE,{group},{session},SHAM,0.{}5,1\n",
                        4 + trial
                    ));
                }
            }
        }
    }
    // A dropout, a blacklisted participant, an anticipatory trial, an outlier.
    csv.push_str("PT0009,DROPOUT,Placebo,1,SHAM,0.5,0\n");
    csv.push_str("PT0015,DONE,Placebo,1,SHAM,0.5,0\n");
    csv.push_str("PT0001,DONE,Placebo,1,SHAM,0.05,0\n");
    csv.push_str("PT0001,DONE,Placebo,1,SHAM,40.0,0\n");
    csv
}

fn load_spec() -> LoadSpec {
    LoadSpec {
        dtypes: BTreeMap::from([
            ("PARTICIPANT".to_string(), ColumnType::Str),
            ("GROUP".to_string(), ColumnType::Category),
            ("CONDITION".to_string(), ColumnType::Category),
            ("CONCLUDED".to_string(), ColumnType::Str),
            ("NetRT".to_string(), ColumnType::Float),
            ("HEVC".to_string(), ColumnType::Float),
        ]),
        exclude: vec![
            Exclusion {
                column: "CONCLUDED".into(),
                values: vec!["DROPOUT".into()],
            },
            Exclusion {
                column: "PARTICIPANT".into(),
                values: vec!["PT0015".into()],
            },
        ],
        keep_columns: None,
        drop_columns: vec!["CONCLUDED".into()],
        replace: Vec::new(),
        rename: vec![
            Rename {
                from: "PARTICIPANT".into(),
                to: "subj_idx".into(),
            },
            Rename {
                from: "NetRT".into(),
                to: "rt".into(),
            },
            Rename {
                from: "HEVC".into(),
                to: "response".into(),
            },
        ],
    }
}

#[test]
fn load_filter_split_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let raw_path = dir.path().join("Raw.csv");
    fs::write(&raw_path, raw_export()).unwrap();

    let table = load_table(&raw_path, &load_spec()).unwrap();
    // 40 clean trials + the anticipatory and outlier rows survive loading;
    // the dropout and blacklisted rows do not.
    assert_eq!(table.len(), 42);
    assert_eq!(
        table.columns(),
        ["subj_idx", "GROUP", "SESSION", "CONDITION", "rt", "response"]
    );

    let corrected = filter_table(&table, DEFAULT_Z_THRESHOLD).unwrap();
    // The 40.0 s outlier fails the z pass, the 0.05 s trial fails the floor.
    assert_eq!(corrected.len(), 40);
    assert!(corrected
        .numeric_column("rt")
        .unwrap()
        .iter()
        .all(|&rt| rt > 0.1 && rt < 1.0));

    let out_dir = dir.path().join("datasets");
    let files = split_and_save(&corrected, &SplitColumns::default(), &out_dir).unwrap();
    // 2 groups x 2 sessions x 1 condition x 2 participants.
    assert_eq!(files.len(), 8);

    let total: usize = files
        .iter()
        .map(|f| fs::read_to_string(f).unwrap().lines().count() - 1)
        .sum();
    assert_eq!(total, corrected.len());

    let sample = out_dir
        .join("placebo")
        .join("session 1")
        .join("sham")
        .join("pt_0001.txt");
    let content = fs::read_to_string(&sample).unwrap();
    assert!(content.starts_with("#subj_idx\tGROUP\tSESSION\tCONDITION\trt\tresponse\n"));
    assert!(content.lines().skip(1).all(|l| l.starts_with("PT0001\t")));
}

#[test]
fn registry_survives_one_bad_dataset() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Raw.csv"), raw_export()).unwrap();
    // Listed but absent on disk: loading logs the failure and moves on.
    let cfg = PreprocessConfig {
        data_dir: dir.path().to_path_buf(),
        datasets: BTreeMap::from([
            ("Raw Data Set".to_string(), "Raw.csv".to_string()),
            ("Average Data Set".to_string(), "Avg.csv".to_string()),
        ]),
        load: load_spec(),
        z_threshold: DEFAULT_Z_THRESHOLD,
        corrected_dir: dir.path().join("corrected"),
        report_path: None,
    };

    let registry = load_registry(&cfg);
    assert_eq!(registry.len(), 1);
    assert!(registry.contains_key("Raw Data Set"));

    let corrected = remove_outliers(&registry, cfg.z_threshold).unwrap();
    assert_eq!(corrected["Raw Data Set"].len(), 40);
    // Pure transformation: the raw registry still holds the outlier rows.
    assert_eq!(registry["Raw Data Set"].len(), 42);
}

#[test]
fn fixed_path_provider_drives_the_combiner() {
    let data_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    fs::write(data_dir.path().join("a.dat"), b"aa").unwrap();
    fs::write(data_dir.path().join("b.dat"), b"bb").unwrap();
    let output = out_dir.path().join("combined.dat");

    let paths = FixedPaths::default()
        .with_directory(purpose::COMBINE_INPUTS, data_dir.path())
        .with_save_path(purpose::COMBINE_OUTPUT, &output);

    let folders = paths.pick_directories(purpose::COMBINE_INPUTS).unwrap();
    let target = paths.pick_save_path(purpose::COMBINE_OUTPUT).unwrap();
    let written = trialprep::sim::combine::combine_dat_files(&folders, &target).unwrap();

    assert_eq!(written, 4);
    assert_eq!(fs::read(&output).unwrap(), b"aabb");
}
