use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use regex::Regex;

use crate::config::CompileConfig;
use crate::data::model::fmt_float;

use super::files_with_extension;

// ---------------------------------------------------------------------------
// Compile empirical partitions and simulated outputs into comparable CSVs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialSource {
    Empirical,
    Simulated,
}

impl TrialSource {
    /// One-letter tag written to the `type` column.
    pub fn code(self) -> &'static str {
        match self {
            TrialSource::Empirical => "E",
            TrialSource::Simulated => "S",
        }
    }
}

/// One trial in the compiled comparison tables.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTrial {
    pub subject: String,
    pub session: String,
    pub group: String,
    pub source: TrialSource,
    pub response: f64,
    pub rt: f64,
}

/// Shorten a participant id for cross-dataset matching: literal `PT` prefix
/// off, leading zeros off, then left-padded back to two digits
/// (`PT0015` → `15`, `PT0003` → `03`).
pub fn short_subject_id(id: &str) -> String {
    let digits = id
        .strip_prefix("PT")
        .unwrap_or(id)
        .trim_start_matches('0');
    format!("{digits:0>2}")
}

/// Lowercase the group label and collapse the `probiotics` spelling variant.
pub fn normalize_group(group: &str) -> String {
    let g = group.to_lowercase();
    if g == "probiotics" {
        "probiotic".to_string()
    } else {
        g
    }
}

// ---------------------------------------------------------------------------
// Empirical side – partition .txt files
// ---------------------------------------------------------------------------

/// Parse one partition file (whitespace-delimited, `#`-prefixed header) into
/// compiled trials, keeping subject/session/group/response/time.
pub fn read_empirical_file(path: &Path) -> Result<Vec<CompiledTrial>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut lines = content.lines();
    let header = lines
        .next()
        .with_context(|| format!("{} is empty", path.display()))?;
    let names: Vec<&str> = header.trim_start_matches('#').split_whitespace().collect();

    let mut indices = Vec::with_capacity(5);
    let mut missing = Vec::new();
    for wanted in ["subj_idx", "SESSION", "GROUP", "RESPONSE", "TIME"] {
        match names.iter().position(|n| *n == wanted) {
            Some(i) => indices.push(i),
            None => missing.push(wanted),
        }
    }
    if !missing.is_empty() {
        bail!(
            "{}: column(s) not found: {}",
            path.display(),
            missing.join(", ")
        );
    }
    let (subj, session, group, response, time) =
        (indices[0], indices[1], indices[2], indices[3], indices[4]);

    let mut trials = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        ensure!(
            fields.len() == names.len(),
            "{} line {}: expected {} fields, found {}",
            path.display(),
            line_no + 2,
            names.len(),
            fields.len()
        );
        trials.push(CompiledTrial {
            subject: short_subject_id(fields[subj]),
            session: fields[session].to_string(),
            group: normalize_group(fields[group]),
            source: TrialSource::Empirical,
            response: fields[response].parse().with_context(|| {
                format!("{} line {}: bad response value", path.display(), line_no + 2)
            })?,
            rt: fields[time].parse().with_context(|| {
                format!("{} line {}: bad time value", path.display(), line_no + 2)
            })?,
        });
    }
    Ok(trials)
}

// ---------------------------------------------------------------------------
// Simulated side – headerless .dat files, metadata in the filename
// ---------------------------------------------------------------------------

/// Recover (subject, session, group) from a simulated filename such as
/// `placebo_s1_pt_0015_sim.dat`: subject is the last two digits of the
/// `pt_NNNN` segment, session the digit after `s`, group the first
/// `_`-separated segment, lowercased.
pub fn simulated_meta(filename: &str) -> Result<(String, String, String)> {
    let subject_re = Regex::new(r"pt_(\d+)")?;
    let session_re = Regex::new(r"s(\d)")?;

    let digits = subject_re
        .captures(filename)
        .and_then(|c| c.get(1))
        .with_context(|| format!("no pt_<digits> segment in filename '{filename}'"))?
        .as_str();
    let subject = digits[digits.len().saturating_sub(2)..].to_string();

    let session = session_re
        .captures(filename)
        .and_then(|c| c.get(1))
        .with_context(|| format!("no session digit in filename '{filename}'"))?
        .as_str()
        .to_string();

    let group = filename
        .split('_')
        .next()
        .unwrap_or(filename)
        .to_lowercase();

    Ok((subject, session, group))
}

/// Parse one simulated output file: two whitespace-separated columns
/// (response, time), no header.
pub fn read_simulated_file(path: &Path) -> Result<Vec<CompiledTrial>> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("bad filename {}", path.display()))?;
    let (subject, session, group) = simulated_meta(filename)?;

    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut trials = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        ensure!(
            fields.len() == 2,
            "{} line {}: expected 2 fields, found {}",
            path.display(),
            line_no + 1,
            fields.len()
        );
        trials.push(CompiledTrial {
            subject: subject.clone(),
            session: session.clone(),
            group: group.clone(),
            source: TrialSource::Simulated,
            response: fields[0].parse().with_context(|| {
                format!("{} line {}: bad response value", path.display(), line_no + 1)
            })?,
            rt: fields[1].parse().with_context(|| {
                format!("{} line {}: bad time value", path.display(), line_no + 1)
            })?,
        });
    }
    Ok(trials)
}

/// Stride-sample `rows` down to `target` rows, matching the empirical count
/// (step = len / target, then truncate).
pub fn downsample(rows: Vec<CompiledTrial>, target: usize) -> Vec<CompiledTrial> {
    if target == 0 {
        return Vec::new();
    }
    let step = (rows.len() / target).max(1);
    rows.into_iter().step_by(step).take(target).collect()
}

// ---------------------------------------------------------------------------
// End-to-end compilation
// ---------------------------------------------------------------------------

/// Read every empirical partition and simulated output configured, match the
/// simulated row count to the empirical one, and write both as CSVs.
/// Returns (empirical, simulated) row counts.
pub fn compile_datasets(cfg: &CompileConfig) -> Result<(usize, usize)> {
    let mut empirical = Vec::new();
    for folder in &cfg.empirical_folders {
        for file in files_with_extension(folder, "txt")? {
            empirical.extend(
                read_empirical_file(&file)
                    .with_context(|| format!("compiling empirical file {}", file.display()))?,
            );
        }
    }
    ensure!(
        !empirical.is_empty(),
        "no empirical trials found under the configured folders"
    );

    let mut simulated = Vec::new();
    for file in files_with_extension(&cfg.simulated_folder, "dat")? {
        let is_sim = file
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with("_sim.dat"));
        if is_sim {
            simulated.extend(
                read_simulated_file(&file)
                    .with_context(|| format!("compiling simulated file {}", file.display()))?,
            );
        }
    }
    let simulated = downsample(simulated, empirical.len());

    write_compiled_csv(&cfg.empirical_output, &empirical)?;
    write_compiled_csv(&cfg.simulated_output, &simulated)?;
    log::info!(
        "compiled {} empirical and {} simulated trials",
        empirical.len(),
        simulated.len()
    );
    Ok((empirical.len(), simulated.len()))
}

fn write_compiled_csv(path: &Path, trials: &[CompiledTrial]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer
        .write_record(["subject", "session", "group", "type", "response", "RT"])
        .with_context(|| format!("writing {}", path.display()))?;
    for t in trials {
        let response = fmt_float(t.response);
        let rt = fmt_float(t.rt);
        writer
            .write_record([
                t.subject.as_str(),
                t.session.as_str(),
                t.group.as_str(),
                t.source.code(),
                response.as_str(),
                rt.as_str(),
            ])
            .with_context(|| format!("writing {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_ids_shorten_to_two_digits() {
        assert_eq!(short_subject_id("PT0015"), "15");
        assert_eq!(short_subject_id("PT0003"), "03");
        assert_eq!(short_subject_id("PT0100"), "100");
        assert_eq!(short_subject_id("42"), "42");
    }

    #[test]
    fn group_labels_normalize() {
        assert_eq!(normalize_group("Probiotics"), "probiotic");
        assert_eq!(normalize_group("PLACEBO"), "placebo");
        assert_eq!(normalize_group("probiotic"), "probiotic");
    }

    #[test]
    fn simulated_filenames_carry_their_metadata() {
        let (subject, session, group) =
            simulated_meta("placebo_s1_pt_0015_sim.dat").unwrap();
        assert_eq!(subject, "15");
        assert_eq!(session, "1");
        assert_eq!(group, "placebo");

        assert!(simulated_meta("no_metadata.dat").is_err());
    }

    #[test]
    fn downsampling_matches_the_target_count() {
        let trial = |i: usize| CompiledTrial {
            subject: "01".into(),
            session: "1".into(),
            group: "placebo".into(),
            source: TrialSource::Simulated,
            response: i as f64,
            rt: 0.5,
        };
        let rows: Vec<CompiledTrial> = (0..10).map(trial).collect();
        let sampled = downsample(rows, 3);
        assert_eq!(sampled.len(), 3);
        // Stride of 10/3 = 3 keeps rows 0, 3, 6.
        let kept: Vec<f64> = sampled.iter().map(|t| t.response).collect();
        assert_eq!(kept, vec![0.0, 3.0, 6.0]);
    }

    #[test]
    fn empirical_partition_files_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pt_0015.txt");
        std::fs::write(
            &path,
            "#subj_idx\tSESSION\tCONDITION\tGROUP\tRESPONSE\tTIME\n\
             PT0015\t1\tSHAM\tProbiotics\t1.0\t0.532\n\
             PT0015\t1\tSHAM\tProbiotics\t0.0\t0.701\n",
        )
        .unwrap();

        let trials = read_empirical_file(&path).unwrap();
        assert_eq!(trials.len(), 2);
        assert_eq!(trials[0].subject, "15");
        assert_eq!(trials[0].group, "probiotic");
        assert_eq!(trials[0].source, TrialSource::Empirical);
        assert!((trials[1].rt - 0.701).abs() < 1e-12);
    }

    #[test]
    fn simulated_files_parse_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sham_s2_pt_0001_sim.dat");
        std::fs::write(&path, "1 0.5\n0 0.6\n").unwrap();

        let trials = read_simulated_file(&path).unwrap();
        assert_eq!(trials.len(), 2);
        assert_eq!(trials[0].subject, "01");
        assert_eq!(trials[0].session, "2");
        assert_eq!(trials[0].group, "sham");
        assert_eq!(trials[0].source, TrialSource::Simulated);
    }
}
