//! I/O operations for samples and metric files.
//!
//! This module reads evaluation samples, writes per-task metric files,
//! merges a model's output tree and loads the cohort file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use audio_ifeval_common::to_pretty_json_line;
use audio_ifeval_domain::{CohortMetrics, Dimension, DomainError, ModelMetrics, Sample, Task, MULTITASK_ROOT};
use chrono::Local;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

/// Suffix of a model's merged metrics file.
pub const MERGED_SUFFIX: &str = "_collect_all_metrics.json";

/// Output subdirectory of the model tree.
pub const OUTPUT_DIR: &str = "output";

/// Task directories read by the merge, in output order.
pub const MERGE_TASKS: [&str; 5] = ["asr", "gr", "ser", "aac", "s2tt"];

/// Parse sample records: a JSON array, a single object, an object with an
/// `annotation` array, or one object per line.
pub fn parse_samples(content: &str, origin: &str) -> Result<Vec<Sample>, DomainError> {
    let content = content.trim();
    let records: Vec<Value> = match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(mut obj)) => match obj.remove("annotation") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                obj.insert("annotation".into(), other);
                vec![Value::Object(obj)]
            }
            None => vec![Value::Object(obj)],
        },
        Ok(_) => return Err(DomainError::malformed(origin, "top-level JSON must be an array or an object")),
        Err(_) => content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| DomainError::malformed(origin, format!("line {}: {e}", i + 1)))
            })
            .collect::<Result<_, _>>()?,
    };

    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            serde_json::from_value(record).map_err(|e| DomainError::malformed(origin, format!("record {i}: {e}")))
        })
        .collect()
}

/// Reads samples from a file.
pub fn load_samples(path: &Path) -> Result<Vec<Sample>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read input file: {}", path.display()))?;
    let samples = parse_samples(&content, &path.display().to_string())?;
    info!(path = %path.display(), samples = samples.len(), "Samples loaded");
    Ok(samples)
}

/// Default metric file for an input: the first two components of the
/// input's directory (a leading `/` counts as one), then `output/<dim>/<task>/<model>_<dim>_<task>_metric.json`.
/// The `n` dimension uses `only` as its task directory.
pub fn default_metric_path(input: &Path, dimension: Dimension, task: Option<Task>, model: &str) -> PathBuf {
    let task_dir = match (dimension, task) {
        (Dimension::N, _) | (_, None) => MULTITASK_ROOT.to_string(),
        (_, Some(task)) => task.to_string(),
    };
    let base: PathBuf = input
        .parent()
        .map(|parent| parent.components().take(2).collect())
        .unwrap_or_default();
    base.join(OUTPUT_DIR)
        .join(dimension.as_str())
        .join(&task_dir)
        .join(format!("{model}_{dimension}_{task_dir}_metric.json"))
}

/// Writes a value as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let text = to_pretty_json_line(value)?;
    fs::write(path, text).with_context(|| format!("Failed to write file: {}", path.display()))?;
    debug!(path = %path.display(), "File written");
    Ok(())
}

/// Copies an existing file to `<file>.bak.<YYYYmmddHHMMSS>`.
pub fn backup_existing(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let mut backup = path.as_os_str().to_owned();
    backup.push(format!(".bak.{stamp}"));
    let backup = PathBuf::from(backup);
    fs::copy(path, &backup)
        .with_context(|| format!("Failed to back up {} to {}", path.display(), backup.display()))?;
    info!(from = %path.display(), to = %backup.display(), "Backed up existing file");
    Ok(Some(backup))
}

/// The sole `.json` file of a directory. Zero or several is a warning.
pub fn find_single_json(dir: &Path) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => {
            warn!(dir = %dir.display(), "Directory not found");
            return None;
        }
    };
    let mut jsons: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("json")))
        .collect();
    match jsons.len() {
        1 => jsons.pop(),
        0 => {
            warn!(dir = %dir.display(), "No json files found");
            None
        }
        n => {
            warn!(dir = %dir.display(), files = n, "Multiple json files found, skipping (need exactly one)");
            None
        }
    }
}

/// Reads a JSON file, logging and skipping unreadable or unparseable ones.
pub fn read_json_lenient(path: &Path) -> Option<Value> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "File not readable");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            error!(path = %path.display(), error = %e, "Error decoding JSON");
            None
        }
    }
}

fn read_dir_json(dir: &Path) -> Option<Value> {
    find_single_json(dir).and_then(|path| read_json_lenient(&path))
}

/// Merged body of a model's output directory:
/// `{"d": {task: ..}, "f": {task: ..}, "n": {"only": ..}}`.
///
/// A directory with neither a `d` nor an `f` subtree is read as a single dimension,
/// its task directories at the top level.
pub fn merge_model_output(dir: &Path) -> Result<Map<String, Value>> {
    anyhow::ensure!(dir.is_dir(), "Output directory not found: {}", dir.display());
    let mut merged = Map::new();

    let read_tasks = |base: &Path| -> Map<String, Value> {
        MERGE_TASKS
            .iter()
            .filter_map(|task| read_dir_json(&base.join(task)).map(|v| (task.to_string(), v)))
            .collect()
    };
    let read_multitask = |base: &Path| -> Map<String, Value> {
        read_dir_json(&base.join(MULTITASK_ROOT))
            .map(|v| (MULTITASK_ROOT.to_string(), v))
            .into_iter()
            .collect()
    };

    let n_dir = dir.join(Dimension::N.as_str());
    if dir.join(Dimension::D.as_str()).is_dir() || dir.join(Dimension::F.as_str()).is_dir() {
        for dimension in [Dimension::D, Dimension::F] {
            merged.insert(dimension.to_string(), Value::Object(read_tasks(&dir.join(dimension.as_str()))));
        }
        let n = if n_dir.is_dir() { read_multitask(&n_dir) } else { Map::new() };
        merged.insert(Dimension::N.to_string(), Value::Object(n));
    } else {
        merged.extend(read_tasks(dir));
        if n_dir.is_dir() {
            merged.insert(Dimension::N.to_string(), Value::Object(read_multitask(&n_dir)));
        }
    }
    Ok(merged)
}

/// Merged metrics file of a model inside its output directory.
pub fn merged_path(dir: &Path, model: &str) -> PathBuf {
    dir.join(format!("{model}{MERGED_SUFFIX}"))
}

/// Default merged file of a tested model: `egs/<model>/output/<model>_collect_all_metrics.json`.
pub fn default_model_metrics_path(model: &str) -> PathBuf {
    merged_path(&Path::new("egs").join(model).join(OUTPUT_DIR), model)
}

/// Loads a cohort file. Models whose tree does not parse are skipped.
pub fn load_cohort(path: &Path) -> Result<CohortMetrics> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read cohort file: {}", path.display()))?;
    let raw: Map<String, Value> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse cohort file: {}", path.display()))?;

    let mut cohort = CohortMetrics::default();
    for (model, body) in raw {
        match serde_json::from_value::<ModelMetrics>(body) {
            Ok(metrics) => cohort.insert(model, metrics),
            Err(e) => warn!(model = %model, error = %e, "Skipping model with malformed metrics"),
        }
    }
    info!(path = %path.display(), models = cohort.len(), "Cohort loaded");
    Ok(cohort)
}

/// Loads one model's tree from its merged file.
pub fn load_model_metrics(path: &Path, model: &str) -> Result<ModelMetrics> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read metrics file: {}", path.display()))?;
    let mut raw: Map<String, Value> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse metrics file: {}", path.display()))?;
    let body = raw
        .remove(model)
        .with_context(|| format!("Model {model} not found in {}", path.display()))?;
    serde_json::from_value(body).with_context(|| format!("Malformed metrics for {model} in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_array_object_and_annotation() {
        let array = parse_samples(r#"[{"text": "a"}, {"text": "b"}]"#, "t").unwrap();
        assert_eq!(array.len(), 2);

        let single = parse_samples(r#"{"text": "a", "variation_responses": {"x": "y"}}"#, "t").unwrap();
        assert_eq!(single.len(), 1);

        let annotated = parse_samples(r#"{"annotation": [{"text": "a"}, {"text": "b"}, {"text": "c"}]}"#, "t").unwrap();
        assert_eq!(annotated.len(), 3);
    }

    #[test]
    fn test_parse_ndjson() {
        let samples = parse_samples("{\"text\": \"a\"}\n\n{\"text\": 5}\n", "t").unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].text, "5");
    }

    #[test]
    fn test_parse_malformed() {
        let err = parse_samples("{\"text\": \"a\"}\nnot json", "in.json").unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_INPUT");
        assert!(err.to_string().contains("line 2"));
        assert!(parse_samples("42", "t").is_err());
    }

    #[test]
    fn test_default_metric_path() {
        let path = default_metric_path(Path::new("egs/qwen/data/f_asr.json"), Dimension::F, Some(Task::Asr), "qwen");
        assert_eq!(path, PathBuf::from("egs/qwen/output/f/asr/qwen_f_asr_metric.json"));

        let path = default_metric_path(Path::new("egs/qwen/data/n.json"), Dimension::N, None, "qwen");
        assert_eq!(path, PathBuf::from("egs/qwen/output/n/only/qwen_n_only_metric.json"));

        let path = default_metric_path(Path::new("/data/runs/d_aac.json"), Dimension::D, Some(Task::Aac), "m");
        assert_eq!(path, PathBuf::from("/data/output/d/aac/m_d_aac_metric.json"));
    }

    #[test]
    fn test_write_and_backup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/out.json");

        assert!(backup_existing(&path).unwrap().is_none());
        write_json(&path, &json!({"a": 1})).unwrap();
        let backup = backup_existing(&path).unwrap().unwrap();

        assert!(backup.exists());
        assert!(backup.to_string_lossy().contains("out.json.bak."));
        assert_eq!(fs::read_to_string(&backup).unwrap(), fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn test_merge_model_output() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_json(&root.join("d/asr/m_d_asr_metric.json"), &json!({"all": {"ifr": 1.0}})).unwrap();
        write_json(&root.join("f/ser/m_f_ser_metric.json"), &json!({"all": {"ifr": 2.0}})).unwrap();
        // two candidates: skipped
        write_json(&root.join("f/gr/a.json"), &json!({})).unwrap();
        write_json(&root.join("f/gr/b.json"), &json!({})).unwrap();
        write_json(&root.join("n/only/m_n_only_metric.json"), &json!({"single-stage": {}})).unwrap();
        fs::create_dir_all(root.join("d/aac")).unwrap();
        fs::write(root.join("d/aac/broken.json"), "{").unwrap();

        let merged = merge_model_output(root).unwrap();

        assert_eq!(merged["d"], json!({"asr": {"all": {"ifr": 1.0}}}));
        assert_eq!(merged["f"], json!({"ser": {"all": {"ifr": 2.0}}}));
        assert_eq!(merged["n"], json!({"only": {"single-stage": {}}}));
    }

    #[test]
    fn test_load_cohort_skips_malformed_models() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cohort.json");
        write_json(
            &path,
            &json!({
                "good": {"d": {"asr": {"default": {"ifr": 90.0, "wer": 5.0}}}},
                "bad": {"d": "not a tree"}
            }),
        )
        .unwrap();

        let cohort = load_cohort(&path).unwrap();
        assert_eq!(cohort.models().collect::<Vec<_>>(), vec!["good"]);

        let model = load_model_metrics(&path, "good").unwrap();
        assert!(model.record(Dimension::D, Task::Asr, "default").is_some());
        assert!(load_model_metrics(&path, "absent").is_err());
    }
}
