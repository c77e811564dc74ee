//! Command handler tests over temporary model trees

use std::fs;

use audio_ifeval_benchmarks::{io, MetricRequest};
use audio_ifeval_cli::commands::{area, merge, metric, CommandContext};
use audio_ifeval_cli::OutputFormat;
use audio_ifeval_common::EvalConfig;
use audio_ifeval_domain::{Dimension, Task};
use audio_ifeval_testing::create_test_cohort;
use tempfile::TempDir;

#[test]
fn test_metric_merge_area_round() {
    // Arrange
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let input = root.join("f_ser.json");
    fs::write(
        &input,
        "{\"text\": \"happy\", \"emotion\": \"happy\", \"variation_responses\": {\"upper_case\": \"HAPPY\"}}\n\
         {\"text\": \"sad\", \"emotion\": \"sad\", \"variation_responses\": {\"upper_case\": \"sad\"}}\n",
    )
    .unwrap();
    let model_dir = root.join("model");
    let metric_path = model_dir.join("f/ser/m_f_ser_metric.json");

    let cohort_path = root.join("cohort.json");
    io::write_json(&cohort_path, &create_test_cohort(&[("ref", 90.0, 10.0)])).unwrap();
    let mut config = EvalConfig::default();
    config.cohort.reference_metrics = cohort_path;
    let ctx = CommandContext::new(config, OutputFormat::Text);

    // Act
    let request = MetricRequest {
        dimension: Dimension::F,
        task: Some(Task::Ser),
        model: "m".to_string(),
        input,
        output: Some(metric_path.clone()),
    };
    metric::run(&ctx, &request).unwrap();
    fs::create_dir_all(model_dir.join("d")).unwrap();
    merge::run(&model_dir, "m").unwrap();

    // Assert
    assert!(metric_path.exists());
    let merged = io::merged_path(&model_dir, "m");
    let tree = io::load_model_metrics(&merged, "m").unwrap();
    assert!(tree.record(Dimension::F, Task::Ser, "upper_case").is_some());

    // the partial tree has N/A totals and is left out of both blocks
    area::run(&ctx, "m", Some(&merged), true).unwrap();
}

#[test]
fn test_metric_requires_task_for_f() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("in.json");
    fs::write(&input, "[]").unwrap();
    let request = MetricRequest {
        dimension: Dimension::F,
        task: None,
        model: "m".to_string(),
        input,
        output: None,
    };

    let err = metric::run(&CommandContext::default(), &request).unwrap_err();
    assert!(err.to_string().contains("--task"));
}

#[test]
fn test_area_reports_missing_cohort() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = EvalConfig::default();
    config.cohort.reference_metrics = temp_dir.path().join("absent.json");
    let ctx = CommandContext::new(config, OutputFormat::Text);

    let err = area::run(&ctx, "m", None, false).unwrap_err();
    assert!(format!("{err:#}").contains("absent.json"));
}
