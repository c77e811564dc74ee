//! Test fixtures for generating samples and metric trees with realistic data.
//!
//! Complete trees cover every label the standard layout reads, so the
//! aggregation and area computations have something to work on without
//! hand-writing dozens of records.

use audio_ifeval_domain::{BenchmarkLayout, CohortMetrics, Dimension, ModelMetrics, Sample, SubTask, Task, SINGLE_STAGE};
use fake::{faker::lorem::en::Words, Fake};

use crate::builders::{MetricTreeBuilder, SampleBuilder};

/// Variation labels of dimension `d`, as found in metric files.
pub const D_VARIATIONS: [&str; 9] = [
    "default",
    "lower_case",
    "upper_case",
    "grammar_robust",
    "syntax_robust",
    "semantic_equal_complex",
    "semantic_equal_neutral",
    "semantic_equal_simple",
    "alter_symbol",
];

/// Variation labels of dimension `f`, as found in metric files.
pub const F_VARIATIONS: [&str; 7] = ["constrain", "lower_case", "upper_case", "prefix", "suffix", "wrap", "json"];

/// A random lower-case sentence of a few words.
pub fn random_sentence() -> String {
    let words: Vec<String> = Words(3..8).fake();
    words.join(" ").to_lowercase()
}

/// A sample with the same response under `upper_case` and `lower_case`.
pub fn create_case_sample(text: &str) -> Sample {
    SampleBuilder::new(text)
        .with_response("upper_case", text.to_uppercase())
        .with_response("lower_case", text.to_lowercase())
        .build()
}

/// A multi-task sample whose separation and json records all comply.
pub fn create_multitask_sample() -> Sample {
    SampleBuilder::new("hello world")
        .with_emotion("happy")
        .with_gender("female")
        .with_separation(SINGLE_STAGE, "ASR|SER", "hello world\\HAPPY", "\\")
        .with_separation(SINGLE_STAGE, "ASR|SER|GR", "hello world\\happy\\female", "\\")
        .with_json_record(
            SINGLE_STAGE,
            "SER|GR",
            "emotion|gender",
            r#"{"emotion": "happy", "gender": "female"}"#,
        )
        .build()
}

/// A full metric tree where every label has IFR `ifr` and every primary
/// metric the given value (WER included).
pub fn create_full_model_metrics(ifr: f64, metric: f64) -> ModelMetrics {
    let layout = BenchmarkLayout::standard();
    let mut builder = MetricTreeBuilder::new();
    for task in &layout.tasks {
        for label in D_VARIATIONS {
            builder = builder.with_label(Dimension::D, *task, label, ifr, metric);
        }
        for label in F_VARIATIONS {
            if *task == Task::S2tt && label.ends_with("_case") {
                continue;
            }
            builder = builder.with_label(Dimension::F, *task, label, ifr, metric);
        }
    }
    for label in &layout.n_labels {
        let bucket = BenchmarkLayout::n_bucket(label);
        for sub in SubTask::ALL {
            builder = builder.with_bucket_record(SINGLE_STAGE, &bucket, sub, ifr, metric);
        }
    }
    builder.build()
}

/// A cohort of full trees, one per `(name, ifr, metric)` entry, in order.
pub fn create_test_cohort(models: &[(&str, f64, f64)]) -> CohortMetrics {
    let mut cohort = CohortMetrics::default();
    for (name, ifr, metric) in models {
        cohort.insert(*name, create_full_model_metrics(*ifr, *metric));
    }
    cohort
}
