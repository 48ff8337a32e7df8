//! End-to-end tests: loader -> configuration -> task graph -> local backend

use std::fs;
use std::sync::Arc;

use hyperflow::backend::{Backend, LocalBackend, SubmitOptions};
use hyperflow::event_log::EventKind;
use hyperflow::loader::ConfigLoader;
use hyperflow::model::Configuration;
use hyperflow::output::OutputFormat;
use hyperflow::path::FieldPath;
use hyperflow::workflow::TaskGraph;
use serde_json::json;
use tempfile::TempDir;

fn scenario() -> Configuration {
    Configuration::from_value(&json!({
        "connection": {"driver": "postgres", "username": "u", "password": "p",
                       "host": "h", "port": 5432, "database": "db"},
        "structure": {"target": {"name": "y", "type": "float", "description": "label"},
                      "features": [{"name": "x1", "type": "float", "description": "feat1"}]},
        "hyperparameters": {"loss": "huber", "learning_rate": 0.1, "n_estimators": 3,
                            "max_depth": 2, "min_samples_split": 1}
    }))
    .unwrap()
}

fn quiet(format: OutputFormat) -> SubmitOptions {
    SubmitOptions {
        format,
        echo: false,
        ..SubmitOptions::default()
    }
}

#[tokio::test]
async fn test_scenario_displays_x1_exactly_once() {
    let handle = LocalBackend::new()
        .submit(&TaskGraph::standard(), Arc::new(scenario()), &quiet(OutputFormat::Text))
        .await
        .unwrap();

    let column_displays: Vec<String> = handle
        .events
        .displays()
        .into_iter()
        .filter(|(task_id, _)| task_id.starts_with("show_column"))
        .map(|(_, rendered)| rendered)
        .collect();

    assert_eq!(column_displays.len(), 1);
    assert!(column_displays[0].contains("name: x1"));
    assert!(column_displays[0].contains("description: feat1"));
}

#[tokio::test]
async fn test_every_task_starts_and_completes() {
    let handle = LocalBackend::new()
        .submit(&TaskGraph::standard(), Arc::new(scenario()), &quiet(OutputFormat::Json))
        .await
        .unwrap();

    for task_id in ["show_config", "show_column[0]"] {
        let kinds: Vec<EventKind> = handle
            .events
            .filter_task(task_id)
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds.len(), 3, "{}: {:?}", task_id, kinds);
        assert!(matches!(kinds[0], EventKind::TaskStarted { .. }));
        assert!(matches!(kinds[1], EventKind::Displayed { .. }));
        assert!(matches!(kinds[2], EventKind::TaskCompleted { .. }));
    }
    assert!(handle.events.failures().is_empty());
}

#[tokio::test]
async fn test_displayed_config_is_redacted() {
    let handle = LocalBackend::new()
        .submit(&TaskGraph::standard(), Arc::new(scenario()), &quiet(OutputFormat::Json))
        .await
        .unwrap();

    let (_, rendered) = handle
        .events
        .displays()
        .into_iter()
        .find(|(task_id, _)| &**task_id == "show_config")
        .unwrap();
    let shown: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(shown["connection"]["password"], "***");
    assert_eq!(shown["hyperparameters"]["loss"], "huber");
}

#[tokio::test]
async fn test_fan_out_over_many_columns() {
    let features: Vec<serde_json::Value> = (0..50)
        .map(|i| json!({"name": format!("x{}", i), "type": "int", "description": "f"}))
        .collect();
    let config = Configuration::from_value(&json!({
        "connection": {"driver": "postgres", "username": "u", "password": "p",
                       "host": "h", "port": 5432, "database": "db"},
        "structure": {"target": {"name": "y", "type": "float", "description": "label"},
                      "features": features},
        "hyperparameters": {"loss": "squared_error", "learning_rate": 0.05, "n_estimators": 100,
                            "max_depth": 6, "min_samples_split": 2}
    }))
    .unwrap();

    let handle = LocalBackend::new()
        .submit(&TaskGraph::standard(), Arc::new(config), &quiet(OutputFormat::Text))
        .await
        .unwrap();

    assert_eq!(handle.summary.completed, 51);
    let mut names: Vec<String> = handle
        .events
        .displays()
        .into_iter()
        .filter(|(task_id, _)| task_id.starts_with("show_column"))
        .map(|(task_id, _)| task_id.to_string())
        .collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 50);
}

#[tokio::test]
async fn test_selected_scalar_is_rendered_raw() {
    let graph = TaskGraph::standard()
        .with_selector(FieldPath::parse("hyperparameters.learning_rate").unwrap());
    let handle = LocalBackend::new()
        .submit(&graph, Arc::new(scenario()), &quiet(OutputFormat::Text))
        .await
        .unwrap();

    let config_display = handle
        .events
        .displays()
        .into_iter()
        .find(|(task_id, _)| &**task_id == "show_config")
        .map(|(_, rendered)| rendered);
    assert_eq!(config_display.as_deref(), Some("0.1"));
}

#[tokio::test]
async fn test_loader_to_backend() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.yaml"),
        serde_yaml::to_string(&serde_json::to_value(scenario()).unwrap()).unwrap(),
    )
    .unwrap();

    let config = ConfigLoader::new(dir.path(), "config")
        .with_env_from(|_| None)
        .with_overrides(["hyperparameters.loss=quantile", "structure.features[0].name=x9"])
        .unwrap()
        .load_configuration()
        .unwrap();

    let handle = LocalBackend::new()
        .submit(&TaskGraph::standard(), Arc::new(config), &quiet(OutputFormat::Text))
        .await
        .unwrap();

    let rendered: Vec<String> = handle.events.displays().into_iter().map(|(_, r)| r).collect();
    assert!(rendered.iter().any(|r| r.contains("loss: quantile")));
    assert!(rendered.iter().any(|r| r.contains("name: x9")));
}
