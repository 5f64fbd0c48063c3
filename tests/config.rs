use std::time::Duration;

use assert_matches::assert_matches;

use plant_harvest::config::{Config, ConfigLoader, SubjectEntry, SubjectEntryObject};
use plant_harvest::error::HarvestError;
use plant_harvest::query::expand;

#[test]
fn parse_config_shorthand_and_detailed() {
    let config = Config {
        subjects: vec![
            SubjectEntry::Shorthand("Tomato: Leaf Spot, Early Blight".to_string()),
            SubjectEntry::Detailed(SubjectEntryObject {
                name: "Vine".to_string(),
                categories: vec![" Downy Mildew ".to_string(), "".to_string()],
            }),
        ],
        images_per_category: Some(25),
        ..Config::default()
    };

    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.images_per_category, 25);

    let queries = expand(&resolved.subjects);
    let segments: Vec<_> = queries
        .iter()
        .map(|query| query.relative_dir().to_string())
        .collect();
    assert_eq!(
        segments,
        vec!["Tomato/Leaf_Spot", "Tomato/Early_Blight", "Vine/Downy_Mildew"]
    );
}

#[test]
fn parse_json_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("plant-harvest.json");
    std::fs::write(
        &path,
        r#"{
            "subjects": ["Apple: Scab", {"name": "Pear", "categories": ["Rust"]}],
            "images_per_category": 4,
            "output_root": "dataset",
            "search": {"scroll_pause_ms": 500, "max_idle_passes": 2},
            "fetch": {"timeout_secs": 10, "delay_between_ms": 250}
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.subjects.len(), 2);
    assert_eq!(resolved.output_root.as_str(), "dataset");
    assert_eq!(resolved.ledger_path.as_str(), "image_sources.csv");
    assert_eq!(resolved.search.scroll_pause, Duration::from_millis(500));
    assert_eq!(resolved.search.max_idle_passes, 2);
    assert_eq!(resolved.search.thumbnail_selector, "img.Q4LuWd");
    assert_eq!(resolved.fetch.timeout, Duration::from_secs(10));
    assert_eq!(resolved.fetch.delay_between, Duration::from_millis(250));
}

#[test]
fn rejects_zero_target() {
    let config = Config {
        images_per_category: Some(0),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, HarvestError::InvalidTargetCount(0));
}

#[test]
fn rejects_non_http_endpoint() {
    let mut config = Config::default();
    config.search.endpoint = "file:///tmp/search".to_string();
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, HarvestError::InvalidEndpoint(_));
}

#[test]
fn missing_explicit_file_is_read_error() {
    let err = ConfigLoader::resolve(Some("/nonexistent/plant-harvest.json")).unwrap_err();
    assert_matches!(err, HarvestError::ConfigRead(_));
}
