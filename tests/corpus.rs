//! Integration tests for corpus and configuration loading

use std::io::Write;

use serde_json::json;
use tempfile::NamedTempFile;
use travel_trails::{Corpus, TrailConfig, TrailEngine, TrailError};

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_cities_file() {
    let corpus = json!({"cities": [
        {"coordinates": ["48.85", "2.35"], "description": "Paris",
         "infos": {"author": "Smith", "title": "Letters", "year": "1800", "url": "http://a"}},
        {"coordinates": ["", "12.49"], "description": "Nowhere",
         "infos": {"author": "Smith", "title": "Letters", "year": 1801, "url": ""}},
        {"coordinates": ["41.90", "12.49"], "description": "Rome",
         "infos": {"author": "Smith", "title": "Letters", "year": "unknown", "url": ""}}
    ]});
    let file = write_temp(&corpus.to_string());

    let corpus = Corpus::from_file(file.path()).unwrap();
    assert_eq!(corpus.mentions.len(), 1);
    assert_eq!(corpus.mentions[0].entry.year, 1800);
    assert_eq!(corpus.mentions[0].entry.url, "http://a");
    assert_eq!(corpus.stats.city_rows, 3);
    assert_eq!(corpus.stats.skipped, 2);
    assert!(!corpus.is_travel_dataset());
}

#[test]
fn test_load_travels_into_engine() {
    let corpus = json!({"travels": [
        {"coordinates": [[48.85, 2.35], [41.90, 12.49]], "description": "Paris-Rome",
         "infos": [
            {"author": "Smith", "title": "Letters", "year": 1800, "url": ""},
            {"author": "Jones", "title": "Diary", "year": 1810, "url": ""}
         ]},
        {"coordinates": [[41.90, 12.49], [48.85, 2.35]], "description": "Rome-Paris",
         "infos": [{"author": "Smith", "title": "Letters", "year": 1801, "url": ""}]}
    ]});
    let file = write_temp(&corpus.to_string());

    let mut engine = TrailEngine::new();
    let stats = engine.load_corpus_file(file.path()).unwrap();
    assert_eq!(stats.travels, 2);
    assert!(engine.corpus().is_travel_dataset());

    let id = engine.add_filter();
    let summary = engine
        .filter(id, travel_trails::FilterQuery::default())
        .unwrap();
    assert_eq!(summary.segments, 1);
    assert_eq!(summary.entries, 3);
    let segment = &engine.session(id).unwrap().segments().as_slice()[0];
    assert_eq!(segment.label(), "Paris-Rome(3)");
}

#[test]
fn test_null_author_skips_only_that_row() {
    let corpus = json!({"cities": [
        {"coordinates": ["48.85", "2.35"], "description": "Paris",
         "infos": {"author": "Smith", "title": "Letters", "year": 1800, "url": ""}},
        {"coordinates": ["41.90", "12.49"], "description": "Rome",
         "infos": {"author": null, "title": "Letters", "year": 1801, "url": ""}}
    ]});
    let corpus = Corpus::from_json_str(&corpus.to_string()).unwrap();
    assert_eq!(corpus.mentions.len(), 1);
    assert_eq!(corpus.mentions[0].description, "Paris");
    assert_eq!(corpus.stats.skipped, 1);
}

#[test]
fn test_null_citation_in_travel_row() {
    let corpus = json!({"travels": [
        {"coordinates": [[48.85, 2.35], [41.90, 12.49]], "description": null,
         "infos": [
            {"author": "Smith", "title": "Letters", "year": 1800, "url": null},
            {"author": "Jones", "title": "Diary", "year": 1810, "url": ""}
         ]}
    ]});
    let corpus = Corpus::from_json_str(&corpus.to_string()).unwrap();
    assert_eq!(corpus.travels.len(), 1);
    assert_eq!(corpus.travels[0].entries.len(), 1);
    assert_eq!(corpus.travels[0].entries[0].author, "Jones");
    assert_eq!(corpus.stats.skipped, 1);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cities.json");
    match Corpus::from_file(&path) {
        Err(TrailError::Io { path: reported, .. }) => {
            assert!(reported.ends_with("cities.json"));
        }
        other => panic!("expected Io error, got {:?}", other),
    }
}

#[test]
fn test_invalid_json_is_parse_error() {
    let err = Corpus::from_json_str("{\"cities\": [").unwrap_err();
    assert!(matches!(err, TrailError::CorpusParse { .. }));
}

#[test]
fn test_config_file() {
    let file = write_temp(r#"{"points_per_ms": 0.6, "max_results": null, "zoom_threshold": 120}"#);
    let config = TrailConfig::from_file(file.path()).unwrap();
    assert_eq!(config.points_per_ms, 0.6);
    assert_eq!(config.max_results, None);
    assert_eq!(config.zoom_threshold, 120.0);
    assert_eq!(config.points_per_arc, 100);
}

#[test]
fn test_invalid_config_rejected() {
    let file = write_temp(r#"{"points_per_arc": 1}"#);
    let err = TrailConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, TrailError::ConfigError { .. }));
}
