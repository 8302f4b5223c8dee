use meeple_core::clustering::ThresholdScaling;
use meeple_core::config::Config;
use meeple_core::errors::AppError;
use std::io::Write;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".toml").unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_full_file() {
    let file = write_config(
        r#"
[catalog]
base_url = "https://bgg.example.org/xmlapi2/"
request_timeout = "30s"
connect_timeout = 3
user_agent = "meetup-bot/2.0"
api_token = "abc123"
min_request_interval = "1s 500ms"

[cache]
search_ttl = "5m"
search_capacity = 64
game_ttl = "2h"
game_capacity = 1000

[clustering]
scaling = "piecewise_linear"
"#,
    );

    let config = Config::load_from_file(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.catalog.base_url, "https://bgg.example.org/xmlapi2/");
    assert_eq!(config.catalog.request_timeout, Duration::from_secs(30));
    assert_eq!(config.catalog.connect_timeout, Duration::from_secs(3));
    assert_eq!(config.catalog.user_agent, "meetup-bot/2.0");
    assert_eq!(config.catalog.api_token.as_deref(), Some("abc123"));
    assert_eq!(config.catalog.min_request_interval, Duration::from_millis(1500));
    assert_eq!(config.cache.search_ttl, Duration::from_secs(300));
    assert_eq!(config.cache.search_capacity, 64);
    assert_eq!(config.cache.game_ttl, Duration::from_secs(7200));
    assert_eq!(config.cache.game_capacity, 1000);
    assert_eq!(config.clustering.scaling, ThresholdScaling::PiecewiseLinear);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let config = Config::load_from_file(path.to_str().unwrap()).unwrap();

    assert_eq!(config, Config::default());
    assert!(!path.exists(), "loading must not create the file");
}

#[test]
fn test_partial_file_fills_defaults() {
    let file = write_config(
        r#"
[cache]
game_capacity = 50
"#,
    );

    let config = Config::load_from_file(file.path().to_str().unwrap()).unwrap();
    let defaults = Config::default();

    assert_eq!(config.cache.game_capacity, 50);
    assert_eq!(config.cache.game_ttl, defaults.cache.game_ttl);
    assert_eq!(config.catalog, defaults.catalog);
}

#[test]
fn test_invalid_values_are_configuration_errors() {
    let cases = [
        "[cache]\ngame_capacity = 0\n",
        "[catalog]\nrequest_timeout = \"soon\"\n",
        "[catalog]\nbase_url = \"not a url\"\n",
        "[clustering]\nscaling = \"cubic\"\n",
    ];

    for contents in cases {
        let file = write_config(contents);
        let err = Config::load_from_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(
            matches!(err, AppError::Configuration { .. }),
            "expected configuration error for {contents:?}, got {err}"
        );
    }
}

#[test]
fn test_rendered_defaults_load_back() {
    let file = write_config(&Config::default().to_toml_string().unwrap());

    let config = Config::load_from_file(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config, Config::default());
}
