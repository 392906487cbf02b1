use brrtapp::config::{ConfigAccess, Mode};
use brrtapp::{AppConfig, ConfigError};
use serde_json::Value;

mod common;
use common::temp_files;

#[test]
fn test_load_yaml_config() {
    let path = temp_files::create_temp_yaml(
        r#"
root: /shop
view_404: errors.404
views_dir: /srv/views
powered_by: shopfront
csrf:
  cookie: SHOP-TOKEN
mail:
  driver: smtp
  port: 2525
"#,
    );
    let config = AppConfig::load(&path).unwrap();
    temp_files::cleanup_temp_files(&[path]);

    assert_eq!(config.root(), "/shop");
    assert_eq!(config.view_404(), Some("errors.404"));
    assert_eq!(config.powered_by, "shopfront");
    assert_eq!(config.csrf.cookie, "SHOP-TOKEN");
    assert!(config.csrf.enabled);
    assert_eq!(config.csrf.field, "_token");
    assert_eq!(config.view_extension, ".html");
    assert_eq!(config.get("mail.port"), Some(Value::from(2525)));
}

#[test]
fn test_load_json_config() {
    let path = temp_files::create_temp_file(r#"{ "root": "/api", "mode": "down" }"#, "json");
    let config = AppConfig::load(&path).unwrap();
    temp_files::cleanup_temp_files(&[path]);

    assert_eq!(config.root, "/api");
    assert_eq!(config.mode, Mode::Down);
    assert!(config.is_down());
}

#[test]
fn test_load_toml_config() {
    let path = temp_files::create_temp_file(
        "root = \"/t\"\n\n[csrf]\nenabled = false\n\n[cache]\nttl = 60\n",
        "toml",
    );
    let config = AppConfig::load(&path).unwrap();
    temp_files::cleanup_temp_files(&[path]);

    assert_eq!(config.root, "/t");
    assert!(!config.csrf.enabled);
    assert_eq!(config.require("cache.ttl").unwrap(), Value::from(60));
}

#[test]
fn test_load_rejects_malformed_and_missing_files() {
    let path = temp_files::create_temp_file("root: [unclosed", "yaml");
    let err = AppConfig::load(&path).unwrap_err();
    temp_files::cleanup_temp_files(&[path.clone()]);
    assert!(matches!(err, ConfigError::Load { .. }));

    assert!(matches!(AppConfig::load(&path), Err(ConfigError::Load { .. })));
}

#[test]
fn test_require_names_missing_key() {
    let config = AppConfig::default();
    match config.require("queue.driver") {
        Err(ConfigError::MissingKey(key)) => assert_eq!(key, "queue.driver"),
        other => panic!("expected MissingKey, got {other:?}"),
    }
}
