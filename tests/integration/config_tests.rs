use stock_sentinel::models::{MonitorConfig, Target};
use stock_sentinel::utils::error::ConfigError;

#[test]
fn test_save_load_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");

    let mut config = MonitorConfig::default();
    config.notification.from_address = "watcher@example.com".to_string();
    config.notification.to_address = "me@example.com".to_string();
    config.notification.credentials_ref = "env:SMTP_PASSWORD".to_string();
    config.targets[1] = Target::new(1, "https://shop.example.com/boots", 45);
    config.targets[3].enabled = false;

    config.save(&path)?;
    let first_write = std::fs::read_to_string(&path)?;

    let loaded = MonitorConfig::load(&path)?;
    assert_eq!(loaded, config);

    loaded.save(&path)?;
    assert_eq!(std::fs::read_to_string(&path)?, first_write);
    Ok(())
}

#[test]
fn test_missing_file_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let config = MonitorConfig::load_or_default(dir.path().join("absent.json"));
    assert_eq!(config, MonitorConfig::default());
}

#[test]
fn test_malformed_file_falls_back_to_default() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ \"targets\": [")?;

    assert!(matches!(MonitorConfig::load(&path), Err(ConfigError::Malformed(_))));
    assert_eq!(MonitorConfig::load_or_default(&path), MonitorConfig::default());
    Ok(())
}

#[test]
fn test_missing_section_is_reported() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "targets": [] }"#)?;

    match MonitorConfig::load(&path) {
        Err(ConfigError::MissingField(field)) => assert_eq!(field, "notification"),
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}
