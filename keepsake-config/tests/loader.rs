use std::{collections::HashMap, path::Path, time::Duration};

use keepsake_config::{ConfigLoadError, ConfigLoader, EnvConfig};
use keepsake_model::{ByteSize, RefetchFrequency};

fn env(pairs: &[(&str, &str)]) -> EnvConfig {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    EnvConfig::from_lookup(|key| map.get(key).cloned())
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

const FULL: &str = r#"
owner = "alice"

[remote]
url = "https://vault.example/api/"
request_timeout = "15s"
probe_interval = "1m"

[cache]
root = "cache"
budget = "64MiB"

[memories]
count = 6
frequency = "weekly"

[settings]
path = "/var/lib/keepsake/settings.json"
"#;

#[test]
fn defaults_without_file_or_env() {
    let dir = tempfile::tempdir().unwrap();
    let load = ConfigLoader::new()
        .with_env(env(&[]))
        .with_search_dir(dir.path())
        .load()
        .unwrap();

    let config = load.config;
    assert!(config.owner.is_none());
    assert!(config.remote.url.is_none());
    assert_eq!(config.remote.request_timeout, Duration::from_secs(30));
    assert_eq!(config.cache.budget, ByteSize::from_mib(100));
    assert_eq!(config.memories.count.get(), 8);
    assert_eq!(config.memories.frequency, RefetchFrequency::Daily);
    assert!(config.metadata.config_path.is_none());

    assert!(load.warnings.contains("No keepsake.toml detected"));
    assert!(load.warnings.contains("No owner configured"));
    assert!(load.warnings.contains("No remote library URL"));
}

#[test]
fn file_found_in_default_location() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config/keepsake.toml", FULL);

    let load = ConfigLoader::new()
        .with_env(env(&[]))
        .with_search_dir(dir.path())
        .load()
        .unwrap();
    let config = load.config;

    assert_eq!(config.owner.unwrap().as_str(), "alice");
    assert_eq!(
        config.remote.url.unwrap().as_str(),
        "https://vault.example/api/"
    );
    assert_eq!(config.remote.request_timeout, Duration::from_secs(15));
    assert_eq!(config.remote.probe_interval, Some(Duration::from_secs(60)));
    assert_eq!(config.cache.budget, ByteSize::from_mib(64));
    assert_eq!(
        config.cache.root.unwrap(),
        dir.path().join("config").join("cache")
    );
    assert_eq!(
        config.settings.path.unwrap(),
        Path::new("/var/lib/keepsake/settings.json")
    );
    assert_eq!(config.memories.count.get(), 6);
    assert_eq!(config.memories.frequency, RefetchFrequency::Weekly);
    assert!(load.warnings.is_empty(), "{:?}", load.warnings);
}

#[test]
fn env_overrides_file_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "custom.toml", FULL);

    let config = ConfigLoader::new()
        .with_env(env(&[
            ("KEEPSAKE_CONFIG", path.to_str().unwrap()),
            ("KEEPSAKE_OWNER", "bob"),
            ("KEEPSAKE_REQUEST_TIMEOUT", "2s"),
            ("KEEPSAKE_CACHE_BUDGET", "0"),
            ("KEEPSAKE_MEMORY_COUNT", "42"),
            ("KEEPSAKE_REFETCH_FREQUENCY", "Monthly"),
            ("KEEPSAKE_CACHE_ROOT", "/tmp/keepsake-cache"),
            ("KEEPSAKE_REMOTE_URL", "   "),
        ]))
        .load()
        .unwrap()
        .config;

    assert_eq!(config.metadata.config_path.as_deref(), Some(path.as_path()));
    assert_eq!(config.owner.unwrap().as_str(), "bob");
    assert_eq!(config.remote.request_timeout, Duration::from_secs(2));
    assert!(config.cache.budget.is_zero());
    assert_eq!(config.memories.count.get(), 10);
    assert_eq!(config.memories.frequency, RefetchFrequency::Monthly);
    assert_eq!(config.cache.root.unwrap(), Path::new("/tmp/keepsake-cache"));
    // blank env values do not override the file
    assert!(config.remote.url.is_some());

    let initial = ConfigLoader::new()
        .with_config_path(&path)
        .with_env(env(&[]))
        .load()
        .unwrap()
        .config
        .initial_settings();
    assert_eq!(initial.frequency, RefetchFrequency::Weekly);
    assert_eq!(initial.cache_budget, ByteSize::from_mib(64));
    assert!(initial.last_refetch_time.is_none());
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigLoader::new()
        .with_config_path(dir.path().join("nope.toml"))
        .with_env(env(&[]))
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
}

#[test]
fn malformed_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let bad_toml = write(dir.path(), "bad.toml", "[remote\nurl = 1");
    let err = ConfigLoader::new()
        .with_config_path(&bad_toml)
        .with_env(env(&[]))
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::Parse { .. }));

    let unknown_key =
        write(dir.path(), "unknown.toml", "[cache]\nsize = \"1GB\"\n");
    assert!(matches!(
        ConfigLoader::new()
            .with_config_path(&unknown_key)
            .with_env(env(&[]))
            .load(),
        Err(ConfigLoadError::Parse { .. })
    ));

    for (key, value) in [
        ("KEEPSAKE_REQUEST_TIMEOUT", "soon"),
        ("KEEPSAKE_CACHE_BUDGET", "lots"),
        ("KEEPSAKE_MEMORY_COUNT", "eight"),
        ("KEEPSAKE_REFETCH_FREQUENCY", "hourly"),
        ("KEEPSAKE_REMOTE_URL", "ftp://vault.example"),
    ] {
        let err = ConfigLoader::new()
            .with_env(env(&[(key, value)]))
            .with_search_dir(dir.path().join("empty"))
            .load()
            .unwrap_err();
        assert!(
            matches!(err, ConfigLoadError::InvalidValue { .. }),
            "{key}={value}: {err}"
        );
    }
}

#[test]
fn questionable_values_produce_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let load = ConfigLoader::new()
        .with_env(env(&[
            ("KEEPSAKE_OWNER", "alice"),
            ("KEEPSAKE_REMOTE_URL", "http://localhost:8080"),
            ("KEEPSAKE_PROBE_INTERVAL", "250ms"),
            ("KEEPSAKE_CACHE_BUDGET", "0B"),
        ]))
        .with_search_dir(dir.path())
        .load()
        .unwrap();

    assert!(load.warnings.contains("probe interval"));
    assert!(load.warnings.contains("Cache budget is 0"));
    assert!(!load.warnings.contains("No owner configured"));
}
