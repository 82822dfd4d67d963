use super::*;

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

fn temp_settings_file(contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("score_client_settings_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join(SETTINGS_FILE);
    fs::write(&path, contents).expect("write settings");
    path
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = load_settings_from(Path::new("/nonexistent/client.toml"), env_from(&[]));
    assert_eq!(settings, ClientSettings::default());
    assert_eq!(settings.poll_max_attempts, 10);
    assert_eq!(settings.poll_interval_ms, 3000);
}

#[test]
fn file_values_override_defaults() {
    let path = temp_settings_file(
        r#"
java_api_url = "https://java.example.test"
poll_max_attempts = 4
poll_interval_ms = "250"
"#,
    );

    let settings = load_settings_from(&path, env_from(&[]));
    assert_eq!(settings.java_api_url, "https://java.example.test");
    assert_eq!(settings.poll_max_attempts, 4);
    assert_eq!(settings.poll_interval_ms, 250);
    assert_eq!(settings.api_url, ClientSettings::default().api_url);

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn prefixed_env_wins_over_plain_env_and_file() {
    let path = temp_settings_file(r#"java_api_url = "https://file.example.test""#);

    let settings = load_settings_from(
        &path,
        env_from(&[
            ("JAVA_API_URL", "https://plain.example.test"),
            ("APP__JAVA_API_URL", "https://prefixed.example.test"),
            ("APP__REQUEST_TIMEOUT_SECS", "3"),
        ]),
    );
    assert_eq!(settings.java_api_url, "https://prefixed.example.test");
    assert_eq!(settings.request_timeout(), Duration::from_secs(3));

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn unparsable_numbers_are_ignored() {
    let settings = load_settings_from(
        Path::new("/nonexistent/client.toml"),
        env_from(&[("APP__POLL_MAX_ATTEMPTS", "many")]),
    );
    assert_eq!(settings.poll_max_attempts, DEFAULT_MAX_ATTEMPTS);
}

#[test]
fn zero_attempts_are_rejected_when_building_poll_config() {
    let settings = ClientSettings {
        poll_max_attempts: 0,
        ..ClientSettings::default()
    };
    assert_eq!(settings.poll_config().unwrap_err(), PollConfigError::ZeroAttempts);
}
