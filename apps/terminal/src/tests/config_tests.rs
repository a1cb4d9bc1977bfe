use super::*;

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_config(contents: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("marketmind_config_test_{suffix}.toml"));
    fs::write(&path, contents).expect("write config");
    path
}

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_point_at_local_backend() {
    let settings = Settings::default();
    assert_eq!(settings.api_url, "http://127.0.0.1:5001");
    assert_eq!(settings.request_timeout, Duration::from_secs(15));
    assert_eq!(settings.poll_interval, Duration::from_secs(30));
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        "api_url = \"https://markets.example.com\"\npoll_interval_secs = 5\n",
    )
    .expect("parse");

    assert_eq!(settings.api_url, "https://markets.example.com");
    assert_eq!(settings.poll_interval, Duration::from_secs(5));
    assert_eq!(settings.request_timeout, Duration::from_secs(15));
}

#[test]
fn zero_request_timeout_is_raised_to_one_second() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "request_timeout_secs = 0").expect("parse");
    assert_eq!(settings.request_timeout, Duration::from_secs(1));
}

#[test]
fn app_prefixed_env_wins_over_plain_name() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        lookup(&[
            ("MARKETMIND_API_URL", "http://plain:1"),
            ("APP__API_URL", "http://prefixed:2"),
        ]),
    );
    assert_eq!(settings.api_url, "http://prefixed:2");
}

#[test]
fn unparsable_env_numbers_are_ignored() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        lookup(&[
            ("APP__REQUEST_TIMEOUT_SECS", "soon"),
            ("APP__POLL_INTERVAL_SECS", " 10 "),
        ]),
    );
    assert_eq!(settings.request_timeout, Duration::from_secs(15));
    assert_eq!(settings.poll_interval, Duration::from_secs(10));
}

#[test]
fn cli_overrides_win() {
    let mut settings = Settings::default();
    apply_overrides(&mut settings, Some(" http://10.0.0.2:5001 "), Some(2));
    assert_eq!(settings.api_url, "http://10.0.0.2:5001");
    assert_eq!(settings.poll_interval, Duration::from_secs(2));
}

#[test]
fn explicit_config_file_is_loaded() {
    let path = temp_config("request_timeout_secs = 40\n");

    let settings = load_settings(Some(&path)).expect("load");
    assert_eq!(settings.request_timeout, Duration::from_secs(40));

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn malformed_config_file_is_reported() {
    let path = temp_config("api_url = [not toml");

    let err = load_settings(Some(&path)).expect_err("should fail");
    assert!(format!("{err:#}").contains("failed to parse config file"));

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn missing_explicit_config_file_is_an_error() {
    let path = env::temp_dir().join("marketmind_definitely_missing.toml");
    let err = load_settings(Some(&path)).expect_err("should fail");
    assert!(format!("{err:#}").contains("failed to read config file"));
}

#[test]
fn api_url_must_be_http() {
    assert!(validate_api_url("http://127.0.0.1:5001").is_ok());
    assert!(validate_api_url("https://api.example.com/").is_ok());

    let err = validate_api_url("ftp://files.example.com").expect_err("scheme");
    assert!(err.to_string().contains("unsupported scheme 'ftp'"));

    let err = validate_api_url("not a url").expect_err("parse");
    assert!(err.to_string().contains("invalid API base url"));
}
