use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with all required env vars populated with valid defaults.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("VITRINA_BACKEND_URL", "https://api.tienda.test/v1");
    m
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "VITRINA_ENV"));
}

#[test]
fn build_app_config_fails_without_backend_url() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "VITRINA_BACKEND_URL"),
        "expected MissingEnvVar(VITRINA_BACKEND_URL), got: {result:?}"
    );
}

#[test]
fn build_app_config_treats_blank_backend_url_as_missing() {
    let mut map = HashMap::new();
    map.insert("VITRINA_BACKEND_URL", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
}

#[test]
fn build_app_config_rejects_unparseable_backend_url() {
    let mut map = HashMap::new();
    map.insert("VITRINA_BACKEND_URL", "not a url");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "VITRINA_BACKEND_URL"),
        "expected InvalidEnvVar(VITRINA_BACKEND_URL), got: {result:?}"
    );
}

#[test]
fn build_app_config_succeeds_with_defaults() {
    let map = full_env();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.backend_url, "https://api.tienda.test/v1");
    assert!(cfg.backend_token.is_none());
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.app_origin, "http://localhost:3000");
    assert_eq!(cfg.fallback_image, "/images/no-image.png");
    assert_eq!(cfg.currency_code, "COP");
    assert_eq!(cfg.cart_dir.to_str(), Some("./.vitrina"));
    assert_eq!(cfg.cart_key, "vitrina.cart");
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.user_agent, "vitrina/0.1");
    assert_eq!(cfg.max_retries, 3);
    assert_eq!(cfg.retry_backoff_base_secs, 1);
}

#[test]
fn build_app_config_reads_overrides() {
    let mut map = full_env();
    map.insert("VITRINA_ENV", "production");
    map.insert("VITRINA_CURRENCY_CODE", "USD");
    map.insert("VITRINA_APP_ORIGIN", "https://tienda.test");
    map.insert("VITRINA_MAX_RETRIES", "0");
    map.insert("VITRINA_BACKEND_TOKEN", "s3cret");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Production);
    assert_eq!(cfg.currency_code, "USD");
    assert_eq!(cfg.app_origin, "https://tienda.test");
    assert_eq!(cfg.max_retries, 0);
    assert_eq!(cfg.backend_token.as_deref(), Some("s3cret"));
}

#[test]
fn build_app_config_rejects_invalid_timeout() {
    let mut map = full_env();
    map.insert("VITRINA_REQUEST_TIMEOUT_SECS", "soon");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "VITRINA_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(VITRINA_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_alphabetic_currency() {
    let mut map = full_env();
    map.insert("VITRINA_CURRENCY_CODE", "$$");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "VITRINA_CURRENCY_CODE"),
        "expected InvalidEnvVar(VITRINA_CURRENCY_CODE), got: {result:?}"
    );
}

#[test]
fn debug_output_redacts_backend_token() {
    let mut map = full_env();
    map.insert("VITRINA_BACKEND_TOKEN", "s3cret");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("s3cret"));
    assert!(rendered.contains("[redacted]"));
}
