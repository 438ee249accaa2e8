use std::io::Write;

use super::*;

const MINIMAL: &str = r#"
[jira]
site = "https://example.atlassian.net"
user = "bot@example.com"
password = "from-file"

[[sources]]
name = "gerrit.example.com"
"#;

fn write_settings(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    file.write_all(text.as_bytes()).expect("write settings");
    file.flush().expect("flush");
    file
}

#[test]
fn minimal_settings_get_defaults() {
    let file = write_settings(MINIMAL);
    let settings = Settings::load(file.path(), None).expect("valid settings");

    assert_eq!(settings.jira.password, "from-file");
    assert_eq!(settings.jira.request_timeout(), Duration::from_secs(30));
    assert!(!settings.jira.accept_invalid_certs);
    assert!(settings.handlers.change_merged);
    assert!(!settings.handlers.ref_updated);
    assert_eq!(settings.telemetry.otlp_endpoint, None);

    let source = &settings.sources[0];
    assert_eq!(source.ssh_destination(), "gerrit.example.com");
    assert_eq!(source.ssh_port, None);
    assert_eq!(source.rest_credentials(), None);
}

#[test]
fn full_settings_parse() {
    let settings = Settings::from_toml_str(
        r#"
[jira]
site = "https://jira.example.com"
user = "bot"
request_timeout_secs = 5
accept_invalid_certs = true

[[sources]]
name = "gerrit.example.com"
ssh_destination = "bot@gerrit.example.com"
ssh_port = 29418
rest_url = "https://gerrit.example.com"
rest_user = "bot"
rest_password = "token"

[[sources]]
name = "review.example.org"
rest_url = "https://review.example.org"

[handlers]
change_merged = true
ref_updated = true

[telemetry]
otlp_endpoint = "http://localhost:4317"
"#,
    )
    .expect("parses");

    settings.validate().expect("valid");
    assert_eq!(settings.jira.request_timeout(), Duration::from_secs(5));
    assert_eq!(settings.sources.len(), 2);
    assert_eq!(settings.sources[0].ssh_destination(), "bot@gerrit.example.com");
    assert_eq!(settings.sources[0].ssh_port, Some(29418));
    assert_eq!(
        settings.sources[0].rest_credentials(),
        Some(("bot".to_string(), "token".to_string()))
    );
    assert_eq!(
        settings.telemetry.otlp_endpoint.as_deref(),
        Some("http://localhost:4317")
    );
    assert!(settings.source("review.example.org").is_some());
    assert!(settings.source("unknown").is_none());
}

#[test]
fn password_override_wins_over_file() {
    let file = write_settings(MINIMAL);
    let settings =
        Settings::load(file.path(), Some("from-env".to_string())).expect("valid settings");
    assert_eq!(settings.jira.password, "from-env");
}

#[test]
fn empty_password_override_is_ignored() {
    let file = write_settings(MINIMAL);
    let settings = Settings::load(file.path(), Some(String::new())).expect("valid settings");
    assert_eq!(settings.jira.password, "from-file");
}

#[test]
fn settings_without_sources_are_rejected() {
    let settings = Settings::from_toml_str(
        r#"
[jira]
site = "https://example.atlassian.net"
user = "bot"
"#,
    )
    .expect("parses");

    assert!(matches!(settings.validate(), Err(ConfigError::NoSources)));
}

#[test]
fn duplicate_source_names_are_rejected() {
    let settings = Settings::from_toml_str(&format!(
        "{MINIMAL}\n[[sources]]\nname = \"gerrit.example.com\"\n"
    ))
    .expect("parses");

    assert!(matches!(
        settings.validate(),
        Err(ConfigError::DuplicateSource { name }) if name == "gerrit.example.com"
    ));
}

#[test]
fn blank_source_name_is_rejected() {
    let settings = Settings::from_toml_str(&format!("{MINIMAL}\n[[sources]]\nname = \"  \"\n"))
        .expect("parses");

    assert!(matches!(settings.validate(), Err(ConfigError::EmptySourceName)));
}

#[test]
fn ref_updated_requires_rest_url() {
    let settings = Settings::from_toml_str(&format!("{MINIMAL}\n[handlers]\nref_updated = true\n"))
        .expect("parses");

    assert!(matches!(
        settings.validate(),
        Err(ConfigError::MissingRestUrl { name }) if name == "gerrit.example.com"
    ));
}

#[test]
fn rest_user_without_password_is_rejected() {
    let settings = Settings::from_toml_str(&format!("{MINIMAL}rest_user = \"bot\"\n"))
        .expect("parses");

    assert!(matches!(
        settings.validate(),
        Err(ConfigError::PartialRestCredentials { name }) if name == "gerrit.example.com"
    ));
}

#[test]
fn rest_password_without_user_is_rejected() {
    let settings = Settings::from_toml_str(&format!("{MINIMAL}rest_password = \"token\"\n"))
        .expect("parses");

    assert!(matches!(
        settings.validate(),
        Err(ConfigError::PartialRestCredentials { .. })
    ));
}

#[test]
fn relative_jira_site_is_rejected() {
    let settings = Settings::from_toml_str(&MINIMAL.replace(
        "https://example.atlassian.net",
        "example.atlassian.net",
    ))
    .expect("parses");

    assert!(matches!(
        settings.validate(),
        Err(ConfigError::InvalidJiraSite { .. })
    ));
}

#[test]
fn unknown_keys_are_rejected() {
    let err = Settings::from_toml_str(&format!("{MINIMAL}\nshadow = true\n")).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = Settings::load(&dir.path().join("absent.toml"), None).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn debug_output_redacts_passwords() {
    let settings = Settings::from_toml_str(&format!(
        "{MINIMAL}\n[[sources]]\nname = \"other\"\nrest_user = \"bot\"\nrest_password = \"hunter2\"\n"
    ))
    .expect("parses");

    let rendered = format!("{settings:?}");
    assert!(!rendered.contains("from-file"));
    assert!(!rendered.contains("hunter2"));
}
