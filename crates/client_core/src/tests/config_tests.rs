use super::*;

#[test]
fn defaults_without_env() {
    let settings = ClientSettings::resolve(|_| None).expect("settings");
    assert_eq!(settings, ClientSettings::default());
    assert_eq!(settings.notice_ttl, Duration::from_secs(3));
}

#[test]
fn env_overrides_url_and_ttl() {
    let settings = ClientSettings::resolve(|key| match key {
        "CHAT_CURATOR_SERVER_URL" => Some("https://curator.example:9443".to_string()),
        "CHAT_CURATOR_NOTICE_TTL_MS" => Some("1500".to_string()),
        _ => None,
    })
    .expect("settings");
    assert_eq!(settings.server_url, "https://curator.example:9443");
    assert_eq!(settings.notice_ttl, Duration::from_millis(1500));
}

#[test]
fn invalid_values_are_validation_errors() {
    let bad_url = ClientSettings::resolve(|key| {
        (key == "CHAT_CURATOR_SERVER_URL").then(|| "not a url".to_string())
    })
    .expect("url is not checked while resolving");
    assert!(matches!(bad_url.validate(), Err(ClientError::Validation(_))));

    let bad_ttl = ClientSettings::resolve(|key| {
        (key == "CHAT_CURATOR_NOTICE_TTL_MS").then(|| "soon".to_string())
    });
    assert!(matches!(bad_ttl, Err(ClientError::Validation(_))));

    assert!(ClientSettings::default().with_server_url("::").is_err());
}

#[test]
fn bad_server_url_does_not_hide_other_settings() {
    let settings = ClientSettings::resolve(|key| match key {
        "CHAT_CURATOR_SERVER_URL" => Some("::".to_string()),
        "CHAT_CURATOR_NOTICE_TTL_MS" => Some("250".to_string()),
        _ => None,
    })
    .expect("settings");
    assert_eq!(settings.notice_ttl, Duration::from_millis(250));
    assert!(settings.validate().is_err());
}
