// tests/config_env.rs
use std::{env, fs};

use forex_scraper::config::{
    load_sources, AppConfig, ENV_APP_ID, ENV_APP_SECRET, ENV_PORT, ENV_SOURCES_PATH,
    ENV_SPREADSHEET_TOKEN,
};
use forex_scraper::error::ConfigError;

fn clear_env() {
    for k in [
        ENV_APP_ID,
        ENV_APP_SECRET,
        ENV_SPREADSHEET_TOKEN,
        ENV_PORT,
        ENV_SOURCES_PATH,
    ] {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn missing_credentials_fail_before_anything_else() {
    clear_env();
    env::set_var(ENV_APP_ID, "cli_a1");
    let err = AppConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::Missing(ENV_APP_SECRET)), "{err}");
    clear_env();
}

#[serial_test::serial]
#[test]
fn env_sources_path_wins_over_builtin_table() {
    clear_env();
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("sources.toml");
    fs::write(
        &p,
        r#"
        [[sources]]
        name = "BCA"
        url = "https://example.test/kurs"
        selector = "table tbody tr"
        currency_match = "contains"
        number_locale = "dot_thousands_comma_decimal"
        sheet_column = 9
        "#,
    )
    .unwrap();

    env::set_var(ENV_APP_ID, "cli_a1");
    env::set_var(ENV_APP_SECRET, "s3cret");
    env::set_var(ENV_SPREADSHEET_TOKEN, "KUNHs3");
    env::set_var(ENV_PORT, "9090");
    env::set_var(ENV_SOURCES_PATH, p.display().to_string());

    let cfg = AppConfig::from_env().expect("config loads");
    assert_eq!(cfg.port, 9090);
    assert_eq!(cfg.sources.len(), 1);
    assert_eq!(cfg.sources[0].sheet_column, 9);
    clear_env();
}

#[serial_test::serial]
#[test]
fn fallbacks_without_sources_file() {
    // Isolate CWD in a temp dir so the repo's config/ is not picked up
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    let builtin = load_sources(None).unwrap();
    assert_eq!(
        builtin.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        vec!["CIMB", "BCA"]
    );

    let missing = load_sources(Some(tmp.path().join("nope.toml")));
    assert!(matches!(missing, Err(ConfigError::Invalid(_))));

    fs::create_dir_all("config").unwrap();
    fs::write("config/sources.toml", "sources = 3").unwrap();
    assert!(matches!(load_sources(None), Err(ConfigError::Parse { .. })));

    env::set_current_dir(&old).unwrap();
}
