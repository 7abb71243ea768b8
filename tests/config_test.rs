//! Tests for config loading

use handin::config::Config;
use handin::logging::LogMode;
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

const ENV_VARS: &[&str] = &[
    "HANDIN_SELLER_IDS",
    "HANDIN_LOG_MODE",
    "HANDIN_SCHEDULE_TIMES",
    "HANDIN_PORT",
    "CHANNELDOCK_API_KEY",
    "CHANNELDOCK_PAGE_SIZE",
    "DHL_EMAIL",
    "DHL_PASSWORD",
    "DHL_RECEIPT_EMAIL",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_toml_file() {
    let file = write_config(
        r#"
[channeldock]
api_key = "key"
api_secret = "secret"
page_size = 25

[carrier]
email = "ops@example.com"
password = "pw"
receipt_email = "receipts@example.com"

[workflow]
seller_ids = [3477, 1673]

[schedule]
times = ["08:30", "17:00"]

[logging]
mode = "quiet"
"#,
    );

    let config = Config::load(Some(file.path())).unwrap();

    assert_eq!(config.channeldock.page_size, 25);
    assert_eq!(config.channeldock.max_pages, 100);
    assert_eq!(config.workflow.seller_ids, vec![3477, 1673]);
    assert_eq!(config.carrier.contact_email(), "receipts@example.com");
    assert_eq!(config.carrier.scan_path, "servicepoint-api/customer/hand-in/validate");
    assert_eq!(config.schedule.times.len(), 2);
    assert_eq!(config.logging.mode, LogMode::Quiet);
    assert!(config.missing_secrets().is_empty());
}

#[test]
fn test_invalid_file_is_rejected() {
    let file = write_config("[workflow]\nseller_ids = []\n");
    assert!(Config::load(Some(file.path())).is_err());

    let file = write_config("[schedule]\ntimes = [\"late\"]\n");
    assert!(Config::load(Some(file.path())).is_err());

    let file = write_config("not toml at all = = =");
    assert!(Config::load(Some(file.path())).is_err());
}

#[test]
fn test_missing_file() {
    let err = Config::load(Some(std::path::Path::new("/nonexistent/handin.toml"))).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read config file"));
}

#[test]
#[serial]
fn test_from_env() {
    clear_env();
    std::env::set_var("HANDIN_SELLER_IDS", "3477, 1673");
    std::env::set_var("HANDIN_LOG_MODE", "0");
    std::env::set_var("HANDIN_SCHEDULE_TIMES", "07:00,19:30");
    std::env::set_var("HANDIN_PORT", "9090");
    std::env::set_var("CHANNELDOCK_PAGE_SIZE", "50");
    std::env::set_var("DHL_EMAIL", "ops@example.com");

    let config = Config::load(None).unwrap();

    assert_eq!(config.workflow.seller_ids, vec![3477, 1673]);
    assert_eq!(config.logging.mode, LogMode::Quiet);
    assert_eq!(config.schedule.times, vec!["07:00", "19:30"]);
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.channeldock.page_size, 50);
    assert_eq!(config.carrier.contact_email(), "ops@example.com");
    assert!(config.missing_secrets().contains(&"DHL_PASSWORD"));

    clear_env();
}

#[test]
#[serial]
fn test_from_env_rejects_bad_values() {
    clear_env();
    std::env::set_var("HANDIN_SELLER_IDS", "3477,abc");
    assert!(Config::from_env().is_err());

    clear_env();
    std::env::set_var("HANDIN_LOG_MODE", "loud");
    assert!(Config::from_env().is_err());

    clear_env();
}

#[test]
#[serial]
fn test_unset_seller_ids_rejected() {
    clear_env();
    std::env::set_var("DHL_EMAIL", "ops@example.com");

    let err = Config::load(None).unwrap_err();
    assert!(format!("{err:#}").contains("seller_ids"));

    clear_env();
}
