use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use corepool::config::{Config, DEFAULT_MONITOR_INTERVAL, DEFAULT_QUEUE_CAPACITY};
use corepool::{EngineConfig, Error};

// Env vars are process-global; tests touching them take this lock.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const ENV_KEYS: &[&str] = &[
    "COREPOOL_MAX_WORKERS",
    "COREPOOL_INITIAL_WORKERS",
    "COREPOOL_QUEUE_CAPACITY",
    "COREPOOL_TASK_DEADLINE_MS",
    "COREPOOL_MONITOR_INTERVAL_MS",
    "COREPOOL_PIN_WORKERS",
    "OTEL_ENDPOINT",
    "LOG_LEVEL",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe {
            std::env::remove_var(key);
        }
    }
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[test]
fn defaults_are_valid() {
    let config = EngineConfig::default();
    config.validate().unwrap();
    assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    assert_eq!(config.monitor_interval, DEFAULT_MONITOR_INTERVAL);
    assert!(config.initial_workers >= 1);
    assert!(config.initial_workers <= config.max_workers);
    assert!(config.task_deadline.is_none());
}

#[test]
fn new_caps_initial_workers_at_max() {
    let config = EngineConfig::new(1, 4);
    assert_eq!(config.initial_workers, 1);
    config.validate().unwrap();
}

#[test]
fn validate_rejects_out_of_range_values() {
    assert!(EngineConfig::new(0, 4).validate().is_err());
    assert!(EngineConfig::new(4, 0).validate().is_err());
    assert!(EngineConfig::new(4, 4).initial_workers(0).validate().is_err());
    assert!(EngineConfig::new(4, 4).initial_workers(5).validate().is_err());
    assert!(
        EngineConfig::new(4, 4)
            .monitor_interval(Duration::ZERO)
            .validate()
            .is_err()
    );
    assert!(
        EngineConfig::new(4, 4)
            .task_deadline(Duration::ZERO)
            .validate()
            .is_err()
    );
    assert!(EngineConfig::new(4, 4).initial_workers(4).validate().is_ok());
}

#[test]
fn load_reads_engine_table_and_ignores_unknown_keys() {
    let file = write_config(
        r#"
        [engine]
        max_workers = 12
        initial_workers = 3
        queue_capacity = 64
        task_deadline_ms = 1500
        monitor_interval_ms = 250
        pin_workers = false
        compression = "gzip"

        [archive]
        root = "/var/backups"
        "#,
    );

    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.max_workers, 12);
    assert_eq!(config.initial_workers, 3);
    assert_eq!(config.queue_capacity, 64);
    assert_eq!(config.task_deadline, Some(Duration::from_millis(1500)));
    assert_eq!(config.monitor_interval, Duration::from_millis(250));
    assert!(!config.pin_workers);
}

#[test]
fn load_lowered_max_caps_default_initial_workers() {
    let file = write_config("[engine]\nmax_workers = 1\n");
    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.max_workers, 1);
    assert_eq!(config.initial_workers, 1);
}

#[test]
fn load_rejects_malformed_values() {
    let file = write_config("[engine]\nmax_workers = \"many\"\n");
    assert!(matches!(
        EngineConfig::load(file.path()),
        Err(Error::Config(_))
    ));

    let file = write_config("[engine]\nmax_workers = -2\n");
    assert!(EngineConfig::load(file.path()).is_err());
}

#[test]
fn load_rejects_inconsistent_bounds() {
    let file = write_config("[engine]\nmax_workers = 2\ninitial_workers = 5\n");
    assert!(matches!(
        EngineConfig::load(file.path()),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn load_missing_file_is_a_config_error() {
    let result = EngineConfig::load(std::path::Path::new("/nonexistent/corepool.toml"));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn to_toml_round_trips_through_load() {
    let config = EngineConfig::new(6, 32)
        .initial_workers(2)
        .task_deadline(Duration::from_millis(900))
        .pin_workers(false);

    let file = write_config(&config.to_toml().unwrap());
    assert_eq!(EngineConfig::load(file.path()).unwrap(), config);
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

#[test]
fn config_from_env_uses_defaults_when_unset() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env();

    let config = Config::from_env().unwrap();
    assert_eq!(config.engine, EngineConfig::default());
    assert_eq!(config.log_level, "info");
    assert!(config.otel_endpoint.is_none());
}

#[test]
fn config_env_overrides_file() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env();
    let file = write_config("[engine]\nmax_workers = 8\ninitial_workers = 2\nqueue_capacity = 16\n");

    unsafe {
        std::env::set_var("COREPOOL_QUEUE_CAPACITY", "128");
        std::env::set_var("COREPOOL_PIN_WORKERS", "false");
        std::env::set_var("LOG_LEVEL", "corepool=debug");
    }

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.engine.max_workers, 8);
    assert_eq!(config.engine.initial_workers, 2);
    assert_eq!(config.engine.queue_capacity, 128);
    assert!(!config.engine.pin_workers);
    assert_eq!(config.log_level, "corepool=debug");

    clear_env();
}

#[test]
fn config_from_env_rejects_malformed_and_empty_values() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env();

    unsafe {
        std::env::set_var("COREPOOL_MAX_WORKERS", "lots");
    }
    assert!(matches!(Config::from_env(), Err(Error::Config(_))));

    unsafe {
        std::env::set_var("COREPOOL_MAX_WORKERS", "   ");
    }
    assert!(matches!(Config::from_env(), Err(Error::Config(_))));

    unsafe {
        std::env::set_var("COREPOOL_MAX_WORKERS", "0");
    }
    assert!(matches!(Config::from_env(), Err(Error::InvalidConfig(_))));

    clear_env();
}
