//! Environment overrides are validated even when no config file exists.
//! Kept in its own test binary since it mutates process environment.

use krdash::config::Config;
use tempfile::TempDir;

#[test]
fn test_invalid_env_overrides_never_reach_the_app() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");

    // SAFETY: the only test in this binary, nothing reads the environment concurrently
    unsafe {
        std::env::set_var("KRDASH_POLL_SIGNALS_SECS", "0");
        std::env::set_var("KRDASH_API_BASE_URL", "localhost:5001/api/kr");
    }

    let config = Config::load_or_default(&missing);
    assert!(config.validate().is_ok());
    assert_eq!(config.poll.signals_secs, 300);
    assert!(config.api.base_url.starts_with("http://"));

    // a readable file with the same bad overrides lands in the same place
    let file = dir.path().join("krdash.toml");
    Config::default().save_to_file(&file).unwrap();
    let config = Config::load_or_default(&file);
    assert!(config.validate().is_ok());
    assert_eq!(config.poll.signals_secs, 300);

    unsafe {
        std::env::set_var("KRDASH_POLL_SIGNALS_SECS", "45");
        std::env::remove_var("KRDASH_API_BASE_URL");
    }
    assert_eq!(Config::load_or_default(&missing).poll.signals_secs, 45);
}
