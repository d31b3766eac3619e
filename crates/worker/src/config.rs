use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use daysheet_records::hierarchy::DEFAULT_ROOT_NAME;

/// Which document store the worker talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process store; nothing survives a restart.
    Memory,
    /// Drive and Sheets.
    Google(GoogleCredentials),
}

/// How the worker authenticates against Google.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleCredentials {
    /// Service-account key file; tokens are refreshed before they expire.
    ServiceAccount(PathBuf),
    /// A bearer token obtained elsewhere. It is never refreshed.
    AccessToken(String),
}

/// Worker configuration loaded from environment variables.
///
/// Everything except the Google credentials has a default suitable for a
/// local run against the in-memory store.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name of the root container (default: `EMS_Root`).
    pub root_container_name: String,
    /// Employee directory JSON file (default: `users.json`).
    pub directory_path: PathBuf,
    pub store_backend: StoreBackend,
    /// Per-request store timeout (default: 30 seconds).
    pub store_timeout: Duration,
    /// Local time of the lock firing (default: `20:00`).
    pub lock_at: NaiveTime,
    /// Local time of the aggregate firing (default: `20:30`).
    pub aggregate_at: NaiveTime,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default      |
    /// |-----------------------|--------------|
    /// | `ROOT_CONTAINER_NAME` | `EMS_Root`   |
    /// | `DIRECTORY_PATH`      | `users.json` |
    /// | `STORE_BACKEND`       | `memory`     |
    /// | `GOOGLE_SERVICE_ACCOUNT_FILE` | (for `google`) |
    /// | `GOOGLE_ACCESS_TOKEN` | (for `google`, without a key file) |
    /// | `STORE_TIMEOUT_SECS`  | `30`         |
    /// | `LOCK_AT`             | `20:00`      |
    /// | `AGGREGATE_AT`        | `20:30`      |
    ///
    /// Panics on malformed values so a misconfigured worker fails at startup.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let root_container_name = var("ROOT_CONTAINER_NAME")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ROOT_NAME.into());

        let directory_path = PathBuf::from(var("DIRECTORY_PATH").unwrap_or_else(|| "users.json".into()));

        let store_backend = match var("STORE_BACKEND")
            .unwrap_or_else(|| "memory".into())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "google" => {
                let non_empty = |key: &str| var(key).filter(|s| !s.trim().is_empty());
                let credentials = match non_empty("GOOGLE_SERVICE_ACCOUNT_FILE") {
                    Some(path) => GoogleCredentials::ServiceAccount(PathBuf::from(path)),
                    None => GoogleCredentials::AccessToken(non_empty("GOOGLE_ACCESS_TOKEN").expect(
                        "GOOGLE_SERVICE_ACCOUNT_FILE or GOOGLE_ACCESS_TOKEN must be set when STORE_BACKEND=google",
                    )),
                };
                StoreBackend::Google(credentials)
            }
            other => panic!("STORE_BACKEND must be 'memory' or 'google', got '{other}'"),
        };

        let store_timeout_secs: u64 = var("STORE_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .expect("STORE_TIMEOUT_SECS must be a valid u64");

        let lock_at = parse_time(&var("LOCK_AT").unwrap_or_else(|| "20:00".into()))
            .expect("LOCK_AT must be a time of day like 20:00");
        let aggregate_at = parse_time(&var("AGGREGATE_AT").unwrap_or_else(|| "20:30".into()))
            .expect("AGGREGATE_AT must be a time of day like 20:30");

        Self {
            root_container_name,
            directory_path,
            store_backend,
            store_timeout: Duration::from_secs(store_timeout_secs),
            lock_at,
            aggregate_at,
        }
    }
}

/// `HH:MM` or `HH:MM:SS`.
fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> WorkerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]);
        assert_eq!(config.root_container_name, "EMS_Root");
        assert_eq!(config.directory_path, PathBuf::from("users.json"));
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.store_timeout, Duration::from_secs(30));
        assert_eq!(config.lock_at, NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        assert_eq!(config.aggregate_at, NaiveTime::from_hms_opt(20, 30, 0).unwrap());
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("ROOT_CONTAINER_NAME", "Staging_Root"),
            ("STORE_BACKEND", "Google"),
            ("GOOGLE_ACCESS_TOKEN", "ya29.token"),
            ("STORE_TIMEOUT_SECS", "5"),
            ("LOCK_AT", "19:45:30"),
            ("AGGREGATE_AT", " 21:00 "),
        ]);
        assert_eq!(config.root_container_name, "Staging_Root");
        assert_eq!(
            config.store_backend,
            StoreBackend::Google(GoogleCredentials::AccessToken("ya29.token".into()))
        );
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.lock_at, NaiveTime::from_hms_opt(19, 45, 30).unwrap());
        assert_eq!(config.aggregate_at, NaiveTime::from_hms_opt(21, 0, 0).unwrap());
    }

    #[test]
    fn service_account_file_wins_over_a_token() {
        let config = config(&[
            ("STORE_BACKEND", "google"),
            ("GOOGLE_SERVICE_ACCOUNT_FILE", "/etc/daysheet/key.json"),
            ("GOOGLE_ACCESS_TOKEN", "ya29.token"),
        ]);
        assert_eq!(
            config.store_backend,
            StoreBackend::Google(GoogleCredentials::ServiceAccount(PathBuf::from(
                "/etc/daysheet/key.json"
            )))
        );
    }

    #[test]
    #[should_panic(expected = "GOOGLE_ACCESS_TOKEN")]
    fn google_requires_a_token() {
        config(&[("STORE_BACKEND", "google")]);
    }

    #[test]
    #[should_panic(expected = "LOCK_AT")]
    fn malformed_time_fails_fast() {
        config(&[("LOCK_AT", "8pm")]);
    }
}
