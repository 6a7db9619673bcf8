//! Runtime configuration
//!
//! Everything comes from the environment at startup. Provider credentials
//! are never compiled in.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{HeartestError, Result};

/// Default upload directory
pub const DEFAULT_UPLOAD_DIR: &str = "uploaded_audios";

/// Default case log file
pub const DEFAULT_STORE_PATH: &str = "patient_data.json";

/// Default timeout for the SMS provider call
pub const DEFAULT_SMS_TIMEOUT_SECS: u64 = 10;

/// Credentials for the Twilio messaging API
#[derive(Clone, PartialEq)]
pub struct SmsCredentials {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number registered with the provider
    pub from_number: String,
}

impl std::fmt::Debug for SmsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsCredentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .finish()
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub upload_dir: PathBuf,
    pub store_path: PathBuf,
    pub sms_timeout: Duration,
    /// Present only when all three Twilio variables are set
    pub sms: Option<SmsCredentials>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            sms_timeout: Duration::from_secs(DEFAULT_SMS_TIMEOUT_SECS),
            sms: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment
    ///
    /// - `HEARTEST_UPLOAD_DIR` (default `uploaded_audios`)
    /// - `HEARTEST_STORE` (default `patient_data.json`)
    /// - `HEARTEST_SMS_TIMEOUT_SECS` (default 10)
    /// - `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `TWILIO_FROM_NUMBER`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let upload_dir = get("HEARTEST_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR));
        let store_path = get("HEARTEST_STORE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));

        let sms_timeout = match get("HEARTEST_SMS_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| HeartestError::Config {
                    reason: format!("HEARTEST_SMS_TIMEOUT_SECS must be whole seconds, got '{}'", raw),
                })?;
                if secs == 0 {
                    return Err(HeartestError::Config {
                        reason: "HEARTEST_SMS_TIMEOUT_SECS must be at least 1".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_SMS_TIMEOUT_SECS),
        };

        let sms = match (
            get("TWILIO_ACCOUNT_SID"),
            get("TWILIO_AUTH_TOKEN"),
            get("TWILIO_FROM_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(SmsCredentials {
                account_sid,
                auth_token,
                from_number,
            }),
            (None, None, None) => None,
            _ => {
                log::warn!("Twilio credentials are only partially set; SMS is disabled");
                None
            }
        };

        Ok(Self {
            upload_dir,
            store_path,
            sms_timeout,
            sms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.sms.is_none());
    }

    #[test]
    fn test_overrides_and_credentials() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HEARTEST_UPLOAD_DIR", "/data/audio"),
            ("HEARTEST_STORE", "/data/cases.json"),
            ("HEARTEST_SMS_TIMEOUT_SECS", "5"),
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("TWILIO_FROM_NUMBER", "+15550001111"),
        ]))
        .unwrap();

        assert_eq!(config.upload_dir, PathBuf::from("/data/audio"));
        assert_eq!(config.store_path, PathBuf::from("/data/cases.json"));
        assert_eq!(config.sms_timeout, Duration::from_secs(5));

        let sms = config.sms.unwrap();
        assert_eq!(sms.account_sid, "AC123");
        assert!(!format!("{:?}", sms).contains("secret"));
    }

    #[test]
    fn test_partial_credentials_disable_sms() {
        let config =
            AppConfig::from_lookup(lookup(&[("TWILIO_ACCOUNT_SID", "AC123")])).unwrap();
        assert!(config.sms.is_none());
    }

    #[test]
    fn test_bad_timeout() {
        assert!(AppConfig::from_lookup(lookup(&[("HEARTEST_SMS_TIMEOUT_SECS", "soon")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("HEARTEST_SMS_TIMEOUT_SECS", "0")])).is_err());
    }
}
