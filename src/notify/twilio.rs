//! Twilio SMS delivery
//!
//! Posts to the Messages resource of the Twilio REST API with HTTP basic
//! auth. Requests are blocking and bounded by the configured timeout.

use std::time::Duration;

use serde::Deserialize;

use super::Notifier;
use crate::config::SmsCredentials;
use crate::error::{HeartestError, Result};

/// Production API root
pub const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Receipt returned for an accepted message
#[derive(Debug, Deserialize)]
struct MessageReceipt {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

/// Error body returned for a rejected request
#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Notifier backed by the Twilio Messages API
pub struct TwilioNotifier {
    credentials: SmsCredentials,
    timeout: Duration,
    api_base: String,
}

impl std::fmt::Debug for TwilioNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // SmsCredentials redacts the auth token itself
        f.debug_struct("TwilioNotifier")
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl TwilioNotifier {
    pub fn new(credentials: SmsCredentials, timeout: Duration) -> Self {
        Self {
            credentials,
            timeout,
            api_base: TWILIO_API_BASE.to_string(),
        }
    }

    /// Point the notifier at another API root (a sandbox or local stub)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base, self.credentials.account_sid
        )
    }

    #[cfg(feature = "sms")]
    fn post_message(&self, to: &str, body: &str) -> Result<MessageReceipt> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| HeartestError::notification(format!("HTTP client setup failed: {}", e)))?;

        let form = [
            ("To", to),
            ("From", self.credentials.from_number.as_str()),
            ("Body", body),
        ];

        let response = client
            .post(self.messages_url())
            .basic_auth(
                &self.credentials.account_sid,
                Some(&self.credentials.auth_token),
            )
            .form(&form)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    HeartestError::notification(format!(
                        "SMS provider did not answer within {}s",
                        self.timeout.as_secs()
                    ))
                } else if e.is_connect() {
                    HeartestError::notification(format!(
                        "Cannot connect to SMS provider at {}: {}",
                        self.api_base, e
                    ))
                } else {
                    HeartestError::notification(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ProviderError>()
                .ok()
                .map(|err| match (err.code, err.message) {
                    (Some(code), Some(message)) => format!("{} (code {})", message, code),
                    (None, Some(message)) => message,
                    (Some(code), None) => format!("code {}", code),
                    (None, None) => String::new(),
                })
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "no details".to_string());
            return Err(HeartestError::notification(format!(
                "SMS provider returned {}: {}",
                status, detail
            )));
        }

        response
            .json::<MessageReceipt>()
            .map_err(|e| HeartestError::notification(format!("Invalid response from provider: {}", e)))
    }

    #[cfg(not(feature = "sms"))]
    fn post_message(&self, _to: &str, _body: &str) -> Result<MessageReceipt> {
        Err(HeartestError::notification(
            "SMS support not compiled. Build with --features sms",
        ))
    }
}

impl Notifier for TwilioNotifier {
    fn name(&self) -> &str {
        "twilio"
    }

    fn send(&self, to: &str, body: &str) -> Result<()> {
        let receipt = self.post_message(to, body)?;
        log::info!(
            "SMS accepted: sid={} status={}",
            receipt.sid,
            receipt.status.as_deref().unwrap_or("unknown")
        );
        Ok(())
    }
}
