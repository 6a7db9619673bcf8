//! Case notifications
//!
//! Sends a plain-text case summary to a phone number through a messaging
//! provider. Any provider failure comes back as `NotificationError`; the
//! caller reports it and carries on.

mod mock;
mod twilio;

pub use mock::RecordingNotifier;
pub use twilio::{TwilioNotifier, TWILIO_API_BASE};

use crate::error::{HeartestError, Result};
use crate::records::CaseRecord;

/// Fewest digits accepted in a destination number
const MIN_DIGITS: usize = 8;
/// Most digits allowed by E.164
const MAX_DIGITS: usize = 15;

/// Outbound text message delivery
pub trait Notifier {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Send `body` to the number `to`
    ///
    /// # Errors
    /// * `NotificationError` - On any delivery failure
    fn send(&self, to: &str, body: &str) -> Result<()>;
}

/// Normalize a destination number to `+<digits>`
///
/// Spaces, dashes, dots and parentheses are dropped. The number must start
/// with `+` and carry 8 to 15 digits.
pub fn normalize_address(to: &str) -> Result<String> {
    let compact: String = to
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    let digits = compact.strip_prefix('+').unwrap_or("");
    let valid = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && (MIN_DIGITS..=MAX_DIGITS).contains(&digits.len());

    if !valid {
        return Err(HeartestError::notification(format!(
            "'{}' is not a phone number in international format (e.g. +15558675309)",
            to
        )));
    }
    Ok(compact)
}

/// Text sent for a saved case
pub fn case_summary(record: &CaseRecord) -> String {
    let gender = record
        .gender
        .map(|g| g.to_string())
        .unwrap_or_else(|| "Unspecified".to_string());

    let mut message = format!(
        "\u{1FA7A} PCG Case Summary\nName: {}\nAge: {}\nGender: {}\nDate: {}",
        record.name,
        record.age,
        gender,
        record.date_string()
    );
    if let Some(bmi) = record.bmi {
        message.push_str(&format!("\nBMI: {:.2}", bmi));
    }
    message.push_str(&format!("\nNotes: {}", record.notes));
    message
}

/// Send the summary of a case, validating the number first
pub fn send_case_summary(notifier: &dyn Notifier, to: &str, record: &CaseRecord) -> Result<()> {
    let to = normalize_address(to)?;
    let body = case_summary(record);

    log::info!("Sending case summary for {} via {}", record.name, notifier.name());
    notifier.send(&to, &body).map_err(|e| match e {
        HeartestError::NotificationError { .. } => e,
        other => HeartestError::notification(other.to_string()),
    })
}
