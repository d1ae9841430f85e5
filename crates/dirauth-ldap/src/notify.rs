//! Success notifications.

use chrono::{DateTime, Datelike, Local, TimeZone};
use std::fmt::Display;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{info, warn};

const SOURCE: &str = "DirectoryAuthenticator::authenticate";

/// Receives one message per successful login.
pub trait LoginNotifier: Send + Sync {
    /// Handles a login message. Failures are logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Implementations may fail for any reason; the login still succeeds.
    fn notify(&self, message: &str) -> anyhow::Result<()>;
}

/// Logs login messages at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl LoginNotifier for TracingNotifier {
    fn notify(&self, message: &str) -> anyhow::Result<()> {
        info!(target: "dirauth::login", "{message}");
        Ok(())
    }
}

/// Adapts a closure into a [`LoginNotifier`].
pub struct FnNotifier<F>(F);

impl<F> FnNotifier<F>
where
    F: Fn(&str) -> anyhow::Result<()> + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> LoginNotifier for FnNotifier<F>
where
    F: Fn(&str) -> anyhow::Result<()> + Send + Sync,
{
    fn notify(&self, message: &str) -> anyhow::Result<()> {
        (self.0)(message)
    }
}

/// Builds the message for a successful login of `username` at `at`.
pub fn login_message<Tz>(username: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{SOURCE}: User '{username}' logged in on {}",
        format_login_time(at)
    )
}

/// Formats a timestamp as `Friday, March 1st 2024 09:05:07 AM`.
pub fn format_login_time<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let day = at.day();
    format!(
        "{} {day}{} {}",
        at.format("%A, %B"),
        ordinal_suffix(day),
        at.format("%Y %H:%M:%S %p")
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Delivers a login message, containing errors and panics so they cannot undo the login.
pub(crate) fn deliver(notifier: Option<&Arc<dyn LoginNotifier>>, username: &str) {
    let Some(notifier) = notifier else {
        return;
    };

    let message = login_message(username, &Local::now());
    match catch_unwind(AssertUnwindSafe(|| notifier.notify(&message))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!("login notifier failed: {err:#}"),
        Err(_) => warn!("login notifier panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    #[test]
    fn formats_time_like_a_calendar() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(format_login_time(&at), "Friday, March 1st 2024 09:05:07 AM");

        let at = Utc.with_ymd_and_hms(2024, 3, 12, 17, 0, 0).unwrap();
        assert_eq!(format_login_time(&at), "Tuesday, March 12th 2024 17:00:00 PM");
    }

    #[test]
    fn ordinal_suffixes() {
        let cases = [(1, "st"), (2, "nd"), (3, "rd"), (4, "th"), (11, "th"), (13, "th")];
        for (day, suffix) in cases {
            assert_eq!(ordinal_suffix(day), suffix, "day {day}");
        }
        assert_eq!(ordinal_suffix(22), "nd");
        assert_eq!(ordinal_suffix(31), "st");
    }

    #[test]
    fn message_names_user_and_source() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(
            login_message("JDoe", &at),
            "DirectoryAuthenticator::authenticate: User 'JDoe' logged in on \
             Friday, March 1st 2024 09:05:07 AM"
        );
    }

    #[test]
    fn deliver_calls_notifier_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let notifier: Arc<dyn LoginNotifier> = Arc::new(FnNotifier::new(move |msg: &str| {
            sink.lock().unwrap().push(msg.to_string());
            Ok(())
        }));

        deliver(Some(&notifier), "JDoe");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("User 'JDoe' logged in on "));
    }

    #[test]
    fn deliver_contains_errors_and_panics() {
        let failing: Arc<dyn LoginNotifier> =
            Arc::new(FnNotifier::new(|_: &str| Err(anyhow::anyhow!("smtp down"))));
        deliver(Some(&failing), "jdoe");

        let panicking: Arc<dyn LoginNotifier> =
            Arc::new(FnNotifier::new(|_: &str| -> anyhow::Result<()> { panic!("boom") }));
        deliver(Some(&panicking), "jdoe");

        deliver(None, "jdoe");
    }
}
