//! Reactive credential form state.

use crate::relay::ValueRelay;
use crate::validators::{is_valid_email, is_valid_password};
use tracing::debug;

/// Email/password form state with derived validity flags.
///
/// Each input sink recomputes the affected validity flags and the combined
/// `form_valid` flag atomically: every relay already holds its final value
/// before the first observer runs, so an observer reading the other flags
/// mid-callback always sees a consistent combination
/// (`form_valid == email_valid && password_valid`).
///
/// One form instance backs one screen; a fresh screen constructs a fresh,
/// empty form. Observers must not feed input back into the form from
/// inside a callback.
pub struct CredentialForm {
    /// Serializes sink calls so batched stores never interleave.
    update: std::sync::Mutex<()>,
    email: ValueRelay<String>,
    password: ValueRelay<String>,
    email_valid: ValueRelay<bool>,
    password_valid: ValueRelay<bool>,
    form_valid: ValueRelay<bool>,
}

impl CredentialForm {
    /// Create an empty form. All validity flags start false.
    pub fn new() -> Self {
        Self {
            update: std::sync::Mutex::new(()),
            email: ValueRelay::new(String::new()),
            password: ValueRelay::new(String::new()),
            email_valid: ValueRelay::new(false),
            password_valid: ValueRelay::new(false),
            form_valid: ValueRelay::new(false),
        }
    }

    /// Replace the email text and recompute validity.
    ///
    /// Input is taken as-is: no trimming, no truncation.
    pub fn set_email(&self, value: &str) {
        let _update = self.update.lock().unwrap();

        let text_changed = self.email.store(value.to_string());
        let valid = is_valid_email(value);
        let valid_changed = self.email_valid.store(valid);
        let form_changed = self.form_valid.store(valid && self.password_valid.get());

        if valid_changed || form_changed {
            debug!(
                email_valid = valid,
                form_valid = self.form_valid.get(),
                "Email validity recomputed"
            );
        }

        if text_changed {
            self.email.publish();
        }
        if valid_changed {
            self.email_valid.publish();
        }
        if form_changed {
            self.form_valid.publish();
        }
    }

    /// Replace the password text and recompute validity.
    pub fn set_password(&self, value: &str) {
        let _update = self.update.lock().unwrap();

        let text_changed = self.password.store(value.to_string());
        let valid = is_valid_password(value);
        let valid_changed = self.password_valid.store(valid);
        let form_changed = self.form_valid.store(valid && self.email_valid.get());

        if valid_changed || form_changed {
            debug!(
                password_valid = valid,
                form_valid = self.form_valid.get(),
                "Password validity recomputed"
            );
        }

        if text_changed {
            self.password.publish();
        }
        if valid_changed {
            self.password_valid.publish();
        }
        if form_changed {
            self.form_valid.publish();
        }
    }

    /// Raw email text relay.
    pub fn email(&self) -> &ValueRelay<String> {
        &self.email
    }

    /// Raw password text relay.
    pub fn password(&self) -> &ValueRelay<String> {
        &self.password
    }

    /// Email validity relay.
    pub fn email_valid(&self) -> &ValueRelay<bool> {
        &self.email_valid
    }

    /// Password validity relay.
    pub fn password_valid(&self) -> &ValueRelay<bool> {
        &self.password_valid
    }

    /// Combined submittable-form relay: `email_valid && password_valid`.
    pub fn form_valid(&self) -> &ValueRelay<bool> {
        &self.form_valid
    }
}

impl Default for CredentialForm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn starts_empty_and_invalid() {
        let form = CredentialForm::new();
        assert_eq!(form.email().get(), "");
        assert_eq!(form.password().get(), "");
        assert!(!form.email_valid().get());
        assert!(!form.password_valid().get());
        assert!(!form.form_valid().get());
    }

    #[test]
    fn valid_credentials_flip_all_flags() {
        let form = CredentialForm::new();
        form.set_email("a@b.com");
        form.set_password("abcdef");

        assert!(form.email_valid().get());
        assert!(form.password_valid().get());
        assert!(form.form_valid().get());
        assert_eq!(form.email().get(), "a@b.com");
    }

    #[test]
    fn form_valid_follows_both_flags() {
        let form = CredentialForm::new();

        form.set_email("a@b.com");
        assert!(!form.form_valid().get(), "password still empty");

        form.set_password("abcdef");
        assert!(form.form_valid().get());

        form.set_email("broken");
        assert!(!form.form_valid().get());

        form.set_email("a@b.com");
        assert!(form.form_valid().get());

        form.set_password("short");
        assert!(!form.form_valid().get());
    }

    #[test]
    fn observers_never_see_torn_flags() {
        let form = Arc::new(CredentialForm::new());
        let checks = Arc::new(AtomicUsize::new(0));

        // Every flag relay gets an observer that cross-reads the other
        // flags through the form while being notified.
        for relay in [form.email_valid(), form.password_valid(), form.form_valid()] {
            let form = form.clone();
            let checks = checks.clone();
            relay.subscribe(move |_| {
                let combined = form.email_valid().get() && form.password_valid().get();
                assert_eq!(form.form_valid().get(), combined);
                checks.fetch_add(1, Ordering::SeqCst);
            });
        }

        form.set_email("a@b.com");
        form.set_password("abcdef");
        form.set_email("broken");
        form.set_email("x@y.org");
        form.set_password("     ");
        form.set_password("longenough");

        assert!(checks.load(Ordering::SeqCst) > 6);
    }

    #[test]
    fn subscribe_replays_current_flags() {
        let form = CredentialForm::new();
        form.set_email("a@b.com");
        form.set_password("abcdef");

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        form.form_valid().subscribe(move |valid| sink.lock().unwrap().push(*valid));

        assert_eq!(*seen.lock().unwrap(), vec![true]);
    }

    #[test]
    fn unchanged_input_does_not_renotify() {
        let form = CredentialForm::new();
        let notifications = Arc::new(AtomicUsize::new(0));
        let count = notifications.clone();
        form.email().subscribe(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(notifications.load(Ordering::SeqCst), 1, "replay only");

        form.set_email("a@b.com");
        form.set_email("a@b.com");

        assert_eq!(notifications.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn long_input_is_kept_verbatim() {
        let form = CredentialForm::new();
        let long = "x".repeat(10_000);
        form.set_email(&long);
        assert_eq!(form.email().get(), long);
        assert!(!form.email_valid().get());
    }
}
