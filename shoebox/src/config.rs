//! Process configuration loaded from environment variables.
//!
//! | Variable                          | Default   | Description                          |
//! |-----------------------------------|-----------|--------------------------------------|
//! | `SHOEBOX_TABLE_NAME`              | required  | Record table name                    |
//! | `SHOEBOX_REGION`                  | required  | Service region                       |
//! | `SHOEBOX_MAIL_FROM`               | required  | Notification sender address          |
//! | `SHOEBOX_MAIL_TO`                 | required  | Notification recipient address       |
//! | `SHOEBOX_BATCH_SIZE`              | `5`       | Create queue batch size              |
//! | `SHOEBOX_BATCH_WINDOW_SECS`       | `10`      | Create queue batching window         |
//! | `SHOEBOX_VISIBILITY_TIMEOUT_SECS` | `30`      | Create queue visibility timeout      |
//! | `SHOEBOX_MAX_RECEIVE_COUNT`       | `1`       | Failed deliveries before redrive     |
//! | `SHOEBOX_DLQ_RETENTION_SECS`      | `1800`    | Dead-letter retention                |
//! | `SHOEBOX_HANDLER_TIMEOUT_SECS`    | `15`      | Record handler budget                |
//! | `SHOEBOX_NOTIFY_TIMEOUT_SECS`     | `3`       | Mail handler budget                  |
//! | `SHOEBOX_DIRECT_ATTEMPTS`         | `3`       | Attempts for direct subscriptions    |
//! | `SHOEBOX_FAILURE_POLICY`          | `uniform` | `uniform` or `dead-letter-permanent` |
//! | `SHOEBOX_LOG`                     | `info`    | Tracing filter, else `RUST_LOG`      |
//!
//! A missing required value or an unparseable one is fatal at startup.

use crate::handlers::MailSettings;
use shoebox_core::ConfigError;
use shoebox_std::FailurePolicy;
use std::{str::FromStr, time::Duration};

/// Runtime configuration for a pipeline process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Record table name.
    pub table_name: String,
    /// Service region.
    pub region: String,
    /// Notification sender and recipient.
    pub mail: MailSettings,
    /// Create queue batch size.
    pub batch_size: usize,
    /// Create queue batching window.
    pub batch_window: Duration,
    /// Create queue visibility timeout.
    pub visibility_timeout: Duration,
    /// Failed deliveries tolerated before a message is dead-lettered.
    pub max_receive_count: u32,
    /// How long dead letters are kept.
    pub dead_letter_retention: Duration,
    /// Budget of record handler invocations.
    pub handler_timeout: Duration,
    /// Budget of mail handler invocations.
    pub notify_timeout: Duration,
    /// Attempts per event on direct subscriptions.
    pub direct_attempts: u32,
    /// How queue failures are classified.
    pub failure_policy: FailurePolicy,
    /// Tracing filter directive.
    pub log_filter: String,
}

impl Config {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        Ok(Self {
            table_name: env.required("SHOEBOX_TABLE_NAME")?,
            region: env.required("SHOEBOX_REGION")?,
            mail: MailSettings::new(
                env.required("SHOEBOX_MAIL_FROM")?,
                env.required("SHOEBOX_MAIL_TO")?,
            ),
            batch_size: env.positive("SHOEBOX_BATCH_SIZE", 5)?,
            batch_window: env.secs("SHOEBOX_BATCH_WINDOW_SECS", 10)?,
            visibility_timeout: env.secs("SHOEBOX_VISIBILITY_TIMEOUT_SECS", 30)?,
            max_receive_count: env.parse("SHOEBOX_MAX_RECEIVE_COUNT", 1)?,
            dead_letter_retention: env.secs("SHOEBOX_DLQ_RETENTION_SECS", 1800)?,
            handler_timeout: env.secs("SHOEBOX_HANDLER_TIMEOUT_SECS", 15)?,
            notify_timeout: env.secs("SHOEBOX_NOTIFY_TIMEOUT_SECS", 3)?,
            direct_attempts: env.positive("SHOEBOX_DIRECT_ATTEMPTS", 3)?,
            failure_policy: env.parse("SHOEBOX_FAILURE_POLICY", FailurePolicy::Uniform)?,
            log_filter: env
                .optional("SHOEBOX_LOG")
                .or_else(|| env.optional("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: format!("`{raw}`: {e}"),
            }),
        }
    }

    fn positive<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + PartialEq + Default,
        T::Err: std::fmt::Display,
    {
        let value = self.parse(key, default)?;
        if value == T::default() {
            return Err(ConfigError::Invalid {
                key,
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(value)
    }

    fn secs(&self, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
        self.parse(key, default).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("SHOEBOX_TABLE_NAME", "Images"),
        ("SHOEBOX_REGION", "eu-west-1"),
        ("SHOEBOX_MAIL_FROM", "album@example.com"),
        ("SHOEBOX_MAIL_TO", "owner@example.com"),
    ];

    #[test]
    fn defaults_are_applied() {
        let cfg = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(cfg.table_name, "Images");
        assert_eq!(cfg.mail, MailSettings::new("album@example.com", "owner@example.com"));
        assert_eq!(cfg.batch_size, 5);
        assert_eq!(cfg.batch_window, Duration::from_secs(10));
        assert_eq!(cfg.visibility_timeout, Duration::from_secs(30));
        assert_eq!(cfg.max_receive_count, 1);
        assert_eq!(cfg.dead_letter_retention, Duration::from_secs(1800));
        assert_eq!(cfg.handler_timeout, Duration::from_secs(15));
        assert_eq!(cfg.notify_timeout, Duration::from_secs(3));
        assert_eq!(cfg.direct_attempts, 3);
        assert_eq!(cfg.failure_policy, FailurePolicy::Uniform);
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn overrides_are_applied() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SHOEBOX_BATCH_SIZE", "10"));
        pairs.push(("SHOEBOX_FAILURE_POLICY", "dead-letter-permanent"));
        pairs.push(("SHOEBOX_LOG", "shoebox=debug"));
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.batch_size, 10);
        assert_eq!(cfg.failure_policy, FailurePolicy::DeadLetterPermanent);
        assert_eq!(cfg.log_filter, "shoebox=debug");
    }

    #[test]
    fn missing_required_value_is_fatal() {
        for skipped in REQUIRED.iter().map(|(k, _)| *k) {
            let pairs: Vec<_> = REQUIRED.iter().copied().filter(|(k, _)| *k != skipped).collect();
            let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, ConfigError::Missing(key) if key == skipped));
        }

        let mut blank = REQUIRED.to_vec();
        blank[0].1 = "  ";
        assert_eq!(
            Config::from_lookup(lookup(&blank)).unwrap_err(),
            ConfigError::Missing("SHOEBOX_TABLE_NAME")
        );
    }

    #[test]
    fn invalid_values_are_fatal() {
        for (key, value) in [
            ("SHOEBOX_BATCH_SIZE", "five"),
            ("SHOEBOX_BATCH_SIZE", "0"),
            ("SHOEBOX_DIRECT_ATTEMPTS", "-1"),
            ("SHOEBOX_FAILURE_POLICY", "sometimes"),
        ] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push((key, value));
            let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: k, .. } if k == key), "{key}={value}");
        }
    }
}
