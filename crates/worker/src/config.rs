use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

/// Configuration could not be loaded from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Upper bound for minute-valued windows: one year.
const MAX_WINDOW_MINUTES: i64 = 525_600;

/// Upper bound for the slot lock TTL: one day.
const MAX_LOCK_TTL_SECS: u64 = 86_400;

/// Tunables for one dispatch cycle.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Opened slots must have been seen within this many minutes.
    pub lookback_minutes: i32,
    /// Watermark age assumed when none has been stored yet.
    pub watermark_fallback_minutes: i64,
    /// Top ranks asked for a deposit.
    pub deposit_rank_threshold: usize,
    /// Top ranks that may receive an opportunity-passed notice.
    pub opportunity_rank_threshold: usize,
    pub deposit_grace_minutes: i64,
    pub lock_ttl_secs: u64,
    /// Civil zone of the feed's `slot_date`/`slot_time` strings.
    pub slot_timezone: Tz,
    /// Zone used to render message times for a customer without a resolved
    /// selection timezone.
    pub notice_timezone: Tz,
    pub deposit_pay_url: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            lookback_minutes: 3,
            watermark_fallback_minutes: 10,
            deposit_rank_threshold: 10,
            opportunity_rank_threshold: 20,
            deposit_grace_minutes: 120,
            lock_ttl_secs: 120,
            slot_timezone: chrono_tz::Pacific::Honolulu,
            notice_timezone: chrono_tz::Pacific::Honolulu,
            deposit_pay_url: "https://example.com/pay".to_string(),
        }
    }
}

/// Process-level configuration for the worker binary.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Time between scheduled cycles.
    pub interval: Duration,
    /// Run a single cycle and exit.
    pub run_once: bool,
    pub dispatch: DispatchConfig,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                               | Default                   |
    /// |---------------------------------------|---------------------------|
    /// | `DATABASE_URL`                        | (required)                |
    /// | `DB_MAX_CONNECTIONS`                  | `5`                       |
    /// | `DISPATCH_INTERVAL_SECS`              | `60`                      |
    /// | `DISPATCH_RUN_ONCE`                   | `false`                   |
    /// | `DISPATCH_LOOKBACK_MINUTES`           | `3`                       |
    /// | `DISPATCH_WATERMARK_FALLBACK_MINUTES` | `10`                      |
    /// | `DEPOSIT_RANK_THRESHOLD`              | `10`                      |
    /// | `OPPORTUNITY_RANK_THRESHOLD`          | `20`                      |
    /// | `DEPOSIT_GRACE_MINUTES`               | `120`                     |
    /// | `LOCK_TTL_SECS`                       | `120`                     |
    /// | `SLOT_TIMEZONE`                       | `Pacific/Honolulu`        |
    /// | `NOTICE_TIMEZONE`                     | `Pacific/Honolulu`        |
    /// | `DEPOSIT_PAY_URL`                     | `https://example.com/pay` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };
        let defaults = DispatchConfig::default();

        let database_url = env
            .raw("DATABASE_URL")
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let dispatch = DispatchConfig {
            lookback_minutes: env.parse_or("DISPATCH_LOOKBACK_MINUTES", defaults.lookback_minutes)?,
            watermark_fallback_minutes: env.parse_or(
                "DISPATCH_WATERMARK_FALLBACK_MINUTES",
                defaults.watermark_fallback_minutes,
            )?,
            deposit_rank_threshold: env
                .parse_or("DEPOSIT_RANK_THRESHOLD", defaults.deposit_rank_threshold)?,
            opportunity_rank_threshold: env
                .parse_or("OPPORTUNITY_RANK_THRESHOLD", defaults.opportunity_rank_threshold)?,
            deposit_grace_minutes: env
                .parse_or("DEPOSIT_GRACE_MINUTES", defaults.deposit_grace_minutes)?,
            lock_ttl_secs: env.parse_or("LOCK_TTL_SECS", defaults.lock_ttl_secs)?,
            slot_timezone: env.parse_or("SLOT_TIMEZONE", defaults.slot_timezone)?,
            notice_timezone: env.parse_or("NOTICE_TIMEZONE", defaults.notice_timezone)?,
            deposit_pay_url: env
                .raw("DEPOSIT_PAY_URL")
                .unwrap_or(defaults.deposit_pay_url),
        };

        if dispatch.opportunity_rank_threshold <= dispatch.deposit_rank_threshold {
            return Err(ConfigError::Invalid {
                name: "OPPORTUNITY_RANK_THRESHOLD",
                value: dispatch.opportunity_rank_threshold.to_string(),
                reason: format!(
                    "must be greater than DEPOSIT_RANK_THRESHOLD ({})",
                    dispatch.deposit_rank_threshold
                ),
            });
        }
        check_range(
            "DISPATCH_LOOKBACK_MINUTES",
            i64::from(dispatch.lookback_minutes),
            1,
            MAX_WINDOW_MINUTES,
        )?;
        check_range(
            "DISPATCH_WATERMARK_FALLBACK_MINUTES",
            dispatch.watermark_fallback_minutes,
            1,
            MAX_WINDOW_MINUTES,
        )?;
        check_range(
            "DEPOSIT_GRACE_MINUTES",
            dispatch.deposit_grace_minutes,
            1,
            MAX_WINDOW_MINUTES,
        )?;
        check_range("LOCK_TTL_SECS", dispatch.lock_ttl_secs, 1, MAX_LOCK_TTL_SECS)?;

        let interval_secs: u64 = env.parse_or("DISPATCH_INTERVAL_SECS", 60)?;
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "DISPATCH_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            database_url,
            max_connections: env.parse_or("DB_MAX_CONNECTIONS", 5)?,
            interval: Duration::from_secs(interval_secs),
            run_once: env.parse_or("DISPATCH_RUN_ONCE", false)?,
            dispatch,
        })
    }
}

fn check_range<T>(name: &'static str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: format!("must be between {min} and {max}"),
        });
    }
    Ok(())
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed value, treating blank as unset.
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_or<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.raw(name) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
                value,
            }),
        }
    }
}
