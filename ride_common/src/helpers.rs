use std::{env, str::FromStr};

use chrono::Duration;
use log::*;

/// Reads and parses the environment variable `name`. Missing values quietly fall back to `default`; values that do not
/// parse are logged and also fall back.
pub fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

/// Reads a duration, expressed in whole seconds, from the environment variable `name`.
pub fn env_duration_secs(name: &str, default: Duration) -> Duration {
    let secs = env_or_default(name, default.num_seconds());
    if secs <= 0 {
        warn!("🪛️ {name} must be a positive number of seconds. Using the default, {}s.", default.num_seconds());
        return default;
    }
    Duration::seconds(secs)
}

/// Serde adapter that stores a [`chrono::Duration`] as a whole number of seconds.
pub mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Ok(Duration::seconds(secs))
    }
}
