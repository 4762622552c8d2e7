use std::{convert::Infallible, fmt::Display, str::FromStr};

use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

const RANDOM_ID_LEN: usize = 16;

/// Declares a string-backed identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generates a fresh random identifier.
            pub fn random() -> Self {
                let suffix: String =
                    rand::thread_rng().sample_iter(&Alphanumeric).take(RANDOM_ID_LEN).map(char::from).collect();
                Self(format!("{}_{}", $prefix, suffix.to_ascii_lowercase()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identifies a rider or driver account.
    UserId,
    "usr"
);
string_id!(
    /// Identifies a ride-related request (a rider looking for a ride, or a driver offering seats).
    RequestId,
    "req"
);
string_id!(PendingRideId, "pnd");
string_id!(ActiveRideId, "act");
