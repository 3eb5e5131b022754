//! User authentication for private deployments.
//!
//! A [`Passkey`] is the credential a registered user carries in the announce
//! and scrape URL path. It is derived from 30 bytes of a cryptographic random
//! source, base32-encoded and lowercased, which yields exactly 48 characters
//! over the alphabet `a-z2-7`.
//!
//! ```rust,no_run
//! use shroud_tracker::core::auth;
//!
//! let passkey = auth::generate();
//!
//! assert_eq!(passkey.to_string().len(), 48);
//! ```
//!
//! Users live in an in-memory [`UserRegistry`]; the backend driver is the
//! durable copy when one is attached.
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use derive_more::Display;
use rand::{thread_rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::error::Error;

/// Number of random bytes drawn for a new passkey.
const PASSKEY_SOURCE_BYTES: usize = 30;

/// Length of the base32 form: 30 bytes * 8 / 5 bits per char.
pub const PASSKEY_LENGTH: usize = 48;

/// How often a collision with an existing passkey is retried before the
/// operation fails as retryable.
const GENERATION_RETRIES: usize = 32;

/// A user credential: 48 base32-lowercase characters.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, Display, Hash)]
pub struct Passkey(String);

/// Error returned when a string is not a well-formed passkey.
#[derive(Debug, PartialEq, Eq, Error)]
#[error("invalid passkey")]
pub struct ParsePasskeyError;

impl FromStr for Passkey {
    type Err = ParsePasskeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != PASSKEY_LENGTH {
            return Err(ParsePasskeyError);
        }
        if !s.bytes().all(|c| c.is_ascii_lowercase() || (b'2'..=b'7').contains(&c)) {
            return Err(ParsePasskeyError);
        }
        Ok(Self(s.to_string()))
    }
}

impl From<ParsePasskeyError> for Error {
    fn from(_: ParsePasskeyError) -> Self {
        Error::InvalidPasskey
    }
}

/// It generates a new random [`Passkey`].
///
/// # Panics
///
/// It would panic if the base32 output buffer were too small, which cannot
/// happen for a 30-byte input.
#[must_use]
pub fn generate() -> Passkey {
    let mut source = [0u8; PASSKEY_SOURCE_BYTES];
    thread_rng().fill_bytes(&mut source);

    // `binascii::b32encode` writes one extra 5-byte block's worth of output
    // before trimming to the real length, so the scratch buffer must be
    // larger than `PASSKEY_LENGTH` even though the final slice is not.
    let mut buffer = [0u8; PASSKEY_LENGTH + 8];
    let encoded = binascii::b32encode(&source, &mut buffer).expect("passkey buffer is large enough");

    Passkey(std::str::from_utf8(encoded).unwrap().to_lowercase())
}

/// A registered user of a private deployment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    /// Auto-assigned id. `0` means not yet assigned.
    #[serde(default)]
    pub id: u64,
    /// The credential carried in announce and scrape URL paths.
    #[serde(default)]
    pub passkey: Option<Passkey>,
    /// Login name.
    pub username: String,
    /// Opaque login credential, managed by the index, never interpreted here.
    #[serde(rename = "credential", default)]
    pub cred: String,
    /// Scaling factor applied to this user's upload deltas.
    #[serde(rename = "upMultiplier", default = "default_multiplier")]
    pub up_multiplier: f64,
    /// Scaling factor applied to this user's download deltas.
    #[serde(rename = "downMultiplier", default = "default_multiplier")]
    pub down_multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

/// The in-memory user registry.
///
/// Writers are admin operations; readers are announce and scrape handlers in
/// private mode.
pub struct UserRegistry {
    users: tokio::sync::RwLock<HashMap<Passkey, User>>,
    next_id: AtomicU64,
}

impl Default for UserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UserRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: tokio::sync::RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// It registers a user, assigning it an id and a freshly generated
    /// passkey, and returns the stored record.
    ///
    /// # Errors
    ///
    /// Will return [`Error::Retryable`] if no collision-free passkey could be
    /// produced within the retry budget.
    pub async fn register(&self, mut user: User) -> Result<User, Error> {
        let mut users = self.users.write().await;

        let mut passkey = generate();
        let mut retries = 0;
        while users.contains_key(&passkey) {
            retries += 1;
            if retries > GENERATION_RETRIES {
                return Err(Error::Retryable);
            }
            passkey = generate();
        }

        user.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        user.passkey = Some(passkey.clone());
        users.insert(passkey, user.clone());

        Ok(user)
    }

    /// It inserts a user that already carries an id and passkey, e.g. one
    /// loaded from the backend.
    pub async fn insert(&self, user: User) {
        if let Some(passkey) = user.passkey.clone() {
            self.users.write().await.insert(passkey, user);
        }
    }

    /// It removes the user owning the passkey.
    ///
    /// # Errors
    ///
    /// Will return [`Error::UserNotFound`] if no user owns the passkey.
    pub async fn remove(&self, passkey: &Passkey) -> Result<User, Error> {
        self.users.write().await.remove(passkey).ok_or(Error::UserNotFound)
    }

    /// It finds the user owning the passkey.
    ///
    /// # Errors
    ///
    /// Will return [`Error::UserNotFound`] if no user owns the passkey.
    pub async fn find(&self, passkey: &Passkey) -> Result<User, Error> {
        self.users.read().await.get(passkey).cloned().ok_or(Error::UserNotFound)
    }
}

#[cfg(test)]
mod tests {

    mod passkey {
        use std::str::FromStr;

        use crate::core::auth::{generate, Passkey, PASSKEY_LENGTH};

        #[test]
        fn should_be_parsed_from_a_valid_string() {
            let passkey = Passkey::from_str("abcdefghijklmnopqrstuvwxyz234567abcdefghijklmnop");
            assert!(passkey.is_ok());
        }

        #[test]
        fn should_reject_strings_of_the_wrong_length() {
            assert!(Passkey::from_str("tooshort").is_err());
        }

        #[test]
        fn should_reject_uppercase_and_out_of_alphabet_chars() {
            assert!(Passkey::from_str("ABCDEFGHIJKLMNOPQRSTUVWXYZ234567ABCDEFGHIJKLMNOP").is_err());
            assert!(Passkey::from_str("abcdefghijklmnopqrstuvwxyz018967abcdefghijklmnop").is_err());
        }

        #[test]
        fn should_be_generated_with_48_valid_chars() {
            let passkey = generate();
            let raw = passkey.to_string();

            assert_eq!(raw.len(), PASSKEY_LENGTH);
            assert!(Passkey::from_str(&raw).is_ok());
        }

        #[test]
        fn should_not_repeat_across_many_generations() {
            let mut seen = std::collections::HashSet::new();
            for _ in 0..10_000 {
                let passkey = generate();
                assert!(Passkey::from_str(&passkey.to_string()).is_ok());
                assert!(seen.insert(passkey));
            }
        }
    }

    mod user_registry {
        use crate::core::auth::{User, UserRegistry};
        use crate::core::error::Error;

        fn sample_user() -> User {
            User {
                id: 0,
                passkey: None,
                username: "alice".to_string(),
                cred: String::new(),
                up_multiplier: 1.0,
                down_multiplier: 1.0,
            }
        }

        #[tokio::test]
        async fn it_should_assign_an_id_and_a_passkey_on_registration() {
            let registry = UserRegistry::new();

            let user = registry.register(sample_user()).await.unwrap();

            assert!(user.id > 0);
            assert!(user.passkey.is_some());
        }

        #[tokio::test]
        async fn it_should_find_a_registered_user_by_passkey() {
            let registry = UserRegistry::new();

            let user = registry.register(sample_user()).await.unwrap();
            let passkey = user.passkey.clone().unwrap();

            assert_eq!(registry.find(&passkey).await.unwrap(), user);
        }

        #[tokio::test]
        async fn it_should_fail_finding_an_unknown_passkey() {
            let registry = UserRegistry::new();

            let passkey = crate::core::auth::generate();

            assert_eq!(registry.find(&passkey).await.unwrap_err(), Error::UserNotFound);
        }

        #[tokio::test]
        async fn it_should_remove_a_user() {
            let registry = UserRegistry::new();

            let user = registry.register(sample_user()).await.unwrap();
            let passkey = user.passkey.clone().unwrap();

            registry.remove(&passkey).await.unwrap();

            assert_eq!(registry.find(&passkey).await.unwrap_err(), Error::UserNotFound);
        }

        #[tokio::test]
        async fn it_should_assign_increasing_ids() {
            let registry = UserRegistry::new();

            let first = registry.register(sample_user()).await.unwrap();
            let second = registry.register(sample_user()).await.unwrap();

            assert!(second.id > first.id);
        }
    }
}
