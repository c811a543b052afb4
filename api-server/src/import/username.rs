//! Unique username derivation.

use rand::Rng;

use crate::import::error::ImportError;
use crate::import::validator::ClaimedKeys;
use crate::store::ImportStore;

/// Longest username the users table accepts, in characters.
pub const USERNAME_MAX_LENGTH: usize = 255;

/// `{firstname}{lastname}` cut short enough that any suffix up to
/// `suffix_max` still fits in [`USERNAME_MAX_LENGTH`].
fn username_base(firstname: &str, lastname: &str, suffix_max: u32) -> String {
    let room = USERNAME_MAX_LENGTH.saturating_sub(suffix_max.to_string().len());
    firstname.chars().chain(lastname.chars()).take(room).collect()
}

/// Builds `{firstname}{lastname}{n}` usernames with a random `n`.
///
/// A candidate is rejected when the store already has it or an earlier row of
/// the same run claimed it. Attempts are capped; exhausting them is an error
/// instead of a silent retry loop.
pub struct UsernameGenerator<R> {
    rng: R,
    suffix_max: u32,
    max_attempts: usize,
}

impl<R: Rng + Send> UsernameGenerator<R> {
    pub fn new(rng: R, suffix_max: u32, max_attempts: usize) -> Self {
        Self {
            rng,
            suffix_max,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Return a free username and claim it for this run.
    pub async fn generate<S>(
        &mut self,
        firstname: &str,
        lastname: &str,
        store: &S,
        claimed: &mut ClaimedKeys,
    ) -> Result<String, ImportError>
    where
        S: ImportStore + ?Sized,
    {
        let base = username_base(firstname, lastname, self.suffix_max);

        for attempt in 1..=self.max_attempts {
            let suffix = self.rng.gen_range(0..=self.suffix_max);
            let candidate = format!("{base}{suffix}");

            if claimed.has_username(&candidate) || store.username_exists(&candidate).await? {
                log::trace!("username {} taken (attempt {})", candidate, attempt);
                continue;
            }

            claimed.claim_username(&candidate);
            return Ok(candidate);
        }

        Err(ImportError::UsernameExhausted {
            base,
            attempts: self.max_attempts,
        })
    }
}
