//! Secret sources for new game sessions.
//!
//! [`SecretSource`] is the seam between the game and randomness:
//! - [`ThreadRngSource`] draws uniformly with the thread-local RNG.
//! - [`FixedSecret`] and [`ScriptedSecrets`] return predetermined values, so
//!   tests can play a session against a known secret.

use std::collections::VecDeque;
use std::sync::Mutex;

use rand::Rng as _;

use crate::error::{GameError, Result};

/// Produces secrets for newly started sessions.
pub trait SecretSource: std::fmt::Debug + Send + Sync {
    /// Draws a secret from the closed range `[min, max]`.
    fn draw(&self, min: u8, max: u8) -> Result<u8>;
}

// ============================================================================
// ThreadRngSource
// ============================================================================

/// Uniform secrets from `rand::thread_rng()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngSource;

impl ThreadRngSource {
    /// Creates a new thread-RNG backed source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SecretSource for ThreadRngSource {
    fn draw(&self, min: u8, max: u8) -> Result<u8> {
        if min > max {
            return Err(GameError::random_source(format!(
                "empty range [{min}, {max}]"
            )));
        }
        Ok(rand::thread_rng().gen_range(min..=max))
    }
}

// ============================================================================
// FixedSecret
// ============================================================================

/// Always returns the same secret.
///
/// # Examples
///
/// ```
/// use guess_game::{FixedSecret, SecretSource};
///
/// let source = FixedSecret::new(50);
/// assert_eq!(source.draw(0, 100).unwrap(), 50);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSecret(u8);

impl FixedSecret {
    /// Creates a source that always yields `secret`.
    #[must_use]
    pub const fn new(secret: u8) -> Self {
        Self(secret)
    }
}

impl SecretSource for FixedSecret {
    fn draw(&self, _min: u8, _max: u8) -> Result<u8> {
        Ok(self.0)
    }
}

// ============================================================================
// ScriptedSecrets
// ============================================================================

/// Yields a queued sequence of secrets, then keeps repeating the last one.
#[derive(Debug)]
pub struct ScriptedSecrets {
    script: Mutex<Script>,
}

#[derive(Debug)]
struct Script {
    pending: VecDeque<u8>,
    last: u8,
}

impl ScriptedSecrets {
    /// Creates a source from a non-empty sequence of secrets.
    pub fn new(secrets: impl IntoIterator<Item = u8>) -> Result<Self> {
        let pending: VecDeque<u8> = secrets.into_iter().collect();
        let Some(&last) = pending.front() else {
            return Err(GameError::random_source(
                "scripted secret source needs at least one value",
            ));
        };
        Ok(Self {
            script: Mutex::new(Script { pending, last }),
        })
    }
}

impl SecretSource for ScriptedSecrets {
    fn draw(&self, _min: u8, _max: u8) -> Result<u8> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| GameError::random_source("scripted source lock poisoned"))?;
        if let Some(next) = script.pending.pop_front() {
            script.last = next;
        }
        Ok(script.last)
    }
}
