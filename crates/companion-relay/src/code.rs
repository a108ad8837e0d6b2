//! Pairing code generation.

use companion_common::RelayError;
use rand::Rng;

/// Characters a pairing code is drawn from. `0`/`O` and `1`/`I` are left out
/// so codes survive being read aloud or copied by hand.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of every pairing code.
pub const CODE_LENGTH: usize = 6;

pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;

/// Produces short codes that do not collide with any live session.
///
/// Stateless apart from its retry bound: freed codes are immediately
/// reusable.
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    max_attempts: usize,
}

impl CodeGenerator {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Generate a code for which `is_taken` returns false.
    pub fn generate<F>(&self, is_taken: F) -> Result<String, RelayError>
    where
        F: Fn(&str) -> bool,
    {
        self.generate_with(&mut rand::thread_rng(), is_taken)
    }

    /// Same as [`generate`](Self::generate) with an explicit entropy source.
    pub fn generate_with<R, F>(&self, rng: &mut R, is_taken: F) -> Result<String, RelayError>
    where
        R: Rng + ?Sized,
        F: Fn(&str) -> bool,
    {
        for _ in 0..self.max_attempts {
            let code: String = (0..CODE_LENGTH)
                .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            if !is_taken(&code) {
                return Ok(code);
            }
        }
        Err(RelayError::CodeSpaceExhausted(self.max_attempts))
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Canonical form of a user-typed code: surrounding whitespace dropped,
/// letters upper-cased.
pub fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
