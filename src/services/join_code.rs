//! Human-shareable join code generation.

use rand::Rng;
use std::sync::Arc;

use crate::{dao::quiz_store::QuizStore, error::ServiceError};

/// Alphabet without the ambiguous characters 0/O, 1/I.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Attempts before giving up on finding an unused code.
const MAX_ATTEMPTS: u32 = 16;

/// Draw a random code of the given length from the unambiguous alphabet.
pub fn generate(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let index = rng.random_range(0..CODE_ALPHABET.len());
            char::from(CODE_ALPHABET[index])
        })
        .collect()
}

/// Generate a code that is not already assigned to a quiz, retrying on
/// collision against the store's uniqueness check.
pub async fn generate_unique(
    store: &Arc<dyn QuizStore>,
    length: usize,
) -> Result<String, ServiceError> {
    for _ in 0..MAX_ATTEMPTS {
        let code = generate(length);
        if !store.code_exists(code.clone()).await? {
            return Ok(code);
        }
    }

    // 32^6 codes; exhausting the attempts means the store is effectively full.
    Err(ServiceError::InvalidInput(
        "could not allocate an unused join code".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_requested_length() {
        for length in [4, 6, 8] {
            assert_eq!(generate(length).chars().count(), length);
        }
    }

    #[test]
    fn codes_only_use_the_unambiguous_alphabet() {
        for _ in 0..100 {
            let code = generate(6);
            assert!(
                code.bytes().all(|byte| CODE_ALPHABET.contains(&byte)),
                "unexpected character in code {code}"
            );
        }
    }

    #[test]
    fn alphabet_excludes_ambiguous_characters() {
        for forbidden in [b'0', b'O', b'1', b'I'] {
            assert!(!CODE_ALPHABET.contains(&forbidden));
        }
    }
}
