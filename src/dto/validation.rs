//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::dto::quiz::OptionInput;

const MAX_ALIAS_LENGTH: usize = 32;
const MIN_OPTION_COUNT: usize = 2;
const MAX_OPTION_COUNT: usize = 6;

/// Validates a participant alias: non-blank and at most 32 characters.
pub fn validate_alias(alias: &str) -> Result<(), ValidationError> {
    if alias.trim().is_empty() {
        let mut err = ValidationError::new("alias_blank");
        err.message = Some("alias must not be blank".into());
        return Err(err);
    }

    if alias.chars().count() > MAX_ALIAS_LENGTH {
        let mut err = ValidationError::new("alias_length");
        err.message =
            Some(format!("alias must be at most {MAX_ALIAS_LENGTH} characters").into());
        return Err(err);
    }

    Ok(())
}

/// Validates an authored option set: 2 to 6 options, unique ids, and exactly
/// one option flagged correct. The scoring engine relies on this invariant.
pub fn validate_options(options: &[OptionInput]) -> Result<(), ValidationError> {
    if options.len() < MIN_OPTION_COUNT || options.len() > MAX_OPTION_COUNT {
        let mut err = ValidationError::new("option_count");
        err.message = Some(
            format!("a question needs {MIN_OPTION_COUNT} to {MAX_OPTION_COUNT} options").into(),
        );
        return Err(err);
    }

    let mut seen = std::collections::HashSet::new();
    if !options.iter().all(|option| seen.insert(option.id)) {
        let mut err = ValidationError::new("option_id_duplicate");
        err.message = Some("option ids must be unique within a question".into());
        return Err(err);
    }

    let correct_count = options.iter().filter(|option| option.is_correct).count();
    if correct_count != 1 {
        let mut err = ValidationError::new("option_correct_count");
        err.message = Some(
            format!("exactly one option must be marked correct (got {correct_count})").into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(id: u32, correct: bool) -> OptionInput {
        OptionInput {
            id,
            text: format!("option {id}"),
            is_correct: correct,
        }
    }

    #[test]
    fn alias_rules() {
        assert!(validate_alias("Alice").is_ok());
        assert!(validate_alias("  ").is_err());
        assert!(validate_alias("").is_err());
        assert!(validate_alias(&"x".repeat(33)).is_err());
        assert!(validate_alias(&"x".repeat(32)).is_ok());
    }

    #[test]
    fn options_require_exactly_one_correct() {
        assert!(validate_options(&[option(0, true), option(1, false)]).is_ok());
        assert!(validate_options(&[option(0, false), option(1, false)]).is_err());
        assert!(validate_options(&[option(0, true), option(1, true)]).is_err());
    }

    #[test]
    fn options_require_two_to_six_entries() {
        assert!(validate_options(&[option(0, true)]).is_err());
        let seven: Vec<OptionInput> = (0..7).map(|id| option(id, id == 0)).collect();
        assert!(validate_options(&seven).is_err());
    }

    #[test]
    fn option_ids_must_be_unique() {
        assert!(validate_options(&[option(0, true), option(0, false)]).is_err());
    }
}
