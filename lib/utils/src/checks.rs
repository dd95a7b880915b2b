use const_format::formatcp;
use validator::ValidationError;

use crate::constants::{MAX_CATEGORY_SELECTION, MAX_COMMENT_LENGTH, MAX_POST_LENGTH, MAX_USERNAME_LENGTH};
use crate::errors::AppError;

/// # Returns whether the given string `input` is shorter or equal than the given max length and, if not `is_empty_ok`, that it's not blank
///
/// ```
/// use agora_utils::checks::{check_string_length};
/// use agora_utils::errors::AppError;
///
/// assert!(check_string_length("hello", "input", 5, false).is_ok());
/// assert_eq!(check_string_length("hello", "input", 4, false), Err(AppError::invalid("input exceeds the maximum length: 4.")));
/// assert_eq!(check_string_length("", "input", 4, false), Err(AppError::invalid("input cannot be empty.")));
/// assert_eq!(check_string_length(" \n", "input", 4, false), Err(AppError::invalid("input cannot be empty.")));
/// assert!(check_string_length("", "input", 4, true).is_ok());
/// ```
pub fn check_string_length(
    input: &str,
    input_name: &str,
    max_length: usize,
    is_empty_ok: bool,
) -> Result<(), AppError> {
    match (input.len() > max_length, !is_empty_ok && input.trim().is_empty()) {
        (true, _) => Err(AppError::invalid(format!("{input_name} exceeds the maximum length: {max_length}."))),
        (_, true) => Err(AppError::invalid(format!("{input_name} cannot be empty."))),
        (false, false) => Ok(()),
    }
}

/// # Returns whether a username is valid.
///
/// # Valid usernames contain only ascii alphanumeric characters, '-', '_' and have a maximum length of `MAX_USERNAME_LENGTH`
///
/// ```
/// use agora_utils::checks::{check_username};
/// use agora_utils::constants::MAX_USERNAME_LENGTH;
///
/// assert!(check_username("-Abc123_").is_ok());
/// assert!(check_username("").is_err());
/// assert!(check_username(" name").is_err());
/// assert!(check_username("name%").is_err());
/// assert!(check_username(&"a".repeat(MAX_USERNAME_LENGTH)).is_ok());
/// assert!(check_username(&"a".repeat(MAX_USERNAME_LENGTH + 1)).is_err());
/// ```
pub fn check_username(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        Err(ValidationError::new("Username cannot be empty."))
    } else if !name.chars().all(move |c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        Err(ValidationError::new("Username can only contain alphanumeric characters, dashes and underscores."))
    } else if name.len() > MAX_USERNAME_LENGTH {
        Err(ValidationError::new(formatcp!("Username cannot exceed {MAX_USERNAME_LENGTH} characters.")))
    } else {
        Ok(())
    }
}

/// # Returns whether the content of a post is valid.
///
/// ```
/// use agora_utils::checks::{check_post_content};
/// use agora_utils::constants::MAX_POST_LENGTH;
///
/// assert!(check_post_content("gg wp").is_ok());
/// assert!(check_post_content("").is_err());
/// assert!(check_post_content("   ").is_err());
/// assert!(check_post_content(&"a".repeat(MAX_POST_LENGTH)).is_ok());
/// assert!(check_post_content(&"a".repeat(MAX_POST_LENGTH + 1)).is_err());
/// ```
pub fn check_post_content(content: &str) -> Result<(), AppError> {
    check_string_length(content, "Post", MAX_POST_LENGTH, false)
}

/// # Returns whether the content of a comment is valid.
///
/// ```
/// use agora_utils::checks::{check_comment_content};
/// use agora_utils::constants::MAX_COMMENT_LENGTH;
///
/// assert!(check_comment_content("nice").is_ok());
/// assert!(check_comment_content("").is_err());
/// assert!(check_comment_content(&"a".repeat(MAX_COMMENT_LENGTH + 1)).is_err());
/// ```
pub fn check_comment_content(content: &str) -> Result<(), AppError> {
    check_string_length(content, "Comment", MAX_COMMENT_LENGTH, false)
}

/// # Returns whether a selection of category ids is well-formed. Existence of the categories is checked against storage separately.
///
/// ```
/// use agora_utils::checks::{check_category_selection};
///
/// assert!(check_category_selection(&[]).is_ok());
/// assert!(check_category_selection(&[1, 3]).is_ok());
/// assert!(check_category_selection(&[0]).is_err());
/// assert!(check_category_selection(&[2, -1]).is_err());
/// ```
pub fn check_category_selection(category_ids: &[i64]) -> Result<(), AppError> {
    if category_ids.len() > MAX_CATEGORY_SELECTION {
        Err(AppError::invalid(formatcp!("Cannot select more than {MAX_CATEGORY_SELECTION} categories.")))
    } else if let Some(category_id) = category_ids.iter().find(|category_id| **category_id <= 0) {
        Err(AppError::invalid(format!("Invalid category id: {category_id}.")))
    } else {
        Ok(())
    }
}
