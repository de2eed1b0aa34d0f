pub mod app_state;
pub mod geocode;
pub mod incident;
pub mod profile;
pub mod user;

use validator::ValidationError;

/// Rejects values that are empty once surrounding whitespace is removed
pub(crate) fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
