use uuid::Uuid;

/// Errors produced by board operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A required text field was empty. Nothing was changed.
    #[error("{field} must not be empty")]
    Validation { field: &'static str },

    /// The entity is no longer on the board. Mutators treat this as a
    /// no-op; it only surfaces from lookups.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Rejects `value` if it is blank, otherwise returns it unchanged.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::Validation { field });
    }
    Ok(value.to_string())
}
