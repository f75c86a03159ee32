//! Error types for Horizon Grid.

/// Result type alias for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;

/// Errors returned by grid row model operations.
///
/// Only structural misuse of the API surfaces as an error. Malformed
/// transaction items are dropped and reported as warnings instead.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// Two records in the same data set resolved to the same row id.
    #[error("Duplicate row id '{id}'")]
    DuplicateRowId { id: String },

    /// A record id falls in the namespace of generated group, filler or
    /// footer ids.
    #[error("Row id '{id}' is reserved for generated rows")]
    ReservedRowId { id: String },

    /// No row with the given id exists in the tree.
    #[error("No row with id '{id}'")]
    UnknownRow { id: String },

    /// No column with the given id is registered.
    #[error("No column with id '{col_id}'")]
    UnknownColumn { col_id: String },

    /// Tree data was enabled without a data path function.
    #[error("Tree data is enabled but no data path function was supplied")]
    MissingTreeDataPath,

    /// Grid settings could not be parsed.
    #[error("Invalid grid settings: {0}")]
    InvalidSettings(#[from] serde_json::Error),

    /// A queued transaction belongs to a data set that has since been replaced.
    #[error("Transaction queued for generation {queued} but data is at generation {current}")]
    StaleGeneration { queued: u64, current: u64 },
}

impl GridError {
    /// Create a duplicate id error.
    pub fn duplicate_row_id(id: impl Into<String>) -> Self {
        Self::DuplicateRowId { id: id.into() }
    }

    /// Create an unknown row error.
    pub fn unknown_row(id: impl Into<String>) -> Self {
        Self::UnknownRow { id: id.into() }
    }

    /// Create an unknown column error.
    pub fn unknown_column(col_id: impl Into<String>) -> Self {
        Self::UnknownColumn {
            col_id: col_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GridError::duplicate_row_id("7");
        assert_eq!(err.to_string(), "Duplicate row id '7'");

        let err = GridError::unknown_row("abc");
        assert_eq!(err.to_string(), "No row with id 'abc'");

        let err = GridError::ReservedRowId {
            id: "row-group-a-x".into(),
        };
        assert_eq!(err.to_string(), "Row id 'row-group-a-x' is reserved for generated rows");

        let err = GridError::unknown_column("price");
        assert_eq!(err.to_string(), "No column with id 'price'");

        let err = GridError::StaleGeneration {
            queued: 1,
            current: 3,
        };
        assert!(err.to_string().contains("generation 1"));
    }

    #[test]
    fn test_settings_error_from_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = GridError::from(parse_err);
        assert!(matches!(err, GridError::InvalidSettings(_)));
    }
}
