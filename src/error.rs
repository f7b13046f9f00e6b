use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Named relation {0} not found")]
    RelationNotFound(String),

    #[error("Attribute {0} not found")]
    AttributeNotFound(String),

    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("Join search limit exceeded: {predicates} join predicates, at most {limit} supported")]
    JoinSearchLimit { predicates: usize, limit: usize },

    #[error("Invalid query: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn error_code(&self) -> i32 {
        match self {
            Error::RelationNotFound(_) => -1,
            Error::AttributeNotFound(_) => -2,
            Error::ConsistencyViolation(_) => -3,
            Error::JoinSearchLimit { .. } => -4,
            Error::Query(_) => -5,
            Error::Config(_) => -6,
            Error::Io(_) => -7,
            Error::Json(_) => -8,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RelationNotFound(_) | Error::AttributeNotFound(_))
    }

    pub(crate) fn consistency(msg: impl Into<String>) -> Self {
        Error::ConsistencyViolation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = vec![
            Error::RelationNotFound("R".to_string()),
            Error::AttributeNotFound("A".to_string()),
            Error::consistency("bad"),
            Error::JoinSearchLimit { predicates: 9, limit: 8 },
            Error::Query("bad".to_string()),
            Error::Config("bad".to_string()),
        ];
        let mut codes: Vec<i32> = errors.iter().map(|e| e.error_code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_not_found_category() {
        assert!(Error::RelationNotFound("R".to_string()).is_not_found());
        assert!(Error::AttributeNotFound("A".to_string()).is_not_found());
        assert!(!Error::consistency("x").is_not_found());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::RelationNotFound("Person".to_string()).to_string(),
            "Named relation Person not found"
        );
        assert_eq!(
            Error::JoinSearchLimit { predicates: 10, limit: 8 }.to_string(),
            "Join search limit exceeded: 10 join predicates, at most 8 supported"
        );
    }
}
