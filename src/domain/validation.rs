use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty { field: &'static str },
    MessageTooLong { max: usize, actual: usize },
    InvalidRecipient { input: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::MessageTooLong { max, actual } => {
                write!(f, "message too long: {actual} characters (max {max})")
            }
            Self::InvalidRecipient { input } => write!(f, "invalid recipient: {input}"),
        }
    }
}

impl std::error::Error for ValidationError {}
