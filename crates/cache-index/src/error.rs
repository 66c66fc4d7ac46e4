//! Error types for the cache index

use std::fmt;

#[derive(Debug)]
pub enum IndexError {
    Io(Box<std::io::Error>),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IndexError::Io(err) => Some(err.as_ref()),
        }
    }
}

impl From<std::io::Error> for IndexError {
    fn from(err: std::io::Error) -> Self {
        IndexError::Io(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_error_display() {
        let err = IndexError::from(Error::new(ErrorKind::PermissionDenied, "denied"));
        assert!(format!("{}", err).contains("denied"));
    }

    #[test]
    fn test_error_is_debug() {
        let err = IndexError::from(Error::new(ErrorKind::Other, "test"));
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Io"));
    }
}
