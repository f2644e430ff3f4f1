//! Error handling types for treaty-ls
//!
//! The projection core itself never fails: malformed input degrades mapping
//! coverage instead. These errors cover the edges around it (grammar
//! loading, settings files, and the host file table).

use thiserror::Error;

/// Error type for operations around the projection core
#[derive(Debug, Error)]
pub enum TreatyError {
    /// The tree-sitter grammar for the script language could not be loaded
    #[error("Failed to load grammar for language: {language}")]
    GrammarLoad { language: String },

    /// No language plugin recognizes the language id
    #[error("Unsupported language: {language_id}")]
    UnsupportedLanguage { language_id: String },

    /// Configuration error
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Document not found in the file table
    #[error("Document not found: {uri}")]
    DocumentNotFound { uri: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for treaty-ls operations
pub type TreatyResult<T> = Result<T, TreatyError>;

impl TreatyError {
    /// Create a grammar load error
    pub fn grammar_load(language: impl Into<String>) -> Self {
        TreatyError::GrammarLoad {
            language: language.into(),
        }
    }

    /// Create an unsupported language error
    pub fn unsupported_language(language_id: impl Into<String>) -> Self {
        TreatyError::UnsupportedLanguage {
            language_id: language_id.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        TreatyError::Config {
            message: message.into(),
        }
    }

    /// Create a document not found error
    pub fn document_not_found(uri: impl Into<String>) -> Self {
        TreatyError::DocumentNotFound { uri: uri.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            TreatyError::document_not_found("file:///a.treaty").to_string(),
            "Document not found: file:///a.treaty"
        );
        assert_eq!(
            TreatyError::unsupported_language("python").to_string(),
            "Unsupported language: python"
        );
        assert_eq!(
            TreatyError::grammar_load("typescript").to_string(),
            "Failed to load grammar for language: typescript"
        );
    }

    #[test]
    fn test_io_error_converts() {
        fn read() -> TreatyResult<String> {
            Ok(std::fs::read_to_string("/nonexistent/treaty-ls/file")?)
        }
        assert!(matches!(read(), Err(TreatyError::Io(_))));
    }
}
