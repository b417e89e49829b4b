//! Error types for the conversational core.

use releasebot_core::ReleasebotError;

/// Errors from the chat pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat is disabled")]
    Disabled,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("invalid contact: {}", .0.join("; "))]
    InvalidContact(Vec<String>),
    #[error("composer error: {0}")]
    Composer(String),
    #[error("composer timed out after {0} seconds")]
    ComposerTimeout(u64),
    #[error("contact sink error: {0}")]
    ContactSink(String),
    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<ReleasebotError> for ChatError {
    fn from(err: ReleasebotError) -> Self {
        ChatError::StorageError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::Disabled.to_string(), "chat is disabled");
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            ChatError::Composer("quota exceeded".to_string()).to_string(),
            "composer error: quota exceeded"
        );
        assert_eq!(
            ChatError::ComposerTimeout(20).to_string(),
            "composer timed out after 20 seconds"
        );
        assert_eq!(
            ChatError::ContactSink("403".to_string()).to_string(),
            "contact sink error: 403"
        );
    }

    #[test]
    fn test_invalid_contact_joins_violations() {
        let err = ChatError::InvalidContact(vec![
            "name must be at least 2 characters".to_string(),
            "email is not valid".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "invalid contact: name must be at least 2 characters; email is not valid"
        );
    }

    #[test]
    fn test_chat_error_from_releasebot_error() {
        let err: ChatError = ReleasebotError::Storage("cache unreadable".to_string()).into();
        assert!(matches!(err, ChatError::StorageError(_)));
        assert!(err.to_string().contains("cache unreadable"));
    }
}
