//! Validation rules for user-supplied post and comment content.

use super::error::DomainError;

const MAX_TITLE_CHARS: usize = 300;

/// Validated input for a new post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    title: String,
    body: String,
}

impl PostDraft {
    pub fn new(title: &str, body: &str) -> Result<Self, DomainError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(DomainError::validation(format!(
                "title must be at most {MAX_TITLE_CHARS} characters"
            )));
        }
        if body.trim().is_empty() {
            return Err(DomainError::validation("body must not be empty"));
        }

        Ok(Self {
            title: title.to_string(),
            body: body.to_string(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_parts(self) -> (String, String) {
        (self.title, self.body)
    }
}

/// Validated comment body, trimmed of surrounding whitespace.
pub fn comment_body(body: &str) -> Result<String, DomainError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(DomainError::validation("comment body must not be empty"));
    }
    Ok(body.to_string())
}
