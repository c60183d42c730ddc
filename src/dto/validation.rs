//! Validation helpers for DTOs.

use validator::ValidationError;

/// Prefix every accepted song URL starts with.
pub const YOUTUBE_WATCH_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Session codes are exactly six ASCII digits.
pub fn validate_session_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
        let mut err = ValidationError::new("session_code_format");
        err.message = Some("Session code must be exactly 6 digits".into());
        return Err(err);
    }
    Ok(())
}

/// Song URLs must be YouTube watch links with a video id.
pub fn validate_youtube_url(url: &str) -> Result<(), ValidationError> {
    match url.strip_prefix(YOUTUBE_WATCH_PREFIX) {
        Some(id) if !id.trim().is_empty() => Ok(()),
        _ => {
            let mut err = ValidationError::new("youtube_url");
            err.message =
                Some(format!("URL must start with {YOUTUBE_WATCH_PREFIX} followed by a video id").into());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_six_digit_codes() {
        assert!(validate_session_code("123456").is_ok());
        assert!(validate_session_code("100000").is_ok());
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(validate_session_code("12345").is_err());
        assert!(validate_session_code("1234567").is_err());
        assert!(validate_session_code("12a456").is_err());
        assert!(validate_session_code("").is_err());
        assert!(validate_session_code("١٢٣٤٥٦").is_err());
    }

    #[test]
    fn youtube_urls_need_the_watch_prefix() {
        assert!(validate_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").is_ok());
        assert!(validate_youtube_url("https://www.youtube.com/watch?v=").is_err());
        assert!(validate_youtube_url("https://youtu.be/dQw4w9WgXcQ").is_err());
        assert!(validate_youtube_url("http://www.youtube.com/watch?v=abc").is_err());
    }
}
