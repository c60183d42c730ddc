use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Healthcheck body.
pub mod health;
/// Player requests and views.
pub mod player;
/// Playback requests and the shared response.
pub mod playback;
/// Search proxy query and results.
pub mod search;
/// Session lifecycle bodies.
pub mod session;
/// Song requests and views.
pub mod song;
/// Server-sent event payloads.
pub mod sse;
pub mod validation;

/// Render a store timestamp (epoch milliseconds) as RFC 3339.
fn format_timestamp_millis(millis: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .and_then(|instant| instant.format(&Rfc3339).ok())
        .unwrap_or_else(|| "invalid-timestamp".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_epoch_millis() {
        assert_eq!(format_timestamp_millis(0), "1970-01-01T00:00:00Z");
        assert_eq!(
            format_timestamp_millis(1_700_000_000_250),
            "2023-11-14T22:13:20.25Z"
        );
    }
}
