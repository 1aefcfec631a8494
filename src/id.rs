//! ID generation utilities
//!
//! Session ids and synthetic tool call ids.

use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a unique session ID
///
/// Format: `session-{timestamp_ms}-{sequence}`
pub fn generate_session_id() -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("session-{}-{:04}", now_ms(), seq)
}

/// Id for a tool call parsed out of plain text (the model supplied none)
///
/// Format: `text_call_{index}`
pub fn text_call_id(index: usize) -> String {
    format!("text_call_{}", index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_returns_reasonable_timestamp() {
        // After 2024-01-01
        assert!(now_ms() > 1_704_067_200_000);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
        assert!(a.starts_with("session-"));
    }

    #[test]
    fn test_text_call_id_format() {
        assert_eq!(text_call_id(0), "text_call_0");
        assert_eq!(text_call_id(12), "text_call_12");
    }
}
