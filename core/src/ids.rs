use chrono::Utc;
use std::fmt::Debug;
use uuid::Uuid;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_SUFFIX_LEN: usize = 9;

/// Source of session and message identifiers
pub trait IdGenerator: Send + Sync + Debug {
    /// Produce an identifier unique within the lifetime of one session.
    fn new_id(&self) -> String;
}

/// Millisecond timestamp followed by a random base36 suffix.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampIdGenerator;

impl TimestampIdGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator for TimestampIdGenerator {
    fn new_id(&self) -> String {
        let millis = Utc::now().timestamp_millis();
        let mut entropy = Uuid::new_v4().as_u128();

        let mut suffix = String::with_capacity(RANDOM_SUFFIX_LEN);
        for _ in 0..RANDOM_SUFFIX_LEN {
            suffix.push(ALPHABET[(entropy % 36) as usize] as char);
            entropy /= 36;
        }

        format!("{}{}", millis, suffix)
    }
}
