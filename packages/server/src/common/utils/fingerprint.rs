use sha2::{Digest, Sha256};

/// Prefix for content cache keys.
pub const SUMMARY_KEY_PREFIX: &str = "summary";

/// Generate the cache fingerprint for a summarization input.
///
/// SHA256 over the exact text bytes and the max-length parameter. The length is
/// hashed as its canonical decimal form followed by a unit separator, so the
/// digest depends only on the values and never on how a caller formatted them.
/// Text is not normalized: two inputs that differ in case or punctuation are
/// different summarization requests.
pub fn summary_fingerprint(text: &str, max_length: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(max_length.to_string().as_bytes());
    hasher.update([0x1f]);
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Cache key (`summary:<fingerprint>`) for a summarization input.
pub fn summary_cache_key(text: &str, max_length: u32) -> String {
    format!("{}:{}", SUMMARY_KEY_PREFIX, summary_fingerprint(text, max_length))
}
