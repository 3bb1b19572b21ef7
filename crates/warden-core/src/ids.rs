//! Approval id generation.
//!
//! Approval ids follow the `appr_<millis>_<random>` shape: a millisecond
//! timestamp for coarse ordering plus a short random suffix for uniqueness
//! within the same millisecond. The id is opaque to everything that handles
//! it — nothing may parse structure back out of it.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Length of the random suffix appended to approval ids.
const SUFFIX_LEN: usize = 8;

/// Generate a fresh approval id.
///
/// The proposal parser mints one of these per parse and the approval store
/// mints the durable one at persistence time; earlier ids are disposable.
#[must_use]
pub fn new_approval_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("appr_{millis}_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_expected_shape() {
        let id = new_approval_id();
        assert!(id.starts_with("appr_"));
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), SUFFIX_LEN);
    }

    #[test]
    fn ids_are_unique() {
        let a = new_approval_id();
        let b = new_approval_id();
        assert_ne!(a, b);
    }
}
