//! Reply classification while an approval is pending.
//!
//! While a conversation has a pending approval, every inbound message is
//! first read as an answer to it. Matching is exact over a small phrase
//! table, never fuzzy: a message that merely contains "ok" somewhere keeps
//! the record pending and triggers a re-prompt instead.

/// How a reply bears on the pending approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalIntent {
    /// Confirm; the held payload is replayed.
    Accept,
    /// Decline; the held payload is dropped.
    Reject,
    /// Decline and leave the active plugin as well.
    ExitPlugin,
    /// None of the above; the record stays pending.
    Unclear,
}

/// Phrases that confirm. Chinese entries cover the affirmations agents in
/// bilingual chats actually receive.
const AFFIRMATIVE: &[&str] = &[
    "/confirm", "/approve", "yes", "y", "ok", "okay", "确认", "同意", "好", "好的", "可以", "是",
];

/// Phrases that decline.
const NEGATIVE: &[&str] = &[
    "/cancel", "/reject", "no", "n", "不", "不要", "不行", "取消", "算了",
];

/// Classify one reply against the pending approval.
///
/// Comparison runs on the lowercased text with whitespace runs collapsed,
/// so `" /Confirm "` and `"/confirm  --last"` both count as accepts.
#[must_use]
pub fn classify(text: &str) -> ApprovalIntent {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if normalized == "/exit" {
        return ApprovalIntent::ExitPlugin;
    }
    if normalized == "/confirm --last" {
        return ApprovalIntent::Accept;
    }
    if AFFIRMATIVE.contains(&normalized.as_str()) {
        return ApprovalIntent::Accept;
    }
    if NEGATIVE.contains(&normalized.as_str()) {
        return ApprovalIntent::Reject;
    }
    ApprovalIntent::Unclear
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_answers_classify() {
        assert_eq!(classify("/confirm"), ApprovalIntent::Accept);
        assert_eq!(classify("/confirm --last"), ApprovalIntent::Accept);
        assert_eq!(classify("/approve"), ApprovalIntent::Accept);
        assert_eq!(classify("/cancel"), ApprovalIntent::Reject);
        assert_eq!(classify("/reject"), ApprovalIntent::Reject);
        assert_eq!(classify("/exit"), ApprovalIntent::ExitPlugin);
    }

    #[test]
    fn natural_language_answers_classify() {
        assert_eq!(classify("yes"), ApprovalIntent::Accept);
        assert_eq!(classify("ok"), ApprovalIntent::Accept);
        assert_eq!(classify("确认"), ApprovalIntent::Accept);
        assert_eq!(classify("好的"), ApprovalIntent::Accept);
        assert_eq!(classify("no"), ApprovalIntent::Reject);
        assert_eq!(classify("取消"), ApprovalIntent::Reject);
        assert_eq!(classify("不要"), ApprovalIntent::Reject);
    }

    #[test]
    fn normalization_tolerates_case_and_spacing() {
        assert_eq!(classify("  YES  "), ApprovalIntent::Accept);
        assert_eq!(classify("/Confirm   --last"), ApprovalIntent::Accept);
        assert_eq!(classify("\tNO\n"), ApprovalIntent::Reject);
    }

    #[test]
    fn anything_else_stays_unclear() {
        assert_eq!(classify("tell me more first"), ApprovalIntent::Unclear);
        assert_eq!(classify("ok let me think"), ApprovalIntent::Unclear);
        assert_eq!(classify("yes?"), ApprovalIntent::Unclear);
        assert_eq!(classify(""), ApprovalIntent::Unclear);
        assert_eq!(classify("/status"), ApprovalIntent::Unclear);
    }
}
