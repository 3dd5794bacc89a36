//! Confirmation resolution for pending rewrite proposals.
//!
//! On a follow-up turn, the immediately preceding assistant turn (and
//! only that turn) may carry a live [`RewriteProposal`]. This module
//! buckets the user's short reply against it. Pure functions, no IO.

use querydesk_types::route::ConfirmationOutcome;
use querydesk_types::turn::Turn;

/// Whole-phrase affirmatives after normalization.
const AFFIRMATIVES: &[&str] = &[
    "yes",
    "y",
    "yeah",
    "yep",
    "yup",
    "sure",
    "ok",
    "okay",
    "correct",
    "go ahead",
    "yes please",
    "sounds good",
    "that works",
    "use the correction",
    "use the rewritten query",
];

/// Whole-phrase bare negatives after normalization. A bare "no" means
/// the user wants to rephrase, not to search as-is.
const NEGATIVES: &[&str] = &["no", "n", "nope", "nah", "no thanks", "no thank you"];

/// Substrings that signal "search with my original wording".
const ORIGINAL_MARKERS: &[&str] = &["original", "as is", "as-is", "my wording"];

/// Interpret a user reply against the immediately preceding assistant
/// turn.
///
/// Returns `NotAPendingConfirmation` only when that turn carries no live
/// proposal (absent turn, user turn, or no proposal payload). Under a
/// live proposal every reply resolves: affirmative uses the rewritten
/// query, an "original"/"as-is" reply uses the original, and anything
/// else (bare negatives included) asks for a rephrase rather than
/// risking a misread.
pub fn resolve(user_reply: &str, prior_assistant_turn: Option<&Turn>) -> ConfirmationOutcome {
    let Some(proposal) = prior_assistant_turn.and_then(Turn::pending_proposal) else {
        return ConfirmationOutcome::NotAPendingConfirmation;
    };

    let normalized = normalize(user_reply);

    // Check override markers before affirmatives: "yes, use the
    // original" is an original-wording reply despite the leading yes.
    if ORIGINAL_MARKERS.iter().any(|m| normalized.contains(m)) {
        return ConfirmationOutcome::UseOriginal(proposal.original_query.clone());
    }
    if AFFIRMATIVES.contains(&normalized.as_str()) {
        return ConfirmationOutcome::UseRewritten(proposal.rewritten_query.clone());
    }
    if NEGATIVES.contains(&normalized.as_str()) {
        return ConfirmationOutcome::NeedsRephrase;
    }

    ConfirmationOutcome::NeedsRephrase
}

/// Lowercase, strip punctuation, collapse whitespace.
fn normalize(reply: &str) -> String {
    let cleaned: String = reply
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
