//! Frequency policy — decides at `Idle → Pending` whether a widget may be
//! presented to this visitor again, from the flags kept in browser
//! storage.

use popreach_core::types::FrequencyPolicy;
use popreach_storage::VisitorFlags;

/// Returns `true` when the policy permits a fresh presentation.
///
/// A submission this session suppresses re-display outright. A
/// `visitor_count` override (> 0) requires the session visit count to
/// equal it exactly and supersedes the policy itself.
pub fn allows(
    policy: FrequencyPolicy,
    visitor_count: Option<u32>,
    flags: &VisitorFlags,
) -> bool {
    if flags.submitted_this_session {
        return false;
    }

    if let Some(count) = visitor_count {
        if count > 0 {
            return flags.session_visit_count == count;
        }
    }

    match policy {
        FrequencyPolicy::All => true,
        FrequencyPolicy::SessionUnique => !flags.shown_this_session,
        FrequencyPolicy::PersistentUnique => !flags.shown_ever,
        FrequencyPolicy::Repeater => flags.session_visit_count > 1,
    }
}
