use crate::domain::conversation::ConversationState;

/// Derives the next conversation state from the reply that was just sent.
///
/// Implementations must never regress or clear the state on input they do not
/// recognize: the fallback is always "unchanged".
pub trait StateClassifier: Send + Sync {
    fn classify(&self, reply: &str, current: ConversationState) -> ConversationState;
}

/// Phrase-matching classifier over the outgoing reply text.
///
/// Patterns are checked in a fixed priority order, first match wins:
/// 1. an address question ("address" together with "?") -> collecting_address
/// 2. a service-tier mention (regular/express/premium)   -> selecting_service
/// 3. time or pickup phrasing                            -> selecting_time
/// 4. confirmation phrasing ("confirm", "sound good")    -> confirming_booking
/// 5. completion phrasing ("all set", "confirmed")       -> completed
///
/// "confirmed" contains "confirm", so a reply whose only completion cue is
/// the word "confirmed" classifies as confirming_booking under rule 4;
/// "all set" is the reliable completion cue. Ambiguous replies resolve to the
/// earliest matching rule.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicStateClassifier;

impl HeuristicStateClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl StateClassifier for HeuristicStateClassifier {
    fn classify(&self, reply: &str, current: ConversationState) -> ConversationState {
        let lowered = reply.to_lowercase();

        if lowered.contains("address") && lowered.contains('?') {
            return ConversationState::CollectingAddress;
        }
        if lowered.contains("regular") || lowered.contains("express") || lowered.contains("premium")
        {
            return ConversationState::SelectingService;
        }
        if lowered.contains("time") || lowered.contains("pickup") {
            return ConversationState::SelectingTime;
        }
        if lowered.contains("confirm") || lowered.contains("sound good") {
            return ConversationState::ConfirmingBooking;
        }
        if lowered.contains("all set") || lowered.contains("confirmed") {
            return ConversationState::Completed;
        }

        current
    }
}
