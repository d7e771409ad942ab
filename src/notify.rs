use notify_rust::{Notification, Timeout, Urgency};

use crate::state::Transition;

const NOTIFY_TIMEOUT_MS: u32 = 2000;

/// Show a short-lived desktop notification for a recording transition.
///
/// Best-effort: a missing notification daemon must never fail the toggle, so
/// errors are only logged. Start uses critical urgency so the notification is
/// highlighted while recording is live.
pub fn notify_transition(transition: Transition) {
    let (summary, urgency) = match transition {
        Transition::Started => ("Speech recording started", Urgency::Critical),
        Transition::Stopped => ("Speech recording stopped", Urgency::Normal),
    };

    let result = Notification::new()
        .appname("s2t")
        .summary(summary)
        .urgency(urgency)
        .timeout(Timeout::Milliseconds(NOTIFY_TIMEOUT_MS))
        .show();

    if let Err(e) = result {
        tracing::warn!("Failed to show desktop notification: {}", e);
    }
}
