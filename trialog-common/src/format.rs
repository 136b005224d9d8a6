//! Share-text formatting for a loaded session
//!
//! `format_session_text` is pure: identical session data always yields
//! byte-identical output. It never fails on missing fields; absent scalar
//! values render as "N/A" and empty notes as the literal "NO NOTES".

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::model::SessionData;

/// Placeholder for absent scalar fields
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder for a block with no notes
pub const NO_NOTES: &str = "NO NOTES";

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_AVAILABLE
    } else {
        value
    }
}

/// Render a session as the multi-line share report
///
/// Layout: candidate header, session information, a TIMINGS section listing
/// each block with BOTH times recorded, and a NOTES section listing every
/// block's notes (or "NO NOTES"). Blocks missing either time are omitted
/// from TIMINGS but still appear in NOTES.
pub fn format_session_text(session: &SessionData) -> String {
    let mut text = format!("CANDIDATE NAME: {}\n\n", session.candidate_name);
    text.push_str("SESSION INFORMATION:\n");
    text.push_str(&format!("Session : {:02}\n", session.session_number));
    text.push_str(&format!("Session ID : {}\n", or_na(&session.session_id)));
    text.push_str(&format!("High (H) : {}\n", or_na(&session.impedance_h)));
    text.push_str(&format!("Low (L) : {}\n\n", or_na(&session.impedance_l)));
    text.push_str("TIMINGS:\n\n");

    for block in &session.blocks {
        if block.is_completed() {
            text.push_str(&format!("{}\t{}\n", block.start_time, block.end_time));
        }
    }

    text.push_str("\nNOTES:\n");
    for block in &session.blocks {
        if block.notes.is_empty() {
            text.push_str(NO_NOTES);
        } else {
            text.push_str(&block.notes);
        }
        text.push('\n');
    }

    text
}

/// Build the messaging deep link for a session report
///
/// The report is URL-encoded into a WhatsApp share URI; the link is opened
/// in a new browser context and no response is awaited.
pub fn share_link(session: &SessionData) -> String {
    let text = format_session_text(session);
    format!(
        "whatsapp://send?text={}",
        utf8_percent_encode(&text, NON_ALPHANUMERIC)
    )
}
