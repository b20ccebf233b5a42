use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Admin REST request/response payloads.
pub mod admin;
/// Shared game/team projections for REST responses.
pub mod game;
/// Health endpoint payload.
pub mod health;
/// Participant join payloads.
pub mod participant;
/// Request field validators.
pub mod validation;
/// Realtime protocol messages.
pub mod ws;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
