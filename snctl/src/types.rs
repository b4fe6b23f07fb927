//! Identifier aliases shared across the client.
//!
//! Every entity the backend hands out is keyed by a UUID. The aliases keep signatures readable
//! (`commit(id: ReservationId)` rather than `commit(id: Uuid)`) without the ceremony of newtypes.

use uuid::Uuid;

pub type ReservationId = Uuid;
pub type UserId = Uuid;
pub type ApiKeyId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}
