// ── Entity traits ──
//
// The engine is generic over the record type. These traits are the only
// things it needs to know about a record.

/// A record with a stable integer identifier.
pub trait Entity {
    fn id(&self) -> i64;
}

/// A record with an enabled/disabled flag (users, persons, companies).
pub trait Toggleable {
    fn is_enabled(&self) -> bool;
}
