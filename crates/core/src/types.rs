/// Identity of a deployment or any sub-entity it owns.
///
/// Ids are minted by the application (UUIDv7) so a whole aggregate can be
/// staged in memory before it is written.
pub type EntityId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Mint a fresh, time-ordered entity id.
pub fn new_id() -> EntityId {
    uuid::Uuid::now_v7()
}
