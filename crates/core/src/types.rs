/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identifies a single dispatcher run; stamped on locks and booking attempts.
pub type RunId = uuid::Uuid;
