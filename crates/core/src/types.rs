/// Opaque job identifier assigned by whichever endpoint accepted the job.
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
