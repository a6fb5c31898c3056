use chrono::{FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// All persisted timestamps are tz-naive and semantically Asia/Tokyo. This is
/// the single clock source for wall-clock values; only epoch-based code (JWT
/// expiry) reads UTC directly.
pub fn jst_now() -> NaiveDateTime {
    let jst = FixedOffset::east_opt(9 * 3600).expect("fixed +09:00 offset");
    Utc::now().with_timezone(&jst).naive_local()
}

pub fn jst_today() -> NaiveDate {
    jst_now().date()
}
