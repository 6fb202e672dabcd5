use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

/// Days covered by the dashboard and analytics windows, today included
pub const WINDOW_DAYS: i64 = 7;

/// UTC midnight of the day containing `now`
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}

/// Start of the trailing window: midnight six days before today
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(now) - Duration::days(WINDOW_DAYS - 1)
}
