use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Timezone that defines the business day for due dates, reminders and recurring runs.
pub const BUSINESS_TZ: Tz = chrono_tz::Africa::Johannesburg;

/// Converts a UTC instant to the business date.
pub fn business_date_from_utc(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&BUSINESS_TZ).date_naive()
}

/// Today's date in the business timezone.
pub fn business_date_today() -> NaiveDate {
    business_date_from_utc(Utc::now())
}

/// Current UTC time as stored in the database.
pub fn now_naive() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// Adds calendar months, clamping to the last day of shorter months.
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn business_date_rolls_over_at_sast_midnight() {
        // 22:30 UTC is 00:30 the next day in Johannesburg (UTC+2).
        let instant = Utc.with_ymd_and_hms(2024, 3, 31, 22, 30, 0).unwrap();
        assert_eq!(
            business_date_from_utc(instant),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
        );
    }

    #[test]
    fn add_months_clamps_to_month_end() {
        let jan_31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(add_months(jan_31, 1), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }
}
