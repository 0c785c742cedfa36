use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Formats the calendar date of `instant` in `tz` as `M/D/YYYY` (no zero padding).
pub fn format_wire_date(instant: DateTime<Utc>, tz: Tz) -> String {
    let local = instant.with_timezone(&tz);
    format!("{}/{}/{}", local.month(), local.day(), local.year())
}

/// Parses `M/D/YYYY`; leading zeros are accepted.
pub fn parse_wire_date(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.trim().split('/');
    let month = parts.next()?.trim().parse::<u32>().ok()?;
    let day = parts.next()?.trim().parse::<u32>().ok()?;
    let year = parts.next()?.trim().parse::<i32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// First instant of `date` in `tz`. When local midnight falls in a DST gap the
/// first valid local instant after it is used.
pub fn day_start(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    for minutes in (0..=180).step_by(15) {
        let candidate = midnight.checked_add_signed(Duration::minutes(minutes))?;
        if let Some(local) = tz.from_local_datetime(&candidate).earliest() {
            return Some(local.with_timezone(&Utc));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_without_zero_padding_in_reference_zone() {
        let tz: Tz = "Pacific/Auckland".parse().expect("tz");
        // 2017-10-14T12:30Z is already Oct 15 in Auckland (UTC+13).
        let instant = Utc
            .with_ymd_and_hms(2017, 10, 14, 12, 30, 0)
            .single()
            .expect("instant");
        assert_eq!(format_wire_date(instant, tz), "10/15/2017");
        assert_eq!(format_wire_date(instant, chrono_tz::UTC), "10/14/2017");

        let instant = Utc
            .with_ymd_and_hms(2018, 3, 5, 0, 0, 0)
            .single()
            .expect("instant");
        assert_eq!(format_wire_date(instant, chrono_tz::UTC), "3/5/2018");
    }

    #[test]
    fn parses_padded_and_unpadded_dates() {
        let expected = NaiveDate::from_ymd_opt(2017, 3, 5).expect("date");
        assert_eq!(parse_wire_date("3/5/2017"), Some(expected));
        assert_eq!(parse_wire_date("03/05/2017"), Some(expected));
        assert_eq!(parse_wire_date("13/5/2017"), None);
        assert_eq!(parse_wire_date("2017-03-05"), None);
        assert_eq!(parse_wire_date("3/5/2017/1"), None);
        assert_eq!(parse_wire_date(""), None);
    }

    #[test]
    fn day_start_is_local_midnight() {
        let tz: Tz = "Pacific/Auckland".parse().expect("tz");
        let date = NaiveDate::from_ymd_opt(2017, 10, 15).expect("date");
        let start = day_start(date, tz).expect("day start");
        let expected = Utc
            .with_ymd_and_hms(2017, 10, 14, 11, 0, 0)
            .single()
            .expect("expected");
        assert_eq!(start, expected);
    }

    #[test]
    fn day_start_skips_midnight_dst_gap() {
        // Santiago springs forward at local midnight.
        let tz: Tz = "America/Santiago".parse().expect("tz");
        let date = NaiveDate::from_ymd_opt(2017, 8, 13).expect("date");
        let start = day_start(date, tz).expect("day start");
        let local = start.with_timezone(&tz);
        assert_eq!(local.date_naive(), date);
        assert_eq!(local.format("%H:%M").to_string(), "01:00");
    }

    #[test]
    fn day_start_at_the_last_representable_date() {
        let start = day_start(NaiveDate::MAX, chrono_tz::UTC).expect("day start");
        assert_eq!(start.date_naive(), NaiveDate::MAX);
        assert_eq!(start.format("%H:%M:%S").to_string(), "00:00:00");
    }
}
