use chrono::{DateTime, FixedOffset};

const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

/// RFC 3339 with nanoseconds, trailing zeros of the fraction trimmed.
/// The offset is kept as parsed; a zero offset is written as `Z`.
pub fn rfc3339_nano(time: Option<&DateTime<FixedOffset>>) -> String {
    let time = match time {
        None => return ZERO_TIME.to_string(),
        Some(time) => time,
    };
    let mut formatted = time.format("%Y-%m-%dT%H:%M:%S").to_string();
    let nanos = time.timestamp_subsec_nanos() % 1_000_000_000;
    if nanos > 0 {
        let fraction = format!("{:09}", nanos);
        formatted.push('.');
        formatted.push_str(fraction.trim_end_matches('0'));
    }
    let offset = time.offset().local_minus_utc();
    if offset == 0 {
        formatted.push('Z');
    } else {
        let sign = if offset < 0 { '-' } else { '+' };
        let minutes = offset.abs() / 60;
        formatted.push_str(&format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60));
    }
    formatted
}
