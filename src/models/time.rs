/// Time-of-day helpers. Schedule and room times travel as "H:MM"/"HH:MM"
/// strings; every comparison goes through the zero-padded form or through
/// minutes-since-midnight so that "8:00" and "08:00" behave identically.

/// Normalize a 24-hour clock string to zero-padded "HH:MM".
pub fn normalize_hhmm(raw: &str) -> Option<String> {
    let (h, m) = split_hhmm(raw)?;
    Some(format!("{:02}:{:02}", h, m))
}

/// Convert a 24-hour clock string to minutes since midnight.
pub fn minutes_since_midnight(raw: &str) -> Option<u16> {
    let (h, m) = split_hhmm(raw)?;
    Some(h as u16 * 60 + m as u16)
}

fn split_hhmm(raw: &str) -> Option<(u8, u8)> {
    let (hours, minutes) = raw.trim().split_once(':')?;
    let h: u8 = hours.trim().parse().ok()?;
    let m: u8 = minutes.trim().parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some((h, m))
}
