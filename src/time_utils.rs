use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

#[derive(Clone, Copy, Debug)]
enum ParsedTimezone {
    Named(Tz),
    Fixed(FixedOffset),
}

/// Wall-clock view of an instant in the organization's timezone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalMoment {
    pub date: NaiveDate,
    /// 0 = Monday .. 6 = Sunday
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
}

fn parse_fixed_offset(raw: &str) -> Option<FixedOffset> {
    let trimmed = raw.trim();
    let (sign, rest) = match trimmed.chars().next()? {
        '+' => (1, &trimmed[1..]),
        '-' => (-1, &trimmed[1..]),
        _ => return None,
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }

    let (hours, minutes) = if let Some((h, m)) = rest.split_once(':') {
        (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?)
    } else if rest.len() > 2 {
        let (h, m) = rest.split_at(rest.len() - 2);
        (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?)
    } else {
        (rest.parse::<i32>().ok()?, 0)
    };

    if hours > 14 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_timezone(raw: &str) -> Option<ParsedTimezone> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let upper = trimmed.to_uppercase();
    if upper == "UTC" || upper == "GMT" {
        return FixedOffset::east_opt(0).map(ParsedTimezone::Fixed);
    }

    if upper.starts_with("UTC") || upper.starts_with("GMT") {
        return parse_fixed_offset(&trimmed[3..]).map(ParsedTimezone::Fixed);
    }

    trimmed.parse::<Tz>().ok().map(ParsedTimezone::Named)
}

pub fn is_valid_timezone(raw: &str) -> bool {
    parse_timezone(raw).is_some()
}

/// Unknown zones fall back to UTC; config validation rejects them before this is reached.
pub fn local_moment(raw_tz: &str, utc_dt: DateTime<Utc>) -> LocalMoment {
    match parse_timezone(raw_tz) {
        Some(ParsedTimezone::Named(tz)) => moment_of(&utc_dt.with_timezone(&tz)),
        Some(ParsedTimezone::Fixed(offset)) => moment_of(&utc_dt.with_timezone(&offset)),
        None => moment_of(&utc_dt),
    }
}

fn moment_of<Z: TimeZone>(local: &DateTime<Z>) -> LocalMoment {
    LocalMoment {
        date: local.date_naive(),
        weekday: local.weekday().num_days_from_monday() as u8,
        hour: local.hour() as u8,
        minute: local.minute() as u8,
    }
}

/// Parses `HH:MM` (24h) into hour and minute.
pub fn parse_clock_time(raw: &str) -> Option<(u8, u8)> {
    let (h, m) = raw.trim().split_once(':')?;
    if h.is_empty() || m.len() != 2 {
        return None;
    }
    let hour: u8 = h.parse().ok()?;
    let minute: u8 = m.parse().ok()?;
    (hour < 24 && minute < 60).then_some((hour, minute))
}
