use chrono::{NaiveDate, NaiveTime};

/// Tried in order; the first format that parses wins.
pub const TIME_FORMATS: [&str; 4] = ["%H:%M", "%I:%M %p", "%I:%M%p", "%H%M"];

/// `today`, `tomorrow` or `YYYY-MM-DD`.
pub fn parse_date_token(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let token = text.trim().to_lowercase();
    match token.as_str() {
        "today" => Some(today),
        "tomorrow" => today.succ_opt(),
        _ => NaiveDate::parse_from_str(&token, "%Y-%m-%d").ok(),
    }
}

pub fn parse_time_token(text: &str) -> Option<NaiveTime> {
    let token = text.trim().to_uppercase();
    if token.is_empty() {
        return None;
    }
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&token, format).ok())
}
