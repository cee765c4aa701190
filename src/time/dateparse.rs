use crate::error::AlmError;
use time::macros::format_description;
use time::Date;

/// Parses a balance-sheet date in one of the accepted input formats:
/// ISO-8601 (`YYYY-MM-DD`), dotted (`DD.MM.YYYY`) or compact (`YYYYMMDD`).
pub fn parse_date(s: &str) -> Result<Date, AlmError> {
    let s = s.trim();
    let iso = format_description!("[year]-[month]-[day]");
    let dotted = format_description!("[day].[month].[year]");
    let compact = format_description!("[year][month][day]");

    let attempt = if s.contains('-') {
        Date::parse(s, &iso)
    } else if s.contains('.') {
        Date::parse(s, &dotted)
    } else {
        Date::parse(s, &compact)
    };

    attempt.map_err(|e| AlmError::DataValidation(format!("unparseable date '{}': {}", s, e)))
}
