use time::macros::format_description;
use time::OffsetDateTime;

/// Epoch seconds → `YYYY-MM-DD HH:MM` (UTC). Out-of-range timestamps clamp to the epoch.
pub fn format_created(ts: i64) -> String {
    let dt = OffsetDateTime::from_unix_timestamp(ts).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    dt.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_default()
}
