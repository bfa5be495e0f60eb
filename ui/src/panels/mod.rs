pub(crate) mod activity;
pub(crate) mod controls;

/// Extract the time portion from an ISO 8601 timestamp string.
/// "2026-02-27T12:34:56.789+01:00" -> "12:34:56.789"
pub(crate) fn extract_time(iso: &str) -> String {
    let Some(t_pos) = iso.find('T') else {
        return iso.to_string();
    };
    let time_part = &iso[t_pos + 1..];
    let end = time_part
        .find(['Z', '+', '-'])
        .unwrap_or(time_part.len());
    time_part[..end].to_string()
}
