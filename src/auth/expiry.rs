use time::{
    format_description::FormatItem, macros::format_description, Duration, OffsetDateTime,
    PrimitiveDateTime,
};

/// Wire format for client-supplied and reported timestamps.
pub const CLIENT_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Expiry data returned to the client alongside a freshly issued token.
/// Advisory only: nothing server-side enforces `expired_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenExpiry {
    pub expired_at: OffsetDateTime,
    pub is_expired: bool,
    pub server_time: OffsetDateTime,
}

/// Parses a `YYYY-MM-DD HH:MM:SS` client timestamp, assumed UTC.
pub fn parse_client_time(value: &str) -> Result<OffsetDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(value, CLIENT_TIME_FORMAT).map(|dt| dt.assume_utc())
}

/// Computes the advertised token expiry: the nominal lifetime widened by
/// the absolute clock skew between server and client, so a client whose
/// clock runs behind or ahead still perceives roughly the full lifetime.
///
/// `is_expired` compares `expired_at` against `server_now` and is therefore
/// always false here; clients depend on that shape, so it is kept as-is.
pub fn compute(
    server_now: OffsetDateTime,
    client_login: OffsetDateTime,
    ttl_seconds: i64,
) -> TokenExpiry {
    let skew_seconds = (server_now - client_login).whole_seconds().abs();
    let expired_at = server_now + Duration::seconds(ttl_seconds + skew_seconds);
    TokenExpiry {
        expired_at,
        is_expired: expired_at < server_now,
        server_time: server_now,
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn client_behind_server_widens_expiry() {
        let server = datetime!(2024-01-01 10:00:05 UTC);
        let client = datetime!(2024-01-01 10:00:00 UTC);
        let expiry = compute(server, client, 3600);
        assert_eq!(expiry.expired_at, datetime!(2024-01-01 11:00:10 UTC));
        assert_eq!(expiry.server_time, server);
        assert!(!expiry.is_expired);
    }

    #[test]
    fn client_ahead_of_server_widens_expiry_symmetrically() {
        let server = datetime!(2024-01-01 10:00:00 UTC);
        let client = datetime!(2024-01-01 10:02:00 UTC);
        let expiry = compute(server, client, 3600);
        assert_eq!(expiry.expired_at, datetime!(2024-01-01 11:02:00 UTC));
    }

    #[test]
    fn zero_skew_gives_nominal_lifetime() {
        let now = datetime!(2024-06-15 08:30:00 UTC);
        let expiry = compute(now, now, 3600);
        assert_eq!((expiry.expired_at - now).whole_seconds(), 3600);
        assert!(!expiry.is_expired);
    }

    #[test]
    fn parse_accepts_wire_format() {
        let parsed = parse_client_time("2024-01-01 10:00:00").expect("parse");
        assert_eq!(parsed, datetime!(2024-01-01 10:00:00 UTC));
    }

    #[test]
    fn parse_rejects_free_text_and_wrong_shapes() {
        assert!(parse_client_time("tomorrow").is_err());
        assert!(parse_client_time("2024-01-01T10:00:00").is_err());
        assert!(parse_client_time("2024-13-01 10:00:00").is_err());
        assert!(parse_client_time("").is_err());
    }
}
