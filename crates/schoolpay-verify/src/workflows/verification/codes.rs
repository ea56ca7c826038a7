use chrono::{DateTime, Datelike, Duration, Utc};
use rand::Rng;

const CODE_PREFIX: &str = "PAY";
const CODE_SUFFIX_LEN: usize = 6;

/// `PAY-<year>-<six uppercase hex characters>`.
pub fn generate_payment_code<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: u32 = rng.gen_range(0..0x0100_0000);
    format!("{CODE_PREFIX}-{}-{suffix:06X}", now.year())
}

/// `<prefix>-<base36 milliseconds>-<four uppercase hex characters>`.
pub fn generate_reference_id<R: Rng>(
    prefix: &str,
    now: DateTime<Utc>,
    rng: &mut R,
) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    let suffix: u16 = rng.gen();
    format!("{prefix}-{}-{suffix:04X}", to_base36(millis))
}

/// `None` when the lifetime does not fit a chrono duration or pushes past the calendar range.
pub fn expires_at(now: DateTime<Utc>, ttl_hours: i64) -> Option<DateTime<Utc>> {
    Duration::try_hours(ttl_hours).and_then(|ttl| now.checked_add_signed(ttl))
}

/// Returns the canonical uppercase code when `raw` matches `PAY-dddd-XXXXXX`.
pub fn normalize_payment_code(raw: &str) -> Option<String> {
    let candidate = raw.trim().to_ascii_uppercase();
    let mut parts = candidate.split('-');

    let prefix = parts.next()?;
    let year = parts.next()?;
    let suffix = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let well_formed = prefix == CODE_PREFIX
        && year.len() == 4
        && year.chars().all(|c| c.is_ascii_digit())
        && suffix.len() == CODE_SUFFIX_LEN
        && suffix.chars().all(|c| c.is_ascii_alphanumeric());

    well_formed.then_some(candidate)
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value == 0 {
        return "0".to_string();
    }

    let mut encoded = Vec::new();
    while value > 0 {
        encoded.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    encoded.reverse();
    String::from_utf8(encoded).unwrap_or_default()
}
