//! Frame decoding for the supported indicator wire protocols.
//!
//! One frame is one line of text from the device, terminators already
//! stripped. Decoding is pure and total: anything ambiguous is `None`,
//! never a guess and never an error. Undecodable traffic is continuous
//! and expected (boot banners, status chatter, wrong-baud noise), so a
//! dropped frame is not worth logging above `trace`.

pub use weigh_config::ProtocolKind;

/// Upper bound for the permissive fallback, in kilograms. Rejects
/// run-together digits from a baud mismatch being read as a nine-digit load.
const MAX_PLAUSIBLE_KG: f64 = 100_000.0;

/// Decode one frame into a weight in kilograms.
///
/// The structured pattern of the selected protocol is tried first; if it
/// does not match, a permissive scan accepts the first decimal token
/// (`.` or `,` separator) within `[0, 100000]`. Never returns a negative
/// value.
pub fn parse_frame(raw: &str, protocol: ProtocolKind) -> Option<f64> {
    let line = raw.trim();
    if line.is_empty() {
        return None;
    }
    let structured = match protocol {
        ProtocolKind::LegacyPrefixed => parse_legacy(line),
        ProtocolKind::StGsTagged => parse_status_tagged(line),
    };
    structured.or_else(|| scan_plausible_number(line))
}

/// `ww<digits>[.<digits>]kg`, case-insensitive, whitespace tolerated
/// between tokens. The unit-suffixed form wins over the tolerant
/// suffix-free form when both occur in one line.
fn parse_legacy(line: &str) -> Option<f64> {
    let lower = line.to_ascii_lowercase();
    find_prefixed(&lower, true).or_else(|| find_prefixed(&lower, false))
}

fn find_prefixed(lower: &str, require_unit: bool) -> Option<f64> {
    let mut from = 0;
    while let Some(pos) = lower[from..].find("ww") {
        let after = from + pos + 2;
        if let Some((value, rest)) = decimal_after(&lower[after..])
            && (!require_unit || rest.trim_start().starts_with("kg"))
        {
            return Some(value);
        }
        // Step one byte, not two: "www5kg" matches at the second 'w'.
        from = from + pos + 1;
    }
    None
}

/// `<2 uppercase letters>,GS,[sign]<digits>[.<digits>]kg`, e.g.
/// `ST,GS,+000005kg`. The sign is accepted and ignored; the status tag
/// itself (ST/US/...) is not interpreted.
fn parse_status_tagged(line: &str) -> Option<f64> {
    let b = line.as_bytes();
    if b.len() < 3 {
        return None;
    }
    for i in 0..b.len() - 2 {
        if b[i].is_ascii_uppercase() && b[i + 1].is_ascii_uppercase() && b[i + 2] == b','
            && let Some(v) = tagged_tail(&line[i + 3..])
        {
            return Some(v);
        }
    }
    None
}

fn tagged_tail(s: &str) -> Option<f64> {
    let s = s.trim_start().strip_prefix("GS")?;
    let s = s.strip_prefix(',')?;
    let s = s.trim_start();
    let s = s.strip_prefix(['+', '-']).map_or(s, str::trim_start);
    let (value, rest) = decimal_after(s)?;
    rest.trim_start().starts_with("kg").then_some(value)
}

/// Unsigned decimal at the head of `s` (leading whitespace skipped):
/// digits with an optional `.` fraction. Returns the value and the rest.
fn decimal_after(s: &str) -> Option<(f64, &str)> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == 0 {
        return None;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        let mut j = i + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > i + 1 {
            i = j;
        }
    }
    let value: f64 = s[..i].parse().ok()?;
    Some((value, &s[i..]))
}

/// First decimal token in the line that could plausibly be a weight.
/// Tokens outside `[0, MAX_PLAUSIBLE_KG]` are skipped, not fatal: a later
/// token in the same line may still be the reading.
fn scan_plausible_number(line: &str) -> Option<f64> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let mut end = i;
        if i < bytes.len() && (bytes[i] == b'.' || bytes[i] == b',') {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > i + 1 {
                end = j;
                i = j;
            }
        }
        let token = line[start..end].replace(',', ".");
        if let Ok(value) = token.parse::<f64>()
            && (0.0..=MAX_PLAUSIBLE_KG).contains(&value)
        {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_suffixed_form_wins_over_tolerant_form() {
        // The tolerant suffix-free rule only applies when no `ww…kg`
        // match exists anywhere in the line.
        let v = parse_frame("ww 5 noise ww 7kg", ProtocolKind::LegacyPrefixed);
        assert_eq!(v, Some(7.0));
    }

    #[test]
    fn overlapping_prefix_is_not_missed() {
        assert_eq!(parse_frame("www5kg", ProtocolKind::LegacyPrefixed), Some(5.0));
    }

    #[test]
    fn fallback_skips_implausible_then_accepts_plausible() {
        assert_eq!(
            parse_frame("id=999999999 w=12,5", ProtocolKind::LegacyPrefixed),
            Some(12.5)
        );
    }

    #[test]
    fn decimal_after_requires_fraction_digits() {
        // "5." parses as 5 with the dot left in the rest.
        let (v, rest) = decimal_after("5.kg").unwrap();
        assert_eq!(v, 5.0);
        assert_eq!(rest, ".kg");
    }
}
