//! Bounded text helpers shared by the snapshot, URL builders and renderers.

use heapless::String;

/// Replaces `out` with as much of `source` as fits, cutting on a char
/// boundary. Returns `false` when the value was truncated.
pub fn set_truncated<const N: usize>(out: &mut String<N>, source: &str) -> bool {
    out.clear();
    push_truncated(out, source)
}

/// Appends as much of `source` as fits, cutting on a char boundary.
pub fn push_truncated<const N: usize>(out: &mut String<N>, source: &str) -> bool {
    for ch in source.chars() {
        if out.push(ch).is_err() {
            return false;
        }
    }
    true
}

/// Builds a bounded string from `source`, truncating on overflow.
pub fn bounded<const N: usize>(source: &str) -> String<N> {
    let mut out = String::new();
    let _ = push_truncated(&mut out, source);
    out
}

/// Writes `bytes` as lowercase hex into `out`, stopping when full.
pub fn push_hex<const N: usize>(out: &mut String<N>, bytes: &[u8]) -> bool {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";

    for byte in bytes {
        let hi = DIGITS[(byte >> 4) as usize] as char;
        let lo = DIGITS[(byte & 0x0F) as usize] as char;
        if out.push(hi).is_err() || out.push(lo).is_err() {
            return false;
        }
    }
    true
}

/// Formats `ms` as `m:ss`.
pub fn write_clock<const N: usize>(out: &mut String<N>, ms: u32) {
    use core::fmt::Write;

    let total_secs = ms / 1_000;
    let _ = write!(out, "{}:{:02}", total_secs / 60, total_secs % 60);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_stops_on_char_boundary() {
        let mut out = String::<5>::new();
        assert!(!set_truncated(&mut out, "caf\u{e9}s!"));
        assert_eq!(out.as_str(), "caf\u{e9}");
    }

    #[test]
    fn hex_is_lowercase_and_two_digits_per_byte() {
        let mut out = String::<8>::new();
        assert!(push_hex(&mut out, &[0x0A, 0xFF, 0x00]));
        assert_eq!(out.as_str(), "0aff00");
    }

    #[test]
    fn clock_label_pads_seconds() {
        let mut out = String::<8>::new();
        write_clock(&mut out, 65_400);
        assert_eq!(out.as_str(), "1:05");
    }
}
