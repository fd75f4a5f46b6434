//! Derived string operations on `StringPool`.
//!
//! Builders stage their result in the pool's scratch buffer and intern it,
//! so the source handles are never modified (`format` is the exception, see
//! there). Offsets and counts are in
//! bytes. Whitespace is any byte `<= b' '`; case mapping is ASCII-only.

use crate::pool::{StrHandle, StringPool};
use core::cmp::Ordering;
use core::ops::Range;
use std::fmt;
use std::io::Write as _;

fn is_blank(b: u8) -> bool {
    b <= b' '
}

fn trimmed(bytes: &[u8], leading: bool, trailing: bool) -> Range<usize> {
    let mut start = 0;
    let mut end = bytes.len();
    if leading {
        while start < end && is_blank(bytes[start]) {
            start += 1;
        }
    }
    if trailing {
        while end > start && is_blank(bytes[end - 1]) {
            end -= 1;
        }
    }
    start..end
}

fn find_bytes(haystack: &[u8], needle: &[u8], start: usize) -> Option<usize> {
    let start = start.min(haystack.len());
    if needle.is_empty() {
        return Some(start);
    }
    haystack[start..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + start)
}

/// C `isspace` in the "C" locale.
fn is_c_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r')
}

fn skip_c_space(bytes: &[u8]) -> &[u8] {
    let n = bytes.iter().take_while(|&&b| is_c_space(b)).count();
    &bytes[n..]
}

/// `atoi`: optional sign and leading digits; saturates instead of
/// overflowing; 0 when there are no digits.
fn parse_int_prefix(bytes: &[u8]) -> i32 {
    let bytes = skip_c_space(bytes);
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };
    let mut value: i64 = 0;
    for &b in digits.iter().take_while(|b| b.is_ascii_digit()) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    let value = if negative { -value } else { value };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// `atof`: the longest prefix of the form `[+-]digits[.digits][e[+-]digits]`.
fn parse_float_prefix(bytes: &[u8]) -> f32 {
    let bytes = skip_c_space(bytes);
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - end - 1;
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    core::str::from_utf8(&bytes[..end])
        .ok()
        .and_then(|s| s.parse::<f32>().ok())
        .unwrap_or(0.0)
}

impl StringPool {
    /// `a` followed by `b`.
    pub fn concat(&self, a: StrHandle, b: StrHandle) -> StrHandle {
        self.state.with(|s| {
            let required = s.length(a) + s.length(b);
            s.build(required, |s, buf| {
                buf.extend_from_slice(s.bytes(a));
                buf.extend_from_slice(s.bytes(b));
            })
        })
    }

    /// Bytewise ordering of the two contents.
    pub fn compare(&self, a: StrHandle, b: StrHandle) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.state.with(|s| s.bytes(a).cmp(s.bytes(b)))
    }

    fn derive_range(
        &self,
        source: StrHandle,
        range: impl FnOnce(&[u8]) -> Range<usize>,
    ) -> StrHandle {
        self.state.with(|s| {
            let r = range(s.bytes(source));
            s.build(r.len(), |s, buf| buf.extend_from_slice(&s.bytes(source)[r]))
        })
    }

    fn derive_mapped(&self, source: StrHandle, map: fn(u8) -> u8) -> StrHandle {
        self.state.with(|s| {
            let required = s.length(source);
            s.build(required, |s, buf| {
                buf.extend(s.bytes(source).iter().map(|&b| map(b)));
            })
        })
    }

    /// Strip leading and trailing whitespace.
    pub fn trim(&self, source: StrHandle) -> StrHandle {
        self.derive_range(source, |b| trimmed(b, true, true))
    }

    pub fn ltrim(&self, source: StrHandle) -> StrHandle {
        self.derive_range(source, |b| trimmed(b, true, false))
    }

    pub fn rtrim(&self, source: StrHandle) -> StrHandle {
        self.derive_range(source, |b| trimmed(b, false, true))
    }

    /// The first `count` bytes (all of them if `count` exceeds the length).
    pub fn left(&self, source: StrHandle, count: usize) -> StrHandle {
        self.derive_range(source, |b| 0..count.min(b.len()))
    }

    /// The last `count` bytes (all of them if `count` exceeds the length).
    pub fn right(&self, source: StrHandle, count: usize) -> StrHandle {
        self.derive_range(source, |b| b.len() - count.min(b.len())..b.len())
    }

    /// `count` bytes starting at `offset`, or everything from `offset` when
    /// `count` is `None`. Both are clipped to the source.
    pub fn mid(&self, source: StrHandle, offset: usize, count: Option<usize>) -> StrHandle {
        self.derive_range(source, |b| {
            let start = offset.min(b.len());
            let rest = b.len() - start;
            start..start + count.map_or(rest, |c| c.min(rest))
        })
    }

    /// Offset of the first occurrence of `needle` at or after `start`.
    /// An empty needle matches at `start` (clipped to the length).
    pub fn instr(&self, haystack: StrHandle, needle: StrHandle, start: usize) -> Option<usize> {
        self.state
            .with(|s| find_bytes(s.bytes(haystack), s.bytes(needle), start))
    }

    /// Offset of the first byte at or after `start` that appears in `set`.
    pub fn any(&self, haystack: StrHandle, set: StrHandle, start: usize) -> Option<usize> {
        self.state.with(|s| {
            let hay = s.bytes(haystack);
            let set = s.bytes(set);
            let start = start.min(hay.len());
            hay[start..]
                .iter()
                .position(|b| set.contains(b))
                .map(|i| i + start)
        })
    }

    /// Whether `source` begins with `prefix`. A prefix longer than the
    /// source never matches.
    pub fn starts_with(&self, source: StrHandle, prefix: StrHandle) -> bool {
        self.state.with(|s| s.bytes(source).starts_with(s.bytes(prefix)))
    }

    pub fn upper(&self, source: StrHandle) -> StrHandle {
        self.derive_mapped(source, |b| b.to_ascii_uppercase())
    }

    pub fn lower(&self, source: StrHandle) -> StrHandle {
        self.derive_mapped(source, |b| b.to_ascii_lowercase())
    }

    pub fn from_int(&self, value: i32) -> StrHandle {
        // Longest i32 rendering is 11 bytes.
        self.state.with(|s| {
            s.build(11, |_, buf| {
                // Writing into a Vec cannot fail.
                let _ = write!(buf, "{value}");
            })
        })
    }

    /// Fixed notation with six decimals. Non-finite values render as
    /// `nan`, `inf` and `-inf`.
    pub fn from_float(&self, value: f32) -> StrHandle {
        self.state.with(|s| {
            s.build(64, |_, buf| {
                let _ = if value.is_nan() {
                    buf.write_all(b"nan")
                } else if value.is_infinite() {
                    buf.write_all(if value < 0.0 { &b"-inf"[..] } else { &b"inf"[..] })
                } else {
                    write!(buf, "{value:.6}")
                };
            })
        })
    }

    /// Leading integer of the content, `atoi`-style; 0 if there is none.
    pub fn int_from_string(&self, source: StrHandle) -> i32 {
        self.state.with(|s| parse_int_prefix(s.bytes(source)))
    }

    /// Leading decimal number of the content, `atof`-style; 0.0 if there is none.
    pub fn float_from_string(&self, source: StrHandle) -> f32 {
        self.state.with(|s| parse_float_prefix(s.bytes(source)))
    }

    /// Intern formatted text: `pool.format(format_args!("{} {}", a, b))`.
    ///
    /// Unlike the other builders this does not stage into the scratch
    /// buffer: the arguments are rendered into their own `String` before the
    /// pool is locked, so `Display` impls may use the pool themselves.
    pub fn format(&self, args: fmt::Arguments<'_>) -> StrHandle {
        match args.as_str() {
            Some(text) => self.intern_str(text),
            None => self.intern_str(&fmt::format(args)),
        }
    }
}
