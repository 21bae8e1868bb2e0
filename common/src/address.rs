//! # Address Utilities
//!
//! Seed-file parsing and wildcard address patterns.
//!
//! A pattern is a partially specified address template such as
//! `2001:db8::*` or a fully exploded form with `*` in some nybble
//! positions. Filling a pattern substitutes each wildcard with a random
//! hex digit and leaves every other character untouched; no
//! canonicalization happens anywhere in this module.

use std::net::Ipv6Addr;
use std::path::Path;

use rand::Rng;

use crate::error::KitResult;

const HEX_DIGITS: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
];

/// Formats an address in its fully expanded eight-group form.
pub fn explode(addr: &Ipv6Addr) -> String {
    let segments = addr.segments();
    let mut out = String::with_capacity(39);
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(':');
        }
        out.push_str(&format!("{segment:04x}"));
    }
    out
}

/// Reads a seed file: UTF-8, one address per line, blank lines ignored.
///
/// Lines that do not parse as IPv6 addresses are skipped with a warning
/// rather than failing the whole file. Parsed seeds come back exploded.
pub fn read_seed_file(path: &Path) -> KitResult<Vec<String>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(parse_seed_lines(&raw))
}

pub fn parse_seed_lines(raw: &str) -> Vec<String> {
    let mut seeds = Vec::new();
    let mut skipped = 0usize;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<Ipv6Addr>() {
            Ok(addr) => seeds.push(explode(&addr)),
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        crate::warn!("skipped {skipped} unparsable seed line(s)");
    }
    seeds
}

/// A wildcard address template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    text: String,
    wildcards: usize,
}

impl Pattern {
    /// Accepts hex digits, `:` separators and `*` wildcards.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            anyhow::bail!("empty pattern");
        }

        let mut wildcards = 0usize;
        for c in s.chars() {
            match c {
                '*' => wildcards += 1,
                ':' => {}
                c if c.is_ascii_hexdigit() => {}
                other => anyhow::bail!("invalid character '{other}' in pattern '{s}'"),
            }
        }

        Ok(Self {
            text: s.to_ascii_lowercase(),
            wildcards,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn wildcard_count(&self) -> usize {
        self.wildcards
    }

    /// Number of distinct concrete fills, `None` once it stops fitting in
    /// a `u128`.
    pub fn space_size(&self) -> Option<u128> {
        16u128.checked_pow(u32::try_from(self.wildcards).ok()?)
    }

    /// Substitutes every wildcard with a random hex digit.
    pub fn fill<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.text
            .chars()
            .map(|c| {
                if c == '*' {
                    HEX_DIGITS[rng.random_range(0..16)]
                } else {
                    c
                }
            })
            .collect()
    }
}
