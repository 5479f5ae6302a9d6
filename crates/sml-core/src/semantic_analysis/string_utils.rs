// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Identifier and label helpers shared across the semantic parser.

use ecow::EcoString;
use rand::Rng;

pub(crate) const fn is_alpha(c: u8) -> bool {
    c == b'_' || c.is_ascii_alphabetic()
}

pub(crate) const fn is_alpha_numeric(c: u8) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}

/// Checks whether `value` is a valid SML identifier.
///
/// An identifier is non-empty, starts with a letter or underscore, and
/// continues with letters, digits or underscores — i.e. it matches
/// `^[A-Za-z_][A-Za-z0-9_]*$`.
#[must_use]
pub fn is_valid_id(value: &str) -> bool {
    let bytes = value.as_bytes();
    match bytes.first() {
        None => false,
        Some(&first) if !is_alpha(first) => false,
        Some(_) => bytes[1..].iter().all(|&c| is_alpha_numeric(c)),
    }
}

/// Derives a human-readable label from an identifier.
///
/// Surrounding underscores are trimmed, the rest is split on `_`,
/// every part gets its first letter upper-cased, and the parts are
/// joined with spaces: `foo_bar` becomes `Foo Bar`. A name consisting
/// only of underscores comes back unchanged.
#[must_use]
pub fn create_smart_label(name: &str) -> String {
    let trimmed = name.trim_matches('_');
    if trimmed.is_empty() {
        return name.to_owned();
    }
    trimmed
        .split('_')
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Returns a random name of length `n` over `[A-Za-z0-9_]`.
///
/// Used for criteria declared without a name.
#[must_use]
pub fn random_name(n: usize) -> EcoString {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_";
    let mut rng = rand::thread_rng();
    let name: String = (0..n)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    EcoString::from(name)
}
