//! Separator detection for event channel names
//!
//! Event channels usually name themselves as `BASE: description`,
//! `BASE | description` or `BASE - description`. The hide predicates and the
//! duplicate normalizer share this one parser so they always agree on where
//! the description starts.
//!
//! Rules:
//! - a colon is a separator unless it sits between two digits (`16:00`)
//! - a pipe is always a separator
//! - a dash is a separator only when preceded by whitespace and followed by
//!   whitespace or the end of the name (`UFC 300 - Main Card`, not `X-Men`)

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeparatorKind {
    Colon,
    Pipe,
    Dash,
}

impl SeparatorKind {
    pub const ALL: [SeparatorKind; 3] = [Self::Colon, Self::Pipe, Self::Dash];

    pub fn as_char(&self) -> char {
        match self {
            Self::Colon => ':',
            Self::Pipe => '|',
            Self::Dash => '-',
        }
    }
}

impl fmt::Display for SeparatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A separator occurrence, as byte offsets into the name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separator {
    pub kind: SeparatorKind,
    pub start: usize,
    pub end: usize,
}

/// Find every separator in `name`, left to right
pub fn find_separators(name: &str) -> Vec<Separator> {
    let chars: Vec<(usize, char)> = name.char_indices().collect();
    let mut found = Vec::new();

    for (i, &(offset, ch)) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| chars[p].1);
        let next = chars.get(i + 1).map(|(_, c)| *c);

        let kind = match ch {
            ':' => {
                let clock = matches!(
                    (prev, next),
                    (Some(p), Some(n)) if p.is_ascii_digit() && n.is_ascii_digit()
                );
                (!clock).then_some(SeparatorKind::Colon)
            }
            '|' => Some(SeparatorKind::Pipe),
            '-' => {
                let spaced_before = prev.is_some_and(char::is_whitespace);
                let spaced_after = next.is_none_or(char::is_whitespace);
                (spaced_before && spaced_after).then_some(SeparatorKind::Dash)
            }
            _ => None,
        };

        if let Some(kind) = kind {
            found.push(Separator {
                kind,
                start: offset,
                end: offset + ch.len_utf8(),
            });
        }
    }

    found
}

pub fn has_separator(name: &str) -> bool {
    !find_separators(name).is_empty()
}

pub fn first_separator(name: &str) -> Option<Separator> {
    find_separators(name).into_iter().next()
}

pub fn last_separator(name: &str) -> Option<Separator> {
    find_separators(name).into_iter().last()
}

/// Last separator of the given kind
pub fn last_of_kind(name: &str, kind: SeparatorKind) -> Option<Separator> {
    find_separators(name)
        .into_iter()
        .rev()
        .find(|sep| sep.kind == kind)
}

/// Split into (base, description) at the first separator
pub fn split_at_first(name: &str) -> Option<(&str, &str)> {
    first_separator(name).map(|sep| (&name[..sep.start], &name[sep.end..]))
}

/// Text following the last separator
pub fn text_after_last(name: &str) -> Option<&str> {
    last_separator(name).map(|sep| &name[sep.end..])
}
