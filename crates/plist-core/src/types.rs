//! Node kind discriminator and its textual names.
//!
//! The pretty-printer and the CLI render kinds through [`Kind::name`]; tests
//! and callers that accept kind names as input go through [`Kind::from_name`].
//! The parser never consults this table.

use std::fmt;

/// The kind of a property list node.
///
/// `Unknown` is the sentinel returned by [`Kind::from_name`] for names outside
/// the closed set; no node in a tree ever has it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Dict,
    Key,
    Array,
    Data,
    Date,
    String,
    Integer,
    Real,
    Boolean,
    Unknown,
}

/// Name table shared by both directions of the mapping.
const KIND_NAMES: &[(&str, Kind)] = &[
    ("dict", Kind::Dict),
    ("key", Kind::Key),
    ("array", Kind::Array),
    ("data", Kind::Data),
    ("date", Kind::Date),
    ("string", Kind::String),
    ("integer", Kind::Integer),
    ("real", Kind::Real),
    ("boolean", Kind::Boolean),
];

impl Kind {
    /// All nine concrete kinds, in table order.
    pub const ALL: [Kind; 9] = [
        Kind::Dict,
        Kind::Key,
        Kind::Array,
        Kind::Data,
        Kind::Date,
        Kind::String,
        Kind::Integer,
        Kind::Real,
        Kind::Boolean,
    ];

    /// Look up a kind by name, case-insensitively.
    ///
    /// Names outside the table map to [`Kind::Unknown`].
    pub fn from_name(name: &str) -> Kind {
        KIND_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, k)| k)
            .unwrap_or(Kind::Unknown)
    }

    /// The canonical lowercase name of this kind.
    pub fn name(self) -> &'static str {
        KIND_NAMES
            .iter()
            .find(|&&(_, k)| k == self)
            .map(|&(n, _)| n)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
