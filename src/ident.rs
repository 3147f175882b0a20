//! Member name → identifier sanitizing.
//!
//! JSON member names are arbitrary strings: empty, all digits, keywords,
//! punctuation. Everything that is not a valid identifier gets rewritten
//! deterministically so it can name a field or a type in generated code.
use std::borrow::Borrow;
use std::fmt::{self, Write as _};
use std::ops::Deref;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Prefix for names that would otherwise be empty, start with a non-letter,
/// or collide with a keyword.
pub const RESERVED_PREFIX: &str = "_json";

static UNICODE_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\u([0-9A-Fa-f]{4})|\\U([0-9A-Fa-f]{8})").expect("static regex")
});

// reserved words of the C++ target
const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "atomic_cancel", "atomic_commit",
    "atomic_noexcept", "auto", "bitand", "bitor", "bool", "break", "case", "catch",
    "char", "char8_t", "char16_t", "char32_t", "class", "compl", "concept", "const",
    "consteval", "constexpr", "constinit", "co_await", "co_return", "co_yield",
    "const_cast", "continue", "decltype", "default", "delete", "do", "double", "dynamic_cast",
    "else", "enum", "explicit", "export", "extern", "false", "float", "for", "friend",
    "goto", "if", "import", "inline", "int", "long", "module", "mutable", "namespace",
    "new", "noexcept", "not", "not_eq", "nullptr", "operator", "or", "or_eq", "private",
    "protected", "public", "register", "reinterpret_cast", "requires", "return", "short",
    "signed", "sizeof", "small", "static", "static_assert", "static_cast", "struct", "switch",
    "synchronized", "template", "this", "thread_local", "throw", "true", "try", "typedef",
    "typeid", "typename", "union", "unsigned", "using", "virtual", "void", "volatile",
    "wchar_t", "while", "xor", "xor_eq",
];

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod",
    "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super",
    "trait", "true", "try", "type", "unsafe", "use", "where", "while", "abstract", "become",
    "box", "do", "final", "macro", "override", "priv", "typeof", "unsized", "virtual", "yield",
    "_",
];

/// Keyword table used when deciding whether a name needs the reserved prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Cpp,
    Rust,
}

impl Dialect {
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Dialect::Cpp => CPP_KEYWORDS,
            Dialect::Rust => RUST_KEYWORDS,
        }
    }

    pub fn is_keyword(self, name: &str) -> bool {
        self.keywords().contains(&name)
    }
}

/// A name that is syntactically valid in the target language.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl Deref for Identifier {
    type Target = str;
    fn deref(&self) -> &str { &self.0 }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str { &self.0 }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str { &self.0 }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool { self.0 == other }
}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool { self.0 == *other }
}

/// Sanitize against the default (C++) keyword table.
pub fn sanitize(raw: &str) -> Identifier {
    sanitize_for(raw, Dialect::default())
}

pub fn sanitize_for(raw: &str, dialect: Dialect) -> Identifier {
    let name = UNICODE_ESCAPE.replace_all(raw, "0x${1}${2}");

    let needs_prefix = match name.chars().next() {
        None => true,
        Some(c) => !(c.is_ascii_alphabetic() || c == '_') || dialect.is_keyword(&name),
    };

    let mut out = String::with_capacity(name.len() + RESERVED_PREFIX.len());
    if needs_prefix {
        out.push_str(RESERVED_PREFIX);
    }
    for c in name.chars() {
        if is_ident_char(c) {
            out.push(c);
        } else {
            // writing into a String cannot fail
            let _ = write!(out, "0x{:x}", c as u32);
        }
    }
    Identifier(out)
}

/// `true` when `name` would pass through [`sanitize_for`] unchanged.
pub fn is_valid(name: &str, dialect: Dialect) -> bool {
    match name.chars().next() {
        None => false,
        Some(c) => {
            (c.is_ascii_alphabetic() || c == '_')
                && name.chars().all(is_ident_char)
                && !dialect.is_keyword(name)
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// ------------------------------- Tests ------------------------------------ //
