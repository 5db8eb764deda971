// model = "claude-opus-4-5"
// created = "2026-08-03"
// modified = "2026-08-04"
// driver = "Isaac Clayton"

//! Language profiles: the per-document-kind settings the Action Engine
//! consults. Profiles are supplied by the embedder (one per editable
//! document kind); the engine never guesses a language.

use rustc_hash::FxHashMap;

/// Editing settings for one kind of document.
#[derive(Clone, Debug)]
pub struct Profile {
    /// The literal indent unit inserted by `AddIndent`, e.g. `"\t"` or `"    "`.
    pub tab: String,
    /// Columns one indent unit occupies.
    pub tab_width: i64,
    /// Line comment marker, e.g. `"//"`. Empty disables `ToggleComment`.
    pub comment: String,
    /// Bracket and quote complements, open character to close character.
    pub complements: FxHashMap<char, char>,
}

impl Profile {
    /// A profile with the given indent unit and comment marker and the
    /// standard bracket/quote complements.
    pub fn new(tab: &str, tab_width: i64, comment: &str) -> Profile {
        let mut complements = FxHashMap::default();
        for (open, close) in [('(', ')'), ('[', ']'), ('{', '}'), ('"', '"'), ('\'', '\'')] {
            complements.insert(open, close);
        }
        return Profile {
            tab: tab.to_string(),
            tab_width,
            comment: comment.to_string(),
            complements,
        };
    }

    /// The closing complement for an opening bracket or quote, if any.
    pub fn complement(&self, open: char) -> Option<char> {
        return self.complements.get(&open).copied();
    }

    /// Width in columns of a line's leading indentation.
    /// Tabs count `tab_width`, spaces count one.
    pub fn indent_width(&self, line: &str) -> i64 {
        let mut width = 0;
        for c in line.chars() {
            match c {
                '\t' => width += self.tab_width,
                ' ' => width += 1,
                _ => break,
            }
        }
        return width;
    }

    /// Number of leading whitespace characters on a line.
    pub fn indent_chars(&self, line: &str) -> i64 {
        return line.chars().take_while(|c| *c == ' ' || *c == '\t').count() as i64;
    }
}

impl Default for Profile {
    /// Four-space indent, `//` comments.
    fn default() -> Profile {
        return Profile::new("    ", 4, "//");
    }
}
