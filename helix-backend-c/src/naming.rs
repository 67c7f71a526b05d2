#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};

use helix_core::IdentifierPath;

const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Bool", "_Complex", "_Imaginary", "bool",
    "true", "false",
];

/// Maps one path segment to a C identifier. Compiler-introduced segments
/// (`$t_3`) become `__t_3`; source identifiers can never start with `__`.
pub(crate) fn sanitize(segment: &str) -> String {
    if let Some(rest) = segment.strip_prefix('$') {
        return format!("__{rest}");
    }
    if C_KEYWORDS.contains(&segment) {
        return format!("{segment}_");
    }
    segment.to_string()
}

/// Hands out C identifiers that are unique within one namespace.
#[derive(Clone, Debug, Default)]
pub(crate) struct NameTable {
    by_path: HashMap<IdentifierPath, String>,
    used: HashSet<String>,
}

impl NameTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A fresh table that still avoids every name claimed in `self`.
    pub(crate) fn nested(&self) -> Self {
        Self {
            by_path: HashMap::new(),
            used: self.used.clone(),
        }
    }

    pub(crate) fn get(&self, path: &IdentifierPath) -> Option<&str> {
        self.by_path.get(path).map(String::as_str)
    }

    /// The C name for `path`, assigning one on first use.
    pub(crate) fn assign(&mut self, path: &IdentifierPath) -> String {
        if let Some(name) = self.by_path.get(path) {
            return name.clone();
        }
        let base = sanitize(path.last().unwrap_or("anon"));
        let name = self.reserve(&base);
        self.by_path.insert(path.clone(), name.clone());
        name
    }

    /// Claims `base`, or `base_N` for the first free `N`.
    pub(crate) fn reserve(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut n = 1;
        while self.used.contains(&name) {
            name = format!("{base}_{n}");
            n += 1;
        }
        self.used.insert(name.clone());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_and_keyword_segments_are_rewritten() {
        assert_eq!(sanitize("$for_counter_2"), "__for_counter_2");
        assert_eq!(sanitize("default"), "default_");
        assert_eq!(sanitize("total"), "total");
    }

    #[test]
    fn colliding_names_get_suffixes() {
        let mut table = NameTable::new();
        let outer = IdentifierPath::new(["main", "u"]);
        let inner = IdentifierPath::new(["main", "$block0", "u"]);
        assert_eq!(table.assign(&outer), "u");
        assert_eq!(table.assign(&inner), "u_1");
        assert_eq!(table.assign(&outer), "u");
        assert_eq!(table.get(&inner), Some("u_1"));
    }

    #[test]
    fn nested_tables_avoid_outer_names() {
        let mut globals = NameTable::new();
        globals.assign(&IdentifierPath::new(["total"]));
        let mut locals = globals.nested();
        assert_eq!(locals.assign(&IdentifierPath::new(["main", "total"])), "total_1");
        assert_eq!(locals.get(&IdentifierPath::new(["total"])), None);
    }
}
