use std::fmt;
use std::sync::RwLock;

use lazy_static::lazy_static;
use string_interner::{StringInterner, Sym};

lazy_static! {
    static ref STRINGS: RwLock<StringInterner<Sym>> = RwLock::new(StringInterner::default());
}

/// An opaque key into a process-wide string table.
///
/// Identifiers show up in every token, AST node, symbol table entry, and IR
/// instruction; interning them makes those all `Copy` and makes name
/// comparison a word compare.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternedStr(Sym);

impl InternedStr {
    pub fn get_or_intern<S: AsRef<str> + Into<String>>(s: S) -> InternedStr {
        InternedStr(
            STRINGS
                .write()
                .expect("interner poisoned")
                .get_or_intern(s),
        )
    }
    pub fn resolve_and_clone(self) -> String {
        STRINGS
            .read()
            .expect("interner poisoned")
            .resolve(self.0)
            .expect("tried to resolve a symbol not in the interner")
            .to_string()
    }
}

impl fmt::Display for InternedStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let strings = STRINGS.read().expect("interner poisoned");
        let s = strings
            .resolve(self.0)
            .expect("tried to resolve a symbol not in the interner");
        f.write_str(s)
    }
}

impl From<&str> for InternedStr {
    fn from(s: &str) -> Self {
        InternedStr::get_or_intern(s)
    }
}

impl PartialEq<&str> for InternedStr {
    fn eq(&self, other: &&str) -> bool {
        let strings = STRINGS.read().expect("interner poisoned");
        strings.resolve(self.0) == Some(*other)
    }
}

#[cfg(test)]
mod tests {
    use super::InternedStr;

    #[test]
    fn same_string_same_key() {
        assert_eq!(
            InternedStr::get_or_intern("main"),
            InternedStr::get_or_intern("main")
        );
        assert_ne!(
            InternedStr::get_or_intern("main"),
            InternedStr::get_or_intern("fact")
        );
    }

    #[test]
    fn resolve_round_trips() {
        let id = InternedStr::get_or_intern("__minic_init");
        assert_eq!(id.resolve_and_clone(), "__minic_init");
        assert_eq!(id.to_string(), "__minic_init");
        assert_eq!(id, "__minic_init");
    }
}
