use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Kinds of named code constructs the extractors recognize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    Type,
    Const,
    Enum,
}

impl FromStr for SymbolKind {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "function" => Ok(SymbolKind::Function),
            "class" => Ok(SymbolKind::Class),
            "interface" => Ok(SymbolKind::Interface),
            "type" => Ok(SymbolKind::Type),
            "const" => Ok(SymbolKind::Const),
            "enum" => Ok(SymbolKind::Enum),
            _ => Err("Unknown symbol kind"),
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Const => "const",
            SymbolKind::Enum => "enum",
        };
        write!(f, "{name}")
    }
}

/// A named code construct with a source-line span and export visibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// 1-based line where the declaration starts
    pub start_line: u32,
    /// 1-based line where the declaration span ends (heuristic)
    pub end_line: u32,
    pub exported: bool,
    pub signature: Option<String>,
    /// File this symbol belongs to. Invariant: equals the map key it is
    /// stored under in the index.
    pub file: PathBuf,
}

impl Symbol {
    /// Composite identity correlating a symbol with its embedding across
    /// rebuilds. Inserting a line above a symbol shifts `start_line` and
    /// creates a new identity; the prior embedding is dropped on update.
    pub fn key(&self) -> SymbolKey {
        SymbolKey {
            file: self.file.clone(),
            name: self.name.clone(),
            start_line: self.start_line,
        }
    }
}

/// Composite symbol identity: `(file, name, start_line)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolKey {
    pub file: PathBuf,
    pub name: String,
    pub start_line: u32,
}

/// A reference from one file to a module plus the identifiers imported
/// and the symbols relying on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportEdge {
    /// Module path or specifier as written in the source
    pub source_module: String,
    /// Identifiers imported from the module (empty for bare imports)
    pub imported_names: Vec<String>,
    /// Names of symbols in the importing file that lexically use one of
    /// the imported identifiers
    pub used_by: Vec<String>,
}

/// Symbols and imports extracted from a single file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileExtraction {
    pub symbols: Vec<Symbol>,
    pub imports: Vec<ImportEdge>,
}

impl FileExtraction {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.imports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_symbol() -> Symbol {
        Symbol {
            name: "login".to_string(),
            kind: SymbolKind::Function,
            start_line: 10,
            end_line: 20,
            exported: true,
            signature: Some("fn login(user: &str)".to_string()),
            file: PathBuf::from("src/auth.rs"),
        }
    }

    #[test]
    fn symbol_key_identity() {
        let sym = sample_symbol();
        let key = sym.key();
        assert_eq!(key.file, PathBuf::from("src/auth.rs"));
        assert_eq!(key.name, "login");
        assert_eq!(key.start_line, 10);

        // Same file/name at a different line is a different identity
        let mut shifted = sample_symbol();
        shifted.start_line = 11;
        assert_ne!(key, shifted.key());
    }

    #[test]
    fn symbol_kind_parsing() {
        assert_eq!("function".parse::<SymbolKind>(), Ok(SymbolKind::Function));
        assert_eq!("Class".parse::<SymbolKind>(), Ok(SymbolKind::Class));
        assert!("method".parse::<SymbolKind>().is_err());
    }

    #[test]
    fn symbol_key_hashes() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(sample_symbol().key());
        assert!(set.contains(&sample_symbol().key()));
    }
}
