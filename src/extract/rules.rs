//! Static language table: extensions, declaration rules, import rules
//!
//! New languages are added here, data-first; the registry dispatch never
//! changes. Every pattern must have a `name` capture; rules using
//! `ExportRule::Marker` also need an `exp` capture.

use crate::types::SymbolKind;

/// How a rule decides whether a matched declaration is exported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportRule {
    /// Exported when the optional `exp` capture matched (e.g. `pub`, `export`)
    Marker,
    /// Exported unless the name starts with an underscore (Python convention)
    NotUnderscore,
    /// Exported when the name starts with an uppercase letter (Go convention)
    UppercaseInitial,
}

/// A single declaration pattern
#[derive(Debug, Clone, Copy)]
pub struct DeclRule {
    pub kind: SymbolKind,
    pub pattern: &'static str,
    pub export: ExportRule,
}

/// A single import pattern with a `module` capture and optional `names`
#[derive(Debug, Clone, Copy)]
pub struct ImportRule {
    pub pattern: &'static str,
    /// When true and no `names` capture matched, the last `::`/`.` segment of
    /// the module path is the imported name and the prefix is the module
    /// (Rust `use foo::bar::Baz`)
    pub split_last_segment: bool,
}

/// Multi-line import block (Go `import ( ... )`)
#[derive(Debug, Clone, Copy)]
pub struct ImportBlock {
    pub open: &'static str,
    pub close: &'static str,
    pub inner: &'static str,
}

/// Everything the registry needs to know about one language
#[derive(Debug, Clone, Copy)]
pub struct LanguageSpec {
    pub id: &'static str,
    pub extensions: &'static [&'static str],
    /// Conventional extensionless file names handled by this language
    pub filenames: &'static [&'static str],
    pub decls: &'static [DeclRule],
    pub imports: &'static [ImportRule],
    pub import_block: Option<ImportBlock>,
}

const RUST_DECLS: &[DeclRule] = &[
    DeclRule {
        kind: SymbolKind::Function,
        pattern: r"^\s*(?P<exp>pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+\S+\s+)?fn\s+(?P<name>[A-Za-z_]\w*)",
        export: ExportRule::Marker,
    },
    DeclRule {
        kind: SymbolKind::Class,
        pattern: r"^\s*(?P<exp>pub(?:\([^)]*\))?\s+)?struct\s+(?P<name>[A-Za-z_]\w*)",
        export: ExportRule::Marker,
    },
    DeclRule {
        kind: SymbolKind::Interface,
        pattern: r"^\s*(?P<exp>pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?trait\s+(?P<name>[A-Za-z_]\w*)",
        export: ExportRule::Marker,
    },
    DeclRule {
        kind: SymbolKind::Enum,
        pattern: r"^\s*(?P<exp>pub(?:\([^)]*\))?\s+)?enum\s+(?P<name>[A-Za-z_]\w*)",
        export: ExportRule::Marker,
    },
    DeclRule {
        kind: SymbolKind::Type,
        pattern: r"^\s*(?P<exp>pub(?:\([^)]*\))?\s+)?type\s+(?P<name>[A-Za-z_]\w*)\s*=",
        export: ExportRule::Marker,
    },
    DeclRule {
        kind: SymbolKind::Const,
        pattern: r"^\s*(?P<exp>pub(?:\([^)]*\))?\s+)?(?:const|static)\s+(?P<name>[A-Za-z_]\w*)\s*:",
        export: ExportRule::Marker,
    },
];

const RUST_IMPORTS: &[ImportRule] = &[ImportRule {
    pattern: r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+(?P<module>[A-Za-z_][\w:]*?)(?:::\{(?P<names>[^}]*)\})?\s*;",
    split_last_segment: true,
}];

const TS_DECLS: &[DeclRule] = &[
    DeclRule {
        kind: SymbolKind::Function,
        pattern: r"^\s*(?P<exp>export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)",
        export: ExportRule::Marker,
    },
    DeclRule {
        kind: SymbolKind::Class,
        pattern: r"^\s*(?P<exp>export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)",
        export: ExportRule::Marker,
    },
    DeclRule {
        kind: SymbolKind::Interface,
        pattern: r"^\s*(?P<exp>export\s+)?interface\s+(?P<name>[A-Za-z_$][\w$]*)",
        export: ExportRule::Marker,
    },
    DeclRule {
        kind: SymbolKind::Enum,
        pattern: r"^\s*(?P<exp>export\s+)?(?:const\s+)?enum\s+(?P<name>[A-Za-z_$][\w$]*)",
        export: ExportRule::Marker,
    },
    DeclRule {
        kind: SymbolKind::Type,
        pattern: r"^\s*(?P<exp>export\s+)?type\s+(?P<name>[A-Za-z_$][\w$]*)\s*=",
        export: ExportRule::Marker,
    },
    DeclRule {
        kind: SymbolKind::Const,
        pattern: r"^\s*(?P<exp>export\s+)?const\s+(?P<name>[A-Za-z_$][\w$]*)\s*[=:]",
        export: ExportRule::Marker,
    },
];

const TS_IMPORTS: &[ImportRule] = &[
    ImportRule {
        pattern: r#"^\s*import\s+(?:type\s+)?\{(?P<names>[^}]*)\}\s+from\s+['"](?P<module>[^'"]+)['"]"#,
        split_last_segment: false,
    },
    ImportRule {
        pattern: r#"^\s*import\s+(?:type\s+)?(?P<names>[A-Za-z_$][\w$]*)\s+from\s+['"](?P<module>[^'"]+)['"]"#,
        split_last_segment: false,
    },
    ImportRule {
        pattern: r#"^\s*import\s+['"](?P<module>[^'"]+)['"]"#,
        split_last_segment: false,
    },
    ImportRule {
        pattern: r#"require\(\s*['"](?P<module>[^'"]+)['"]\s*\)"#,
        split_last_segment: false,
    },
];

const PYTHON_DECLS: &[DeclRule] = &[
    // Anchored at column zero: only module-level declarations become symbols
    DeclRule {
        kind: SymbolKind::Function,
        pattern: r"^(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)",
        export: ExportRule::NotUnderscore,
    },
    DeclRule {
        kind: SymbolKind::Class,
        pattern: r"^class\s+(?P<name>[A-Za-z_]\w*)",
        export: ExportRule::NotUnderscore,
    },
    DeclRule {
        kind: SymbolKind::Const,
        pattern: r"^(?P<name>[A-Z][A-Z0-9_]*)\s*(?::[^=]+)?=",
        export: ExportRule::NotUnderscore,
    },
];

const PYTHON_IMPORTS: &[ImportRule] = &[
    ImportRule {
        pattern: r"^\s*from\s+(?P<module>[\w.]+)\s+import\s+(?P<names>[\w.,\s*()]+)",
        split_last_segment: false,
    },
    ImportRule {
        pattern: r"^\s*import\s+(?P<module>[\w.]+)",
        split_last_segment: false,
    },
];

const GO_DECLS: &[DeclRule] = &[
    DeclRule {
        kind: SymbolKind::Function,
        pattern: r"^func\s+(?:\([^)]*\)\s+)?(?P<name>[A-Za-z_]\w*)",
        export: ExportRule::UppercaseInitial,
    },
    DeclRule {
        kind: SymbolKind::Class,
        pattern: r"^type\s+(?P<name>[A-Za-z_]\w*)\s+struct\b",
        export: ExportRule::UppercaseInitial,
    },
    DeclRule {
        kind: SymbolKind::Interface,
        pattern: r"^type\s+(?P<name>[A-Za-z_]\w*)\s+interface\b",
        export: ExportRule::UppercaseInitial,
    },
    DeclRule {
        kind: SymbolKind::Type,
        pattern: r"^type\s+(?P<name>[A-Za-z_]\w*)\s+",
        export: ExportRule::UppercaseInitial,
    },
    DeclRule {
        kind: SymbolKind::Const,
        pattern: r"^const\s+(?P<name>[A-Za-z_]\w*)",
        export: ExportRule::UppercaseInitial,
    },
];

const GO_IMPORTS: &[ImportRule] = &[ImportRule {
    pattern: r#"^import\s+(?:\w+\s+)?"(?P<module>[^"]+)""#,
    split_last_segment: false,
}];

const GO_IMPORT_BLOCK: ImportBlock = ImportBlock {
    open: "import (",
    close: ")",
    inner: r#"^\s*(?:[\w.]+\s+)?"(?P<module>[^"]+)""#,
};

const MAKE_DECLS: &[DeclRule] = &[DeclRule {
    // Build targets double as navigable symbols
    kind: SymbolKind::Function,
    pattern: r"^(?P<name>[A-Za-z][\w.-]*)\s*:(?:[^=]|$)",
    export: ExportRule::NotUnderscore,
}];

const MAKE_IMPORTS: &[ImportRule] = &[ImportRule {
    pattern: r"^-?include\s+(?P<module>\S+)",
    split_last_segment: false,
}];

const GENERIC_DECLS: &[DeclRule] = &[
    DeclRule {
        kind: SymbolKind::Function,
        pattern: r"^\s*(?P<exp>export\s+|pub\s+|public\s+)?(?:static\s+)?(?:async\s+)?(?:function|fn|def|func|sub|proc)\s+(?P<name>[A-Za-z_]\w*)",
        export: ExportRule::Marker,
    },
    DeclRule {
        kind: SymbolKind::Interface,
        pattern: r"^\s*(?P<exp>export\s+|pub\s+|public\s+)?interface\s+(?P<name>[A-Za-z_]\w*)",
        export: ExportRule::Marker,
    },
    DeclRule {
        kind: SymbolKind::Enum,
        pattern: r"^\s*(?P<exp>export\s+|pub\s+|public\s+)?enum\s+(?P<name>[A-Za-z_]\w*)",
        export: ExportRule::Marker,
    },
    DeclRule {
        kind: SymbolKind::Class,
        pattern: r"^\s*(?P<exp>export\s+|pub\s+|public\s+)?(?:abstract\s+|final\s+|sealed\s+)?(?:class|struct|trait)\s+(?P<name>[A-Za-z_]\w*)",
        export: ExportRule::Marker,
    },
    DeclRule {
        kind: SymbolKind::Const,
        pattern: r"^\s*(?P<exp>export\s+|pub\s+|public\s+)?(?:const|val|final)\s+(?P<name>[A-Z][A-Z0-9_]*)",
        export: ExportRule::Marker,
    },
];

const GENERIC_IMPORTS: &[ImportRule] = &[
    ImportRule {
        pattern: r#"^\s*#\s*include\s+[<"](?P<module>[^>"]+)[>"]"#,
        split_last_segment: false,
    },
    ImportRule {
        pattern: r#"^\s*(?:import|require|using|include)\s+['"<]?(?P<module>[\w./:-]+)"#,
        split_last_segment: false,
    },
];

/// Identifier of the generic fallback extractor
pub const GENERIC_ID: &str = "generic";

/// The full language table. The last entry is the generic fallback, which
/// also claims the extensions of languages without bespoke rules.
pub const LANGUAGES: &[LanguageSpec] = &[
    LanguageSpec {
        id: "rust",
        extensions: &["rs"],
        filenames: &[],
        decls: RUST_DECLS,
        imports: RUST_IMPORTS,
        import_block: None,
    },
    LanguageSpec {
        id: "typescript",
        extensions: &["ts", "tsx", "mts", "cts"],
        filenames: &[],
        decls: TS_DECLS,
        imports: TS_IMPORTS,
        import_block: None,
    },
    LanguageSpec {
        id: "javascript",
        extensions: &["js", "jsx", "mjs", "cjs"],
        filenames: &[],
        decls: TS_DECLS,
        imports: TS_IMPORTS,
        import_block: None,
    },
    LanguageSpec {
        id: "python",
        extensions: &["py", "pyi"],
        filenames: &[],
        decls: PYTHON_DECLS,
        imports: PYTHON_IMPORTS,
        import_block: None,
    },
    LanguageSpec {
        id: "go",
        extensions: &["go"],
        filenames: &[],
        decls: GO_DECLS,
        imports: GO_IMPORTS,
        import_block: Some(GO_IMPORT_BLOCK),
    },
    LanguageSpec {
        id: "make",
        extensions: &["mk"],
        filenames: &["Makefile", "makefile", "GNUmakefile"],
        decls: MAKE_DECLS,
        imports: MAKE_IMPORTS,
        import_block: None,
    },
    LanguageSpec {
        id: GENERIC_ID,
        extensions: &[
            "c", "h", "cpp", "cc", "cxx", "hpp", "java", "kt", "kts", "cs", "rb", "php", "swift",
            "scala", "lua", "pl", "pm", "sh", "bash", "zsh",
        ],
        filenames: &["Dockerfile", "Justfile", "justfile", "CMakeLists.txt"],
        decls: GENERIC_DECLS,
        imports: GENERIC_IMPORTS,
        import_block: None,
    },
];
