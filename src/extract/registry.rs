//! Extractor registry: path → language lookup and rule-table dispatch
//!
//! The registry compiles every rule pattern once at construction and then
//! dispatches purely on data. Extraction never panics past this boundary;
//! any internal failure is an `Err` the scanner maps to an empty result.

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{ParseError, ParseOutcome};
use crate::extract::rules::{DeclRule, ExportRule, GENERIC_ID, ImportRule, LANGUAGES, LanguageSpec};
use crate::types::{FileExtraction, ImportEdge, Symbol, SymbolKind};

/// Type-safe language identifier
///
/// Uses &'static str for zero-cost comparisons; the string is always a
/// compile-time constant from the language table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LanguageId(&'static str);

impl LanguageId {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for LanguageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signature text is capped so pathological lines cannot bloat the index
const MAX_SIGNATURE_LEN: usize = 160;

struct CompiledDecl {
    regex: Regex,
    kind: SymbolKind,
    export: ExportRule,
}

struct CompiledImport {
    regex: Regex,
    split_last_segment: bool,
}

struct CompiledBlock {
    open: &'static str,
    close: &'static str,
    inner: Regex,
}

struct CompiledLanguage {
    id: LanguageId,
    decls: Vec<CompiledDecl>,
    imports: Vec<CompiledImport>,
    import_block: Option<CompiledBlock>,
}

/// Maps file paths to languages and dispatches extraction
pub struct ExtractorRegistry {
    languages: Vec<CompiledLanguage>,
    by_extension: HashMap<&'static str, usize>,
    by_filename: HashMap<&'static str, usize>,
    generic: usize,
}

impl ExtractorRegistry {
    /// Compile the full language table. Fails only if a rule pattern in the
    /// table is invalid, which is a defect caught by the unit tests.
    pub fn new() -> ParseOutcome<Self> {
        let mut languages = Vec::with_capacity(LANGUAGES.len());
        let mut by_extension = HashMap::new();
        let mut by_filename = HashMap::new();
        let mut generic = 0;

        for (idx, spec) in LANGUAGES.iter().enumerate() {
            languages.push(Self::compile(spec)?);
            for ext in spec.extensions {
                by_extension.insert(*ext, idx);
            }
            for name in spec.filenames {
                by_filename.insert(*name, idx);
            }
            if spec.id == GENERIC_ID {
                generic = idx;
            }
        }

        Ok(Self {
            languages,
            by_extension,
            by_filename,
            generic,
        })
    }

    fn compile(spec: &LanguageSpec) -> ParseOutcome<CompiledLanguage> {
        let compile_one = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ParseError::RuleInit {
                language: spec.id.to_string(),
                reason: e.to_string(),
            })
        };

        let mut decls = Vec::with_capacity(spec.decls.len());
        for rule in spec.decls {
            let DeclRule {
                kind,
                pattern,
                export,
            } = *rule;
            decls.push(CompiledDecl {
                regex: compile_one(pattern)?,
                kind,
                export,
            });
        }

        let mut imports = Vec::with_capacity(spec.imports.len());
        for rule in spec.imports {
            let ImportRule {
                pattern,
                split_last_segment,
            } = *rule;
            imports.push(CompiledImport {
                regex: compile_one(pattern)?,
                split_last_segment,
            });
        }

        let import_block = match spec.import_block {
            Some(block) => Some(CompiledBlock {
                open: block.open,
                close: block.close,
                inner: compile_one(block.inner)?,
            }),
            None => None,
        };

        Ok(CompiledLanguage {
            id: LanguageId(spec.id),
            decls,
            imports,
            import_block,
        })
    }

    /// Look up the language for a path by extension or conventional
    /// extensionless file name. Returns None for unrecognized files.
    pub fn language_for_path(&self, path: &Path) -> Option<LanguageId> {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            let lowered = ext.to_ascii_lowercase();
            if let Some(idx) = self.by_extension.get(lowered.as_str()) {
                return Some(self.languages[*idx].id);
            }
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if let Some(idx) = self.by_filename.get(name) {
                return Some(self.languages[*idx].id);
            }
        }
        None
    }

    /// Whether the scanner should index this file at all
    pub fn is_indexable(&self, path: &Path) -> bool {
        self.language_for_path(path).is_some()
    }

    /// Extract symbols and imports from one file's content.
    ///
    /// Unknown language ids dispatch to the generic fallback extractor.
    /// `file` is stamped onto every produced symbol.
    pub fn extract(
        &self,
        language: LanguageId,
        file: &Path,
        content: &str,
    ) -> ParseOutcome<FileExtraction> {
        if content.contains('\0') {
            return Err(ParseError::BinaryContent);
        }

        let lang = self
            .languages
            .iter()
            .find(|l| l.id == language)
            .unwrap_or(&self.languages[self.generic]);

        let lines: Vec<&str> = content.lines().collect();
        let mut symbols: Vec<Symbol> = Vec::new();
        let mut imports: Vec<ImportEdge> = Vec::new();
        let mut in_block = false;

        for (i, raw) in lines.iter().enumerate() {
            let line_no = (i + 1) as u32;
            // Skip pathological lines (minified bundles etc.)
            if raw.len() > 2000 {
                continue;
            }

            if in_block {
                if let Some(block) = &lang.import_block {
                    if raw.trim() == block.close {
                        in_block = false;
                    } else if let Some(caps) = block.inner.captures(raw) {
                        if let Some(module) = caps.name("module") {
                            imports.push(ImportEdge {
                                source_module: module.as_str().to_string(),
                                imported_names: Vec::new(),
                                used_by: Vec::new(),
                            });
                        }
                    }
                }
                continue;
            }

            if let Some(block) = &lang.import_block {
                if raw.trim_start().starts_with(block.open) {
                    in_block = true;
                    continue;
                }
            }

            if let Some(symbol) = match_decl(lang, file, raw, line_no) {
                symbols.push(symbol);
                continue;
            }

            if let Some(edge) = match_import(lang, raw) {
                imports.push(edge);
            }
        }

        close_spans(&mut symbols, lines.len() as u32);
        resolve_used_by(&mut imports, &symbols, &lines);

        Ok(FileExtraction { symbols, imports })
    }
}

fn match_decl(lang: &CompiledLanguage, file: &Path, line: &str, line_no: u32) -> Option<Symbol> {
    for decl in &lang.decls {
        let Some(caps) = decl.regex.captures(line) else {
            continue;
        };
        let name = caps.name("name")?.as_str().to_string();
        let exported = match decl.export {
            ExportRule::Marker => caps.name("exp").is_some(),
            ExportRule::NotUnderscore => !name.starts_with('_'),
            ExportRule::UppercaseInitial => name.chars().next().is_some_and(|c| c.is_uppercase()),
        };
        let signature = make_signature(line);
        return Some(Symbol {
            name,
            kind: decl.kind,
            start_line: line_no,
            end_line: line_no,
            exported,
            signature,
            file: file.to_path_buf(),
        });
    }
    None
}

fn match_import(lang: &CompiledLanguage, line: &str) -> Option<ImportEdge> {
    for import in &lang.imports {
        let Some(caps) = import.regex.captures(line) else {
            continue;
        };
        let mut module = caps.name("module")?.as_str().to_string();
        let mut names: Vec<String> = caps
            .name("names")
            .map(|m| split_import_names(m.as_str()))
            .unwrap_or_default();

        if import.split_last_segment && names.is_empty() {
            if let Some((prefix, last)) = module.rsplit_once("::") {
                names.push(last.to_string());
                module = prefix.to_string();
            }
        }

        return Some(ImportEdge {
            source_module: module,
            imported_names: names,
            used_by: Vec::new(),
        });
    }
    None
}

fn split_import_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| {
            let part = part.trim().trim_matches(|c| c == '(' || c == ')');
            // `x as y` binds the name y locally
            match part.rsplit_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => part,
            }
        })
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn make_signature(line: &str) -> Option<String> {
    let trimmed = line.trim().trim_end_matches('{').trim_end();
    if trimmed.is_empty() {
        return None;
    }
    let mut sig = trimmed.to_string();
    if sig.len() > MAX_SIGNATURE_LEN {
        let cut = sig
            .char_indices()
            .take_while(|(i, _)| *i < MAX_SIGNATURE_LEN)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        sig.truncate(cut);
    }
    Some(sig)
}

/// Heuristic span closing: a symbol extends until the line before the next
/// declaration, or the end of file for the last one.
fn close_spans(symbols: &mut [Symbol], total_lines: u32) {
    let next_starts: Vec<u32> = symbols.iter().skip(1).map(|s| s.start_line).collect();
    for (i, symbol) in symbols.iter_mut().enumerate() {
        symbol.end_line = match next_starts.get(i) {
            Some(next) => (*next - 1).max(symbol.start_line),
            None => total_lines.max(symbol.start_line),
        };
    }
}

/// Records, per import edge, which symbols lexically use one of its
/// imported identifiers inside their line span.
fn resolve_used_by(imports: &mut [ImportEdge], symbols: &[Symbol], lines: &[&str]) {
    for edge in imports.iter_mut() {
        let probes: Vec<&str> = if edge.imported_names.iter().any(|n| n != "*") {
            edge.imported_names
                .iter()
                .filter(|n| n.as_str() != "*")
                .map(String::as_str)
                .collect()
        } else {
            // Bare import: probe for the final module path segment
            let last = edge
                .source_module
                .rsplit(|c| c == ':' || c == '.' || c == '/')
                .next()
                .unwrap_or(edge.source_module.as_str());
            if last.is_empty() { vec![] } else { vec![last] }
        };

        for symbol in symbols {
            let start = symbol.start_line as usize - 1;
            let end = (symbol.end_line as usize).min(lines.len());
            let uses = lines[start..end]
                .iter()
                .any(|line| probes.iter().any(|probe| contains_ident(line, probe)));
            if uses && !edge.used_by.contains(&symbol.name) {
                edge.used_by.push(symbol.name.clone());
            }
        }
    }
}

/// Whole-identifier containment check (no regex per probe)
fn contains_ident(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let bytes = haystack.as_bytes();
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(needle) {
        let start = from + pos;
        let end = start + needle.len();
        let left_ok = start == 0 || !is_ident_byte(bytes[start - 1]);
        let right_ok = end >= bytes.len() || !is_ident_byte(bytes[end]);
        if left_ok && right_ok {
            return true;
        }
        // Step over the first char of the match; a fixed +1 can land inside
        // a multi-byte character and panic on the reslice
        from = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
    }
    false
}

fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}
