//! Module lexer.
//!
//! Scans JavaScript module source for its imports and exports without a
//! full parse, and notes whether the module is nothing but import and
//! re-export statements.

use std::collections::BTreeSet;

/// How a module refers to a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImportKind {
    /// `import ... from "x"` or `import "x"`.
    Static,
    /// `import("x")`.
    Dynamic,
    /// `export ... from "x"`.
    ReExport,
}

/// One import or re-export found in a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    /// Specifier exactly as written.
    pub specifier: String,
    pub kind: ImportKind,
}

impl ImportRecord {
    #[must_use]
    pub fn new(specifier: impl Into<String>, kind: ImportKind) -> Self {
        Self {
            specifier: specifier.into(),
            kind,
        }
    }

    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.kind == ImportKind::Dynamic
    }
}

/// What a scan found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Imports in source order.
    pub imports: Vec<ImportRecord>,
    /// Exported names. `export *` contributes none; `export * as ns` contributes `ns`.
    pub exports: Vec<String>,
    /// True when every top-level statement is an import or an export of bindings.
    pub facade: bool,
}

impl Default for ModuleInfo {
    fn default() -> Self {
        Self {
            imports: Vec::new(),
            exports: Vec::new(),
            facade: true,
        }
    }
}

impl ModuleInfo {
    /// Distinct specifiers of static imports and re-exports.
    #[must_use]
    pub fn import_sources(&self) -> BTreeSet<&str> {
        self.imports
            .iter()
            .filter(|r| !r.is_dynamic())
            .map(|r| r.specifier.as_str())
            .collect()
    }

    #[must_use]
    pub fn reexport_count(&self) -> usize {
        self.imports
            .iter()
            .filter(|r| r.kind == ImportKind::ReExport)
            .count()
    }

    /// A pure re-export wrapper around exactly one module.
    ///
    /// Requires a facade body, exactly one distinct source, exactly one
    /// named export and at least one re-export. `export *` names nothing,
    /// so a module that only star-exports is kept.
    #[must_use]
    pub fn is_facade(&self) -> bool {
        self.facade
            && self.import_sources().len() == 1
            && self.exports.len() == 1
            && self.reexport_count() >= 1
    }

    /// The module a facade forwards to.
    #[must_use]
    pub fn facade_target(&self) -> Option<&str> {
        if !self.is_facade() {
            return None;
        }
        self.import_sources().into_iter().next()
    }
}

/// Scan module source.
#[must_use]
pub fn scan_module(source: &str) -> ModuleInfo {
    let mut s = Scanner::new(source);
    let mut info = ModuleInfo::default();
    let mut depth = 0usize;

    loop {
        s.skip_trivia();
        let Some(c) = s.peek() else {
            break;
        };

        match c {
            ';' => s.pos += 1,
            '"' | '\'' => {
                s.skip_string();
                info.facade = false;
            }
            '`' => {
                s.skip_template();
                info.facade = false;
            }
            '{' | '(' | '[' => {
                depth += 1;
                s.pos += 1;
                info.facade = false;
            }
            '}' | ')' | ']' => {
                depth = depth.saturating_sub(1);
                s.pos += 1;
                info.facade = false;
            }
            c if is_ident_start(c) => {
                if s.at_keyword("import") {
                    scan_import(&mut s, &mut info, depth);
                } else if depth == 0 && s.at_keyword("export") {
                    scan_export(&mut s, &mut info);
                } else {
                    s.read_identifier();
                    info.facade = false;
                }
            }
            _ => {
                s.pos += 1;
                info.facade = false;
            }
        }
    }

    info
}

/// Handle the `import` keyword at the cursor.
fn scan_import(s: &mut Scanner, info: &mut ModuleInfo, depth: usize) {
    s.pos += "import".len();
    s.skip_trivia();

    match s.peek() {
        Some('(') => {
            // Record the literal argument, leave the parens to the main loop
            let save = s.pos;
            s.pos += 1;
            s.skip_trivia();
            if let Some(spec) = s.read_string() {
                s.skip_trivia();
                if s.peek() == Some(')') || s.peek() == Some(',') {
                    info.imports.push(ImportRecord::new(spec, ImportKind::Dynamic));
                }
            }
            s.pos = save;
            info.facade = false;
        }
        Some('.') => {
            // import.meta
            info.facade = false;
        }
        _ if depth == 0 => match scan_import_clause(s) {
            Some(spec) => info.imports.push(ImportRecord::new(spec, ImportKind::Static)),
            None => info.facade = false,
        },
        _ => info.facade = false,
    }
}

/// Scan from just after `import` to the end of the specifier string.
fn scan_import_clause(s: &mut Scanner) -> Option<String> {
    // Side-effect import: import "specifier"
    if let Some(spec) = s.read_string() {
        s.skip_attributes();
        return Some(spec);
    }

    let limit = s.pos + 1000;
    while s.pos < limit {
        s.skip_trivia();
        match s.peek()? {
            '{' => s.skip_braces(),
            ';' => return None,
            c if is_ident_start(c) => {
                if s.eat_keyword("from") {
                    s.skip_trivia();
                    let spec = s.read_string()?;
                    s.skip_attributes();
                    return Some(spec);
                }
                s.read_identifier();
            }
            _ => s.pos += 1,
        }
    }
    None
}

/// Handle the `export` keyword at the cursor.
fn scan_export(s: &mut Scanner, info: &mut ModuleInfo) {
    s.pos += "export".len();
    s.skip_trivia();

    match s.peek() {
        Some('*') => {
            s.pos += 1;
            s.skip_trivia();
            if s.eat_keyword("as") {
                s.skip_trivia();
                if let Some(name) = s.read_name() {
                    info.exports.push(name);
                }
                s.skip_trivia();
            }
            if s.eat_keyword("from") {
                s.skip_trivia();
                if let Some(spec) = s.read_string() {
                    s.skip_attributes();
                    info.imports.push(ImportRecord::new(spec, ImportKind::ReExport));
                    return;
                }
            }
            info.facade = false;
        }
        Some('{') => {
            info.exports.extend(s.read_export_clause());
            s.skip_trivia();
            if s.eat_keyword("from") {
                s.skip_trivia();
                match s.read_string() {
                    Some(spec) => {
                        s.skip_attributes();
                        info.imports.push(ImportRecord::new(spec, ImportKind::ReExport));
                    }
                    None => info.facade = false,
                }
            }
        }
        _ => {
            // Local declarations are module code
            info.facade = false;
            if let Some(name) = scan_export_declaration(s) {
                info.exports.push(name);
            }
        }
    }
}

/// Name bound by `export default ...` or `export <declaration>`.
///
/// Only the keyword and name are consumed; the body is left to the main loop.
fn scan_export_declaration(s: &mut Scanner) -> Option<String> {
    if s.eat_keyword("default") {
        return Some("default".to_string());
    }
    if s.eat_keyword("async") {
        s.skip_trivia();
    }
    if s.eat_keyword("function") {
        s.skip_trivia();
        if s.peek() == Some('*') {
            s.pos += 1;
            s.skip_trivia();
        }
        return s.read_identifier();
    }
    for keyword in ["class", "const", "let", "var", "enum"] {
        if s.eat_keyword(keyword) {
            s.skip_trivia();
            return s.read_identifier();
        }
    }
    None
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '/' && self.peek_at(1) == Some('/') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.pos += 1;
                }
            } else if c == '/' && self.peek_at(1) == Some('*') {
                self.pos += 2;
                while self.pos < self.chars.len()
                    && !(self.peek() == Some('*') && self.peek_at(1) == Some('/'))
                {
                    self.pos += 1;
                }
                self.pos = (self.pos + 2).min(self.chars.len());
            } else {
                break;
            }
        }
    }

    /// Check if the cursor is at `keyword` with word boundaries on both sides.
    fn at_keyword(&self, keyword: &str) -> bool {
        let len = keyword.chars().count();
        if self.pos + len > self.chars.len() {
            return false;
        }
        if self.pos > 0 && is_ident_char(self.chars[self.pos - 1]) {
            return false;
        }
        if !keyword
            .chars()
            .zip(&self.chars[self.pos..])
            .all(|(a, &b)| a == b)
        {
            return false;
        }
        !self.peek_at(len).is_some_and(is_ident_char)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += keyword.chars().count();
            true
        } else {
            false
        }
    }

    fn read_identifier(&mut self) -> Option<String> {
        let start = self.pos;
        if !self.peek().is_some_and(is_ident_start) {
            return None;
        }
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        Some(self.chars[start..self.pos].iter().collect())
    }

    /// Identifier or string literal name, as in `export * as "a-b"`.
    fn read_name(&mut self) -> Option<String> {
        self.read_string().or_else(|| self.read_identifier())
    }

    /// Read a string literal, or a template literal without substitutions.
    fn read_string(&mut self) -> Option<String> {
        let quote = self.peek()?;
        if !is_quote(quote) && quote != '`' {
            return None;
        }
        let save = self.pos;
        self.pos += 1;
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c == quote {
                self.pos += 1;
                return Some(value);
            }
            if c == '\\' {
                if let Some(escaped) = self.peek_at(1) {
                    value.push(escaped);
                }
                self.pos += 2;
                continue;
            }
            let broken = (c == '\n' && quote != '`')
                || (quote == '`' && c == '$' && self.peek_at(1) == Some('{'));
            if broken {
                break;
            }
            value.push(c);
            self.pos += 1;
        }
        self.pos = save;
        None
    }

    fn skip_string(&mut self) {
        let Some(quote) = self.peek() else {
            return;
        };
        self.pos += 1;
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '\\' {
                self.pos += 1;
            } else if c == quote || c == '\n' {
                break;
            }
        }
    }

    fn skip_template(&mut self) {
        self.pos += 1;
        while let Some(c) = self.peek() {
            match c {
                '\\' => self.pos += 2,
                '`' => {
                    self.pos += 1;
                    return;
                }
                '$' if self.peek_at(1) == Some('{') => {
                    self.pos += 2;
                    self.skip_block_body();
                }
                _ => self.pos += 1,
            }
        }
    }

    /// Skip a `{ ... }` block starting at the cursor.
    fn skip_braces(&mut self) {
        self.pos += 1;
        self.skip_block_body();
    }

    /// Skip to just past the `}` closing an already-opened block.
    fn skip_block_body(&mut self) {
        let mut depth = 1usize;
        loop {
            self.skip_trivia();
            let Some(c) = self.peek() else {
                return;
            };
            match c {
                '"' | '\'' => self.skip_string(),
                '`' => self.skip_template(),
                '{' => {
                    depth += 1;
                    self.pos += 1;
                }
                '}' => {
                    self.pos += 1;
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => self.pos += 1,
            }
        }
    }

    /// Skip `with { ... }` / `assert { ... }` import attributes.
    fn skip_attributes(&mut self) {
        let save = self.pos;
        self.skip_trivia();
        if self.eat_keyword("with") || self.eat_keyword("assert") {
            self.skip_trivia();
            if self.peek() == Some('{') {
                self.skip_braces();
                return;
            }
        }
        self.pos = save;
    }

    /// Exported names of an `{ a, b as c }` clause starting at the cursor.
    fn read_export_clause(&mut self) -> Vec<String> {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != '}') {
            self.pos += 1;
        }
        let body: String = self.chars[start..self.pos].iter().collect();
        self.pos = (self.pos + 1).min(self.chars.len());

        body.split(',')
            .filter_map(|item| {
                let tokens: Vec<&str> = item.split_whitespace().collect();
                match tokens.as_slice() {
                    [] | ["type", _, ..] => None,
                    [.., "as", name] | [name] => {
                        Some(name.trim_matches(|c| c == '"' || c == '\'').to_string())
                    }
                    [name, ..] => Some((*name).to_string()),
                }
            })
            .collect()
    }
}
