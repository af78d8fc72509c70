//! The CSS AST collector (§4.D): parses transformed CSS and exposes the three node streams the
//! load engine consumes — `@import` at-rules, `@value` at-rules, and class selector occurrences —
//! plus the set of locally-exported class names (§4.E), which lightningcss's own CSS Modules
//! pipeline already computes for us.

use std::collections::HashSet;
use std::path::Path;

use lightningcss::css_modules::Config as CssModulesConfig;
use lightningcss::printer::PrinterOptions;
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{ParserOptions, StyleSheet};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::LoadError;
use crate::location::{Location, PositionMapper};

/// A parsed `@value name: value;` declaration.
#[derive(Debug, Clone)]
pub struct ValueDeclaration {
    pub token_name: String,
    pub location: Location,
}

/// One `name` or `name as alias` entry inside `@value a, b as c from "...";`.
#[derive(Debug, Clone)]
pub struct ValueImport {
    pub local_token_name: String,
    pub imported_token_name: String,
}

/// A parsed `@value a, b as c from "./src.css";` declaration.
#[derive(Debug, Clone)]
pub struct ValueImportDeclaration {
    pub from: String,
    pub imports: Vec<ValueImport>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub enum AtValue {
    Declaration(ValueDeclaration),
    ImportDeclaration(ValueImportDeclaration),
}

/// An `@import` at-rule's target specifier (already unquoted by lightningcss) plus its source
/// location.
#[derive(Debug, Clone)]
pub struct ImportNode {
    pub specifier: String,
    pub location: Location,
}

/// One occurrence of a class selector, paired with its owning rule's location.
#[derive(Debug, Clone)]
pub struct ClassSelectorOccurrence {
    pub name: String,
    pub location: Location,
}

pub struct CssAst {
    pub imports: Vec<ImportNode>,
    pub at_values: Vec<AtValue>,
    pub class_selectors: Vec<ClassSelectorOccurrence>,
    /// Names lightningcss's CSS Modules exports pass considers locally declared, i.e. not
    /// exclusively reached through `:global(...)`.
    pub local_token_names: HashSet<String>,
    /// Specifiers reached through `composes: … from "./other.css"`, de-duplicated, in
    /// first-seen order. `composes` never contributes a token of its own (§1), only a
    /// dependency edge, so these are tracked separately from `imports`.
    pub composes_specifiers: Vec<String>,
}

// `@value` is not part of standard CSS, so lightningcss (configured with `error_recovery`) simply
// drops these at-rules rather than erroring. We recover their content with a line-oriented scan
// over the same source text handed to the parser, which keeps positions in sync with the AST
// collector's fallback (non-source-mapped) locations.
static VALUE_IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^[^\S\n]*@value\s+([^;]+?)\s+from\s+(['"])([^'"]+)\2\s*;"#).unwrap());
static VALUE_DECL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[^\S\n]*@value\s+([A-Za-z_][\w-]*)\s*:\s*([^;]+);").unwrap());

pub fn collect(css: &str, from: &Path, mapper: &PositionMapper) -> Result<CssAst, LoadError> {
    let stylesheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: from.to_string_lossy().into_owned(),
            css_modules: Some(CssModulesConfig::default()),
            error_recovery: true,
            ..Default::default()
        },
    )
    .map_err(|err| LoadError::Syntax {
        file: from.to_path_buf(),
        line: err.loc.map(|l| l.line + 1).unwrap_or(0),
        column: err.loc.map(|l| l.column.saturating_sub(1)).unwrap_or(0),
        message: err.to_string(),
    })?;

    let mut imports = Vec::new();
    let mut class_selectors = Vec::new();
    collect_rules(&stylesheet.rules.0, from, mapper, &mut imports, &mut class_selectors);

    let printed = stylesheet
        .to_css(PrinterOptions {
            analyze_dependencies: None,
            ..Default::default()
        })
        .map_err(|err| LoadError::Syntax {
            file: from.to_path_buf(),
            line: 0,
            column: 0,
            message: err.to_string(),
        })?;
    let composes_specifiers = crate::locals::composes_specifiers(printed.exports.as_ref());
    let local_token_names = crate::locals::enumerate(printed.exports);

    let at_values = collect_at_values(css, mapper);

    Ok(CssAst {
        imports,
        at_values,
        class_selectors,
        local_token_names,
        composes_specifiers,
    })
}

fn collect_rules(
    rules: &[CssRule<'_>],
    from: &Path,
    mapper: &PositionMapper,
    imports: &mut Vec<ImportNode>,
    class_selectors: &mut Vec<ClassSelectorOccurrence>,
) {
    for rule in rules {
        match rule {
            CssRule::Import(import) => {
                let loc = mapper.resolve(import.loc.line + 1, import.loc.column.saturating_sub(1));
                imports.push(ImportNode {
                    specifier: import.url.to_string(),
                    location: loc,
                });
            }
            CssRule::Style(style) => {
                let loc = mapper.resolve(style.loc.line + 1, style.loc.column.saturating_sub(1));
                for selector in style.selectors.0.iter() {
                    for component in selector.iter_raw_match_order() {
                        if let Some(name) = class_component_name(component) {
                            class_selectors.push(ClassSelectorOccurrence {
                                name,
                                location: loc.clone(),
                            });
                        }
                    }
                }
                collect_rules(&style.rules.0, from, mapper, imports, class_selectors);
            }
            CssRule::Media(media) => collect_rules(&media.rules.0, from, mapper, imports, class_selectors),
            CssRule::Supports(supports) => {
                collect_rules(&supports.rules.0, from, mapper, imports, class_selectors)
            }
            CssRule::LayerBlock(layer) => {
                collect_rules(&layer.rules.0, from, mapper, imports, class_selectors)
            }
            _ => {}
        }
    }
}

/// Extracts the bare class name out of a `parcel_selectors` match-order component, if it is one.
fn class_component_name(component: &lightningcss::selector::Component<'_>) -> Option<String> {
    use lightningcss::selector::Component;
    match component {
        Component::Class(name) => Some(name.0.to_string()),
        _ => None,
    }
}

fn collect_at_values(css: &str, mapper: &PositionMapper) -> Vec<AtValue> {
    let mut matches: Vec<(usize, AtValue)> = Vec::new();

    for m in VALUE_IMPORT_RE.captures_iter(css) {
        let full = m.get(0).unwrap();
        let (line, column) = line_col_of(css, full.start());
        let location = mapper.resolve(line, column);
        let imports = m[1]
            .split(',')
            .filter_map(|entry| {
                let entry = entry.trim();
                if entry.is_empty() {
                    return None;
                }
                match entry.split_once(" as ") {
                    Some((local, alias)) => Some(ValueImport {
                        local_token_name: alias.trim().to_string(),
                        imported_token_name: local.trim().to_string(),
                    }),
                    None => Some(ValueImport {
                        local_token_name: entry.to_string(),
                        imported_token_name: entry.to_string(),
                    }),
                }
            })
            .collect();
        matches.push((
            full.start(),
            AtValue::ImportDeclaration(ValueImportDeclaration {
                from: m[3].to_string(),
                imports,
                location,
            }),
        ));
    }

    for m in VALUE_DECL_RE.captures_iter(css) {
        let full = m.get(0).unwrap();
        // A value-import already matched this span; don't double-count it as a declaration.
        if matches.iter().any(|(start, _)| *start == full.start()) {
            continue;
        }
        let (line, column) = line_col_of(css, full.start());
        let location = mapper.resolve(line, column);
        matches.push((
            full.start(),
            AtValue::Declaration(ValueDeclaration {
                token_name: m[1].trim().to_string(),
                location,
            }),
        ));
    }

    matches.sort_by_key(|(start, _)| *start);
    matches.into_iter().map(|(_, value)| value).collect()
}

fn line_col_of(css: &str, byte_offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut last_newline = 0usize;
    for (idx, ch) in css[..byte_offset].char_indices() {
        if ch == '\n' {
            line += 1;
            last_newline = idx + 1;
        }
    }
    let column = (byte_offset - last_newline) as u32;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn mapper(path: &str) -> PositionMapper {
        PositionMapper::new(None, PathBuf::from(path))
    }

    #[test]
    fn collects_class_selectors_in_document_order() {
        let css = ".block { color: red; } .myClass { color: blue; } .box { color: green; }";
        let ast = collect(css, Path::new("combined.css"), &mapper("combined.css")).unwrap();
        let names: Vec<_> = ast.class_selectors.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["block", "myClass", "box"]);
    }

    #[test]
    fn global_selector_is_excluded_from_locals() {
        let css = ":global(.shared) { color: red; } .local { color: blue; }";
        let ast = collect(css, Path::new("a.css"), &mapper("a.css")).unwrap();
        assert!(ast.local_token_names.contains("local"));
        assert!(!ast.local_token_names.contains("shared"));
    }

    #[test]
    fn collects_value_declaration_and_import() {
        let css = "@value v1: red;\n@value v2: v1;\n@value a, b as c from \"./src.css\";\n";
        let ast = collect(css, Path::new("v.css"), &mapper("v.css")).unwrap();
        assert_eq!(ast.at_values.len(), 3);
    }

    #[test]
    fn composes_from_reference_is_collected_as_a_specifier() {
        let css = ".root { composes: base from \"./base.css\"; }";
        let ast = collect(css, Path::new("composer.css"), &mapper("composer.css")).unwrap();
        assert_eq!(ast.composes_specifiers, vec!["./base.css".to_string()]);
    }

    #[test]
    fn invalid_css_surfaces_as_syntax_error() {
        let css = "{{{ not css";
        let err = collect(css, Path::new("bad.css"), &mapper("bad.css")).unwrap_err();
        assert!(matches!(err, LoadError::Syntax { .. }));
    }
}
