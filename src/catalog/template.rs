//! catalog::template
//!
//! Profile name templates.
//!
//! Placeholders are written `{{ .Name }}` or `{{ Name }}`; everything else is
//! copied literally. A template is parsed once and rendered per role; a
//! placeholder that names no known variable fails the render.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use ssoenv::catalog::ProfileTemplate;
//!
//! let template = ProfileTemplate::parse("{{ .AccountName }}:{{ RoleName }}").unwrap();
//! let mut vars = BTreeMap::new();
//! vars.insert("AccountName".to_string(), "prod".to_string());
//! vars.insert("RoleName".to_string(), "admin".to_string());
//! assert_eq!(template.render(&vars).unwrap(), "prod:admin");
//! ```

use std::collections::BTreeMap;

use regex::Regex;

use super::errors::CatalogError;

const PLACEHOLDER: &str = r"\{\{\s*\.?([A-Za-z_][A-Za-z0-9_]*)\s*\}\}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Var(String),
}

/// A parsed profile template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileTemplate {
    source: String,
    parts: Vec<Part>,
}

impl ProfileTemplate {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Template` for an empty template or for `{{` /
    /// `}}` that do not form a placeholder.
    pub fn parse(source: &str) -> Result<Self, CatalogError> {
        if source.trim().is_empty() {
            return Err(CatalogError::Template("template is empty".into()));
        }
        let placeholder = Regex::new(PLACEHOLDER).map_err(|e| CatalogError::Template(e.to_string()))?;

        let mut parts = Vec::new();
        let mut cursor = 0;
        for caps in placeholder.captures_iter(source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_literal(&mut parts, &source[cursor..whole.start()])?;
            parts.push(Part::Var(name.as_str().to_string()));
            cursor = whole.end();
        }
        push_literal(&mut parts, &source[cursor..])?;

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Variable names referenced by the template, in order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            Part::Var(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }

    /// Render against a variable map.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Template` naming the first unknown variable.
    pub fn render(&self, vars: &BTreeMap<String, String>) -> Result<String, CatalogError> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Var(name) => {
                    let value = vars.get(name).ok_or_else(|| {
                        CatalogError::Template(format!(
                            "unknown variable '{}' in '{}'",
                            name, self.source
                        ))
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

fn push_literal(parts: &mut Vec<Part>, text: &str) -> Result<(), CatalogError> {
    if text.contains("{{") || text.contains("}}") {
        return Err(CatalogError::Template(format!(
            "malformed placeholder near '{}'",
            text
        )));
    }
    if !text.is_empty() {
        parts.push(Part::Literal(text.to_string()));
    }
    Ok(())
}
