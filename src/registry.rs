//! Template registry: template key -> template resource.
//!
//! The set of templates is closed. Keys arriving from a request are matched
//! against canonical keys and aliases; anything else resolves to
//! [`TemplateKind::DEFAULT`]. The registry is checked once against the loaded
//! template environment at startup and is read-only afterwards.

use minijinja::Environment;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::palette::ColorScheme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Grid,
    Minimalist,
    Colorful,
    Academic,
    ModernCard,
    Compact,
}

impl TemplateKind {
    pub const DEFAULT: TemplateKind = TemplateKind::Grid;

    pub const ALL: [TemplateKind; 6] = [
        TemplateKind::Grid,
        TemplateKind::Minimalist,
        TemplateKind::Colorful,
        TemplateKind::Academic,
        TemplateKind::ModernCard,
        TemplateKind::Compact,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            TemplateKind::Grid => "grid",
            TemplateKind::Minimalist => "minimalist",
            TemplateKind::Colorful => "colorful",
            TemplateKind::Academic => "academic",
            TemplateKind::ModernCard => "modern_card",
            TemplateKind::Compact => "compact",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            TemplateKind::ModernCard => &["modern"],
            _ => &[],
        }
    }

    pub fn resource_path(&self) -> &'static str {
        match self {
            TemplateKind::Grid => "timetable_grid.html",
            TemplateKind::Minimalist => "timetable_minimalist.html",
            TemplateKind::Colorful => "timetable_colorful.html",
            TemplateKind::Academic => "timetable_academic.html",
            TemplateKind::ModernCard => "timetable_modern_card.html",
            TemplateKind::Compact => "timetable_compact.html",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TemplateKind::Grid => "Classic grid",
            TemplateKind::Minimalist => "Minimalist",
            TemplateKind::Colorful => "Colorful",
            TemplateKind::Academic => "Academic",
            TemplateKind::ModernCard => "Modern cards",
            TemplateKind::Compact => "Compact",
        }
    }

    pub fn color_scheme(&self) -> ColorScheme {
        ColorScheme::for_template(*self)
    }

    /// Exact match on canonical keys and aliases, ignoring case and surrounding whitespace.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == key || kind.aliases().contains(&key.as_str()))
    }

    /// Resolves a request parameter, falling back to the default template.
    pub fn resolve(key: Option<&str>) -> Self {
        key.and_then(Self::from_key).unwrap_or(Self::DEFAULT)
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateDescriptor {
    pub kind: TemplateKind,
    pub key: &'static str,
    pub path: &'static str,
    pub aliases: &'static [&'static str],
    pub title: &'static str,
}

impl From<TemplateKind> for TemplateDescriptor {
    fn from(kind: TemplateKind) -> Self {
        Self {
            kind,
            key: kind.key(),
            path: kind.resource_path(),
            aliases: kind.aliases(),
            title: kind.title(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("template '{key}' points at '{path}', which is not loaded")]
    MissingTemplate { key: String, path: String },
    #[error("template key '{0}' is registered more than once")]
    DuplicateKey(String),
    #[error("alias '{alias}' of '{key}' collides with another key or alias")]
    AliasCollision { key: String, alias: String },
    #[error("template path for '{0}' is empty")]
    EmptyPath(String),
}

#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    descriptors: Vec<TemplateDescriptor>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::from_descriptors(TemplateKind::ALL.into_iter().map(Into::into).collect())
    }

    fn from_descriptors(descriptors: Vec<TemplateDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn descriptors(&self) -> &[TemplateDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, kind: TemplateKind) -> &TemplateDescriptor {
        self.descriptors
            .iter()
            .find(|d| d.kind == kind)
            .unwrap_or(&self.descriptors[0])
    }

    pub fn resolve(&self, key: Option<&str>) -> &TemplateDescriptor {
        self.descriptor(TemplateKind::resolve(key))
    }

    /// Every descriptor must point at a loaded template, keys must be unique
    /// and aliases may neither chain nor shadow a canonical key.
    pub fn validate(&self, env: &Environment<'_>) -> Result<(), RegistryError> {
        self.validate_keys()?;
        for descriptor in &self.descriptors {
            if descriptor.path.trim().is_empty() {
                return Err(RegistryError::EmptyPath(descriptor.key.to_string()));
            }
            if env.get_template(descriptor.path).is_err() {
                return Err(RegistryError::MissingTemplate {
                    key: descriptor.key.to_string(),
                    path: descriptor.path.to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_keys(&self) -> Result<(), RegistryError> {
        let mut keys = HashSet::with_capacity(self.descriptors.len());
        for descriptor in &self.descriptors {
            if !keys.insert(descriptor.key) {
                return Err(RegistryError::DuplicateKey(descriptor.key.to_string()));
            }
        }
        let mut aliases = HashSet::new();
        for descriptor in &self.descriptors {
            for alias in descriptor.aliases {
                if keys.contains(alias) || !aliases.insert(*alias) {
                    return Err(RegistryError::AliasCollision {
                        key: descriptor.key.to_string(),
                        alias: alias.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
