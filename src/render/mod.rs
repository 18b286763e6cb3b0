//! Template environment, HTML rendering and document conversion.
//!
//! [`TimetableRenderer`] is built once at startup. It loads the template
//! files, checks the registry against them, and is then shared read-only
//! between request handlers. Turning HTML into PDF or JPG bytes is delegated
//! to a [`DocumentConverter`].

use minijinja::Environment;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::context::RenderContext;
use crate::registry::{RegistryError, TemplateKind, TemplateRegistry};
use crate::source::TimetableType;

pub mod wkhtml;

pub use wkhtml::WkhtmlConverter;

const BASE_TEMPLATE: &str = "base.html";

const EMBEDDED_TEMPLATES: &[(&str, &str)] = &[
    (BASE_TEMPLATE, include_str!("../../templates/base.html")),
    (
        "timetable_grid.html",
        include_str!("../../templates/timetable_grid.html"),
    ),
    (
        "timetable_minimalist.html",
        include_str!("../../templates/timetable_minimalist.html"),
    ),
    (
        "timetable_colorful.html",
        include_str!("../../templates/timetable_colorful.html"),
    ),
    (
        "timetable_academic.html",
        include_str!("../../templates/timetable_academic.html"),
    ),
    (
        "timetable_modern_card.html",
        include_str!("../../templates/timetable_modern_card.html"),
    ),
    (
        "timetable_compact.html",
        include_str!("../../templates/timetable_compact.html"),
    ),
];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
    #[error("template registry misconfigured: {0}")]
    Registry(#[from] RegistryError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("document conversion failed: {0}")]
    Conversion(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Jpg,
    Html,
}

impl DocumentFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Jpg => "image/jpeg",
            DocumentFormat::Html => "text/html; charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Jpg => "jpg",
            DocumentFormat::Html => "html",
        }
    }

    /// Download filename; varies with the template so different styles do not overwrite each other.
    pub fn filename(&self, template: TemplateKind, timetable_type: TimetableType) -> String {
        let stem = match (self, timetable_type.is_exam()) {
            (DocumentFormat::Jpg, true) => "my_exam_schedule",
            (DocumentFormat::Jpg, false) => "my_class_schedule",
            _ => "my_timetable",
        };
        format!("{stem}_{}.{}", template.key(), self.extension())
    }
}

/// HTML -> document bytes. Implementations may block; callers on an async
/// runtime run them on a blocking thread.
pub trait DocumentConverter: Send + Sync {
    fn convert(&self, html: &str, format: DocumentFormat) -> Result<Vec<u8>, RenderError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderConfig {
    /// Directory whose files replace the embedded templates of the same name.
    pub template_dir: Option<PathBuf>,
}

pub struct TimetableRenderer {
    env: Environment<'static>,
    registry: TemplateRegistry,
    converter: Arc<dyn DocumentConverter>,
}

impl TimetableRenderer {
    /// Loads templates and validates the registry. Any error here is fatal.
    pub fn new(
        config: &RenderConfig,
        converter: Arc<dyn DocumentConverter>,
    ) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        for &(name, embedded) in EMBEDDED_TEMPLATES {
            let override_path = config.template_dir.as_ref().map(|dir| dir.join(name));
            match override_path {
                Some(path) if path.is_file() => {
                    let source = fs::read_to_string(&path)?;
                    tracing::debug!(template = name, path = %path.display(), "using template override");
                    env.add_template_owned(name, source)?;
                }
                _ => env.add_template(name, embedded)?,
            }
        }

        let registry = TemplateRegistry::new();
        registry.validate(&env)?;

        Ok(Self {
            env,
            registry,
            converter,
        })
    }

    pub fn embedded(converter: Arc<dyn DocumentConverter>) -> Result<Self, RenderError> {
        Self::new(&RenderConfig::default(), converter)
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn render_html(&self, context: &RenderContext) -> Result<String, RenderError> {
        let template = self.env.get_template(context.template_path)?;
        Ok(template.render(context)?)
    }

    pub fn render_document(
        &self,
        context: &RenderContext,
        format: DocumentFormat,
    ) -> Result<RenderedDocument, RenderError> {
        let html = self.render_html(context)?;
        let bytes = match format {
            DocumentFormat::Html => html.into_bytes(),
            _ => self.converter.convert(&html, format)?,
        };
        Ok(RenderedDocument {
            bytes,
            content_type: format.content_type(),
            filename: format.filename(context.kind(), context.source.timetable_type),
        })
    }
}
