use minijinja::Environment;
use std::collections::HashSet;
use std::sync::Arc;
use timeli::{
    DocumentConverter, DocumentFormat, RegistryError, RenderError, TemplateKind, TemplateRegistry,
    TimetableRenderer,
};

struct NoopConverter;

impl DocumentConverter for NoopConverter {
    fn convert(&self, html: &str, _format: DocumentFormat) -> Result<Vec<u8>, RenderError> {
        Ok(html.as_bytes().to_vec())
    }
}

#[test]
fn every_registered_key_resolves_to_a_loaded_template() {
    let renderer = TimetableRenderer::embedded(Arc::new(NoopConverter)).expect("embedded templates");
    let registry = renderer.registry();
    assert_eq!(registry.descriptors().len(), TemplateKind::ALL.len());

    for descriptor in registry.descriptors() {
        let resolved = registry.resolve(Some(descriptor.key));
        assert_eq!(resolved.kind, descriptor.kind);
        assert!(!resolved.path.is_empty());
        assert!(resolved.path.starts_with("timetable_"));
        assert!(resolved.path.ends_with(".html"));
    }
}

#[test]
fn keys_and_paths_are_unique() {
    let registry = TemplateRegistry::new();
    let keys: HashSet<_> = registry.descriptors().iter().map(|d| d.key).collect();
    let paths: HashSet<_> = registry.descriptors().iter().map(|d| d.path).collect();
    assert_eq!(keys.len(), 6);
    assert_eq!(paths.len(), 6);
}

#[test]
fn unknown_or_missing_keys_fall_back_to_grid() {
    let registry = TemplateRegistry::new();
    let grid = "timetable_grid.html";
    assert_eq!(registry.resolve(None).path, grid);
    assert_eq!(registry.resolve(Some("")).path, grid);
    assert_eq!(registry.resolve(Some("   ")).path, grid);
    assert_eq!(registry.resolve(Some("fancy")).path, grid);
    assert_eq!(registry.resolve(Some("timetable_colorful.html")).path, grid);
    assert_eq!(TemplateKind::resolve(Some("nope")), TemplateKind::DEFAULT);
}

#[test]
fn modern_alias_matches_modern_card() {
    let registry = TemplateRegistry::new();
    let alias = registry.resolve(Some("modern"));
    let canonical = registry.resolve(Some("modern_card"));
    assert_eq!(alias.path, canonical.path);
    assert_eq!(alias.path, "timetable_modern_card.html");
    assert_eq!(TemplateKind::from_key(" Modern "), Some(TemplateKind::ModernCard));
}

#[test]
fn key_lookup_ignores_case_and_whitespace() {
    assert_eq!(TemplateKind::from_key("COLORFUL"), Some(TemplateKind::Colorful));
    assert_eq!(TemplateKind::from_key(" compact\n"), Some(TemplateKind::Compact));
    assert_eq!(TemplateKind::from_key(""), None);
}

#[test]
fn validation_fails_when_a_template_is_not_loaded() {
    let registry = TemplateRegistry::new();
    let env = Environment::new();
    let err = registry.validate(&env).unwrap_err();
    assert_eq!(
        err,
        RegistryError::MissingTemplate {
            key: "grid".into(),
            path: "timetable_grid.html".into(),
        }
    );
}

#[test]
fn validation_passes_once_every_path_is_loaded() {
    let registry = TemplateRegistry::new();
    let mut env = Environment::new();
    for kind in TemplateKind::ALL {
        env.add_template(kind.resource_path(), "{{ template }}")
            .unwrap();
    }
    registry.validate(&env).expect("all templates present");
}
