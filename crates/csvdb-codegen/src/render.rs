//! Template environment shared by the backends

use crate::CodegenError;
use minijinja::{AutoEscape, Environment};
use serde::Serialize;

/// Built-in templates, by name
const TEMPLATES: [(&str, &str); 4] = [
    ("db.h", include_str!("../templates/db.h.j2")),
    ("db.cpp", include_str!("../templates/db.cpp.j2")),
    ("db_types.rs", include_str!("../templates/db_types.rs.j2")),
    ("db.rs", include_str!("../templates/db.rs.j2")),
];

/// Renders the built-in code templates
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    /// Load every built-in template
    pub fn new() -> Result<Self, CodegenError> {
        let mut env = Environment::new();

        // Block tags sit on their own lines; keep output exactly as laid out
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);

        env.add_filter("cpp_type", crate::cpp::cpp_type_filter);

        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }

        Ok(Self { env })
    }

    /// Render one template with the given view
    pub fn render<S: Serialize>(&self, name: &str, view: &S) -> Result<String, CodegenError> {
        let template = self.env.get_template(name)?;
        let text = template.render(view)?;
        tracing::debug!(template = name, bytes = text.len(), "rendered template");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_templates_load() {
        let renderer = Renderer::new().unwrap();
        for (name, _) in TEMPLATES {
            assert!(renderer.env.get_template(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn unknown_template_is_an_error() {
        let renderer = Renderer::new().unwrap();
        let err = renderer.render("missing", &()).unwrap_err();
        assert!(matches!(err, CodegenError::Template(_)));
    }
}
