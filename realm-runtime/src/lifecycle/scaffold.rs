//! Stub files written by `realmCreate`, rendered from embedded templates.

use std::path::{Path, PathBuf};

use tera::{Context, Tera};

use crate::error::{io_err, RuntimeError};

// ---------------------------------------------------------------------------
// Embedded templates, baked in at compile time
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("gitignore.tera", include_str!("templates/gitignore.tera")),
    ("eslintrc.js.tera", include_str!("templates/eslintrc.js.tera")),
    ("jsconfig.json.tera", include_str!("templates/jsconfig.json.tera")),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stub {
    GitIgnore,
    Eslint,
    JsConfig,
}

impl Stub {
    fn template_name(self) -> &'static str {
        match self {
            Stub::GitIgnore => "gitignore.tera",
            Stub::Eslint => "eslintrc.js.tera",
            Stub::JsConfig => "jsconfig.json.tera",
        }
    }

    /// File name at the realm root.
    pub fn file_name(self) -> &'static str {
        match self {
            Stub::GitIgnore => ".gitignore",
            Stub::Eslint => ".eslintrc.js",
            Stub::JsConfig => "jsconfig.json",
        }
    }
}

pub(crate) struct Scaffolder {
    tera: Tera,
    context: Context,
}

impl Scaffolder {
    pub(crate) fn new(name: &str, description: Option<&str>) -> Result<Self, RuntimeError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TPLS.iter().copied())?;
        let mut context = Context::new();
        context.insert("name", name);
        context.insert("description", &description.unwrap_or_default());
        Ok(Self { tera, context })
    }

    pub(crate) fn render(&self, stub: Stub) -> Result<String, RuntimeError> {
        Ok(self.tera.render(stub.template_name(), &self.context)?)
    }

    pub(crate) fn write(&self, root: &Path, stub: Stub) -> Result<PathBuf, RuntimeError> {
        let path = root.join(stub.file_name());
        let contents = self.render(stub)?;
        std::fs::write(&path, contents).map_err(|e| io_err(&path, e))?;
        Ok(path)
    }
}
