use anyhow::{Context as _, Result};
use tera::Tera;

use crate::prompt::Prompt;

/// A `Template` defines a template for a prompt
///
/// Templates use [tera] (jinja style) syntax and are rendered as one-off templates; there is no
/// shared template repository.
#[derive(Clone, Debug)]
pub enum Template {
    String {
        template: String,
        initial_context: Option<tera::Context>,
    },
    Static {
        template: &'static str,
        initial_context: Option<tera::Context>,
    },
}

impl Template {
    pub fn from_string(template: impl Into<String>) -> Template {
        Template::String {
            template: template.into(),
            initial_context: None,
        }
    }

    /// Renders a template with a `tera::Context`, on top of the initial context if any
    ///
    /// # Errors
    ///
    /// - Template has syntax errors
    /// - Context is missing that is required by the template
    pub fn render(&self, render_context: &tera::Context) -> Result<String> {
        let context = self.extend_initial_context_with(render_context.clone());

        let template = match self {
            Template::String { template, .. } => template.as_str(),
            Template::Static { template, .. } => template,
        };

        Tera::one_off(template, &context, false).context("Failed to render one-off template")
    }

    /// Builds a Prompt from a template with an empty context
    pub fn to_prompt(&self) -> Prompt {
        self.into()
    }

    /// Adds an initial context to a template
    ///
    /// This context is rendered in addition to the context provided when rendering the template.
    pub fn with_initial_context(&mut self, initial_context: tera::Context) -> &mut Self {
        match self {
            Template::String {
                initial_context: ctx,
                ..
            }
            | Template::Static {
                initial_context: ctx,
                ..
            } => *ctx = Some(initial_context),
        }

        self
    }

    fn extend_initial_context_with(&self, render_context: tera::Context) -> tera::Context {
        let mut initial_context = self.initial_context().unwrap_or_default();
        initial_context.extend(render_context);

        initial_context
    }

    pub(crate) fn initial_context(&self) -> Option<tera::Context> {
        match self {
            Template::String {
                initial_context, ..
            }
            | Template::Static {
                initial_context, ..
            } => initial_context.clone(),
        }
    }
}

impl From<&'static str> for Template {
    fn from(template: &'static str) -> Self {
        Template::Static {
            template,
            initial_context: None,
        }
    }
}

impl From<String> for Template {
    fn from(template: String) -> Self {
        Template::String {
            template,
            initial_context: None,
        }
    }
}
