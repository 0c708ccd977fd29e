//! Prompts templating
//!
//! A [Prompt] is what gets sent to a [`SimplePrompt`][crate::SimplePrompt]. It pairs a
//! [`Template`] (rendered with [tera]) with the context to substitute, typically the node being
//! tagged.
//!
//! # Example
//!
//! ```
//! # use kbingest_core::template::Template;
//! let template = Template::from("hello {{world}}");
//! let prompt = template.to_prompt().with_context_value("world", "kbingest");
//!
//! assert_eq!(prompt.render().unwrap(), "hello kbingest");
//! ```
use anyhow::Result;

use crate::{node::Node, template::Template};

/// A Prompt can be used with large language models to prompt.
#[derive(Clone, Debug)]
pub struct Prompt {
    template: Template,
    context: Option<tera::Context>,
}

impl Prompt {
    /// Adds an `indexing::Node` to the context of the Prompt
    #[must_use]
    pub fn with_node(mut self, node: &Node) -> Self {
        let context = self.context.get_or_insert_with(tera::Context::default);
        context.insert("node", &node);
        self
    }

    /// Adds a key-value pair to the context of the Prompt
    #[must_use]
    pub fn with_context_value(mut self, key: &str, value: impl Into<tera::Value>) -> Self {
        let context = self.context.get_or_insert_with(tera::Context::default);
        context.insert(key, &value.into());
        self
    }

    /// Renders a prompt
    ///
    /// If no context is provided and the template did not bring one, the prompt is returned as
    /// is.
    ///
    /// # Errors
    ///
    /// See `Template::render`
    pub fn render(&self) -> Result<String> {
        if let Some(context) = &self.context {
            return self.template.render(context);
        }

        if self.template.initial_context().is_some() {
            return self.template.render(&tera::Context::default());
        }

        match &self.template {
            Template::String { template, .. } => Ok(template.clone()),
            Template::Static { template, .. } => Ok((*template).to_string()),
        }
    }
}

impl From<&'static str> for Prompt {
    fn from(prompt: &'static str) -> Self {
        Prompt {
            template: Template::from(prompt),
            context: None,
        }
    }
}

impl From<String> for Prompt {
    fn from(prompt: String) -> Self {
        Prompt {
            template: Template::from(prompt),
            context: None,
        }
    }
}

impl From<&Template> for Prompt {
    fn from(template: &Template) -> Self {
        Prompt {
            template: template.clone(),
            context: None,
        }
    }
}
