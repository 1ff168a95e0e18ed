use anyhow::{Context, Result};
use jsonschema::validator_for;
use serde_json::Value;

use crate::{domain::parse_field_document, form::FormController};

use super::{options::UiOptions, runtime::App, terminal::TerminalGuard};

#[derive(Debug)]
pub struct RepeatUI {
    schema: Value,
    value: Option<Value>,
    title: Option<String>,
    options: UiOptions,
}

impl RepeatUI {
    pub fn new(schema: Value) -> Self {
        Self {
            schema,
            value: None,
            title: None,
            options: UiOptions::default(),
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_options(mut self, options: UiOptions) -> Self {
        self.options = options;
        self
    }

    pub fn run(self) -> Result<Value> {
        let RepeatUI {
            schema,
            value,
            title,
            options,
        } = self;

        let document = parse_field_document(&schema)?;
        let title = title
            .or(document.title.clone())
            .unwrap_or_else(|| "repeatui".to_string());
        let controller = FormController::new(document.fields, value.as_ref());
        let validator = validator_for(&controller.validation_schema())
            .context("failed to compile validation schema")?;

        let mut terminal = TerminalGuard::new()?;
        let app = App::new(controller, validator, title, options);
        app.run(&mut terminal)
    }
}
