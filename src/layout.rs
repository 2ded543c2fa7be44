//! Declarative form layouts.
//!
//! A layout is an ordered list of sections that drive the builder the same
//! way hand-written rendering code would:
//!
//! ```yaml
//! record:
//!   model: post
//!   fields:
//!     - name: title
//! layout:
//!   - inputs:
//!       legend: Details
//!       fields: [title]
//!   - actions: {}
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::FormConfig;
use crate::error::{FormError, FormResult};
use crate::inputs::{InputOptions, InputRegistry};
use crate::record::Record;
use crate::session::{ActionKind, FieldsetOptions, HasManyOptions, RenderSession};

/// A field reference: either just the name or the name plus input options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputSpec {
    Name(String),
    Detailed(DetailedInput),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedInput {
    pub name: String,
    #[serde(flatten)]
    pub options: InputOptions,
}

impl InputSpec {
    pub fn name(&self) -> &str {
        match self {
            InputSpec::Name(name) => name,
            InputSpec::Detailed(d) => &d.name,
        }
    }

    pub fn options(&self) -> InputOptions {
        match self {
            InputSpec::Name(_) => InputOptions::default(),
            InputSpec::Detailed(d) => d.options.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputsSection {
    #[serde(flatten)]
    pub options: FieldsetOptions,
    /// Without a field list every field of the record is rendered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<InputSpec>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HasManySection {
    pub association: String,
    #[serde(flatten)]
    pub options: HasManyOptions,
    #[serde(default)]
    pub fields: Vec<InputSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionsSection {
    /// Without items the row holds a submit button and a cancel link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ActionKind>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Inputs(InputsSection),
    HasMany(HasManySection),
    Actions(ActionsSection),
}

/// A record, its layout and optionally the builder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<FormConfig>,
    pub record: Record,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub layout: Vec<Section>,
}

impl FormDocument {
    pub fn from_yaml(yaml: &str) -> FormResult<Self> {
        if yaml.trim().is_empty() {
            return Err(FormError::Render("empty form document".to_string()));
        }
        let document: FormDocument = serde_yaml::from_str(yaml)?;
        document.record.validate()?;
        if let Some(config) = &document.config {
            config.validate()?;
        }
        Ok(document)
    }

    pub fn load(path: impl AsRef<Path>) -> FormResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// The configuration a render uses: an explicit one wins over the
    /// document's own, which wins over the defaults
    pub fn effective_config(&self, explicit: Option<&FormConfig>) -> FormConfig {
        match (explicit, &self.config) {
            (Some(explicit), Some(_)) => {
                tracing::warn!("explicit configuration overrides the one embedded in the form document");
                explicit.clone()
            }
            (Some(explicit), None) => explicit.clone(),
            (None, Some(embedded)) => embedded.clone(),
            (None, None) => FormConfig::default(),
        }
    }

    pub fn render(&self, explicit: Option<&FormConfig>, registry: Arc<InputRegistry>) -> FormResult<String> {
        let config = self.effective_config(explicit);
        RenderSession::render(self.record.clone(), config, registry, |f| {
            render_sections(f, &self.layout)
        })
    }
}

/// Drive `session` through `sections` in order
pub fn render_sections(session: &mut RenderSession, sections: &[Section]) -> FormResult<()> {
    for section in sections {
        match section {
            Section::Inputs(inputs) => match &inputs.fields {
                None => session.inputs(&inputs.options)?,
                Some(fields) => session.inputs_with(&inputs.options, |f| render_inputs(f, fields))?,
            },
            Section::HasMany(has_many) => {
                session.has_many(&has_many.association, &has_many.options, |f| {
                    render_inputs(f, &has_many.fields)
                })?;
            }
            Section::Actions(actions) => match &actions.items {
                None => session.actions()?,
                Some(items) => session.actions_with(|f| {
                    for kind in items {
                        f.action(*kind)?;
                    }
                    Ok(())
                })?,
            },
        }
    }
    Ok(())
}

fn render_inputs(session: &mut RenderSession, fields: &[InputSpec]) -> FormResult<()> {
    for spec in fields {
        // Inside an inputs block the input appends itself
        if let Some(html) = session.input(spec.name(), &spec.options())? {
            session.append(html)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections() {
        let yaml = r#"
record:
  model: post
  fields:
    - name: title
    - name: body
      as: text
layout:
  - inputs:
      legend: Details
      fields:
        - title
        - name: body
          label: Content
          hint: Markdown allowed
  - has_many:
      association: comments
      heading: Replies
      fields: [body]
  - actions:
      items: [submit, reset]
"#;
        let doc = FormDocument::from_yaml(yaml).unwrap();
        assert_eq!(doc.layout.len(), 3);
        match &doc.layout[0] {
            Section::Inputs(inputs) => {
                assert_eq!(inputs.options.legend.as_deref(), Some("Details"));
                let fields = inputs.fields.as_ref().unwrap();
                assert_eq!(fields[0], InputSpec::Name("title".to_string()));
                assert_eq!(fields[1].name(), "body");
                assert_eq!(fields[1].options().label.as_deref(), Some("Content"));
            }
            other => panic!("Expected inputs section, got {:?}", other),
        }
        match &doc.layout[1] {
            Section::HasMany(h) => {
                assert_eq!(h.association, "comments");
                assert_eq!(h.options.heading.as_deref(), Some("Replies"));
            }
            other => panic!("Expected has_many section, got {:?}", other),
        }
        assert_eq!(
            doc.layout[2],
            Section::Actions(ActionsSection {
                items: Some(vec![ActionKind::Submit, ActionKind::Reset])
            })
        );
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(FormDocument::from_yaml("  ").is_err());
    }

    #[test]
    fn test_invalid_record_name_rejected() {
        let yaml = "record:\n  model: Post\n";
        assert!(matches!(
            FormDocument::from_yaml(yaml),
            Err(FormError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_explicit_config_overrides_embedded() {
        let yaml = r#"
config:
  cancel_url: /from-document
record:
  model: post
layout:
  - actions: {}
"#;
        let doc = FormDocument::from_yaml(yaml).unwrap();
        let registry = Arc::new(InputRegistry::with_defaults());

        let embedded = doc.render(None, registry.clone()).unwrap();
        assert!(embedded.contains("<a href=\"/from-document\">Cancel</a>"));

        let explicit = FormConfig {
            cancel_url: "/from-flag".to_string(),
            ..FormConfig::default()
        };
        let overridden = doc.render(Some(&explicit), registry).unwrap();
        assert!(overridden.contains("<a href=\"/from-flag\">Cancel</a>"));
        assert!(!overridden.contains("/from-document"));
    }

    #[test]
    fn test_config_defaults_without_any_source() {
        let doc = FormDocument::from_yaml("record:\n  model: post\n").unwrap();
        assert_eq!(doc.effective_config(None), FormConfig::default());
    }

    #[test]
    fn test_missing_document_is_io_error() {
        let result = FormDocument::load("does/not/exist.yaml");
        assert!(matches!(result, Err(FormError::Io(_))));
    }
}
