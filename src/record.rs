use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{FormError, FormResult};

/// One attribute of a record as the form sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Input kind ("string", "text", "boolean", ...); defaults to "string"
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Allowed values for select-like inputs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Field {
            name: name.into(),
            kind: None,
            value: None,
            label: None,
            required: false,
            choices: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Same field with the value cleared, used for blank template records
    pub fn blank(&self) -> Self {
        Field {
            value: None,
            ..self.clone()
        }
    }
}

/// A has-many collection on a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub name: String,
    /// snake_case model name of the children
    pub model: String,
    /// Field layout of a new child
    #[serde(default)]
    pub template: Vec<Field>,
    /// Associations a new child carries, so nested has-many blocks can
    /// render their own templates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub template_associations: Vec<Association>,
    #[serde(default)]
    pub records: Vec<Record>,
}

impl Association {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Association {
            name: name.into(),
            model: model.into(),
            template: Vec::new(),
            template_associations: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn template(mut self, fields: Vec<Field>) -> Self {
        self.template = fields;
        self
    }

    pub fn template_association(mut self, association: Association) -> Self {
        self.template_associations.push(association);
        self
    }

    pub fn record(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }

    /// An unsaved child built from the template
    pub fn blank_record(&self) -> Record {
        Record {
            model: self.model.clone(),
            id: None,
            fields: self.template.iter().map(Field::blank).collect(),
            associations: self
                .template_associations
                .iter()
                .map(Association::without_records)
                .collect(),
        }
    }

    fn without_records(&self) -> Association {
        Association {
            records: Vec::new(),
            ..self.clone()
        }
    }

    fn validate(&self) -> FormResult<()> {
        validate_name(&self.name)?;
        validate_name(&self.model)?;
        for field in &self.template {
            validate_name(&field.name)?;
        }
        for nested in &self.template_associations {
            nested.validate()?;
        }
        for child in &self.records {
            child.validate()?;
        }
        Ok(())
    }
}

/// The object a form is rendered for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// snake_case model name, also the parameter prefix ("post" -> post[title])
    pub model: String,
    /// Persisted records have an id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub associations: Vec<Association>,
}

impl Record {
    pub fn new(model: impl Into<String>) -> Self {
        Record {
            model: model.into(),
            id: None,
            fields: Vec::new(),
            associations: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn association(mut self, association: Association) -> Self {
        self.associations.push(association);
        self
    }

    pub fn is_new_record(&self) -> bool {
        self.id.is_none()
    }

    pub fn find_field(&self, name: &str) -> FormResult<&Field> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| FormError::UnknownField {
                model: self.model.clone(),
                field: name.to_string(),
            })
    }

    pub fn find_association(&self, name: &str) -> FormResult<&Association> {
        self.associations
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| FormError::UnknownAssociation {
                model: self.model.clone(),
                association: name.to_string(),
            })
    }

    /// Check model, field and association names recursively
    pub fn validate(&self) -> FormResult<()> {
        validate_name(&self.model)?;
        for field in &self.fields {
            validate_name(&field.name)?;
        }
        for association in &self.associations {
            association.validate()?;
        }
        Ok(())
    }
}

/// Names become parameter keys and DOM ids, so only lowercase identifiers pass
pub fn validate_name(name: &str) -> FormResult<()> {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = NAME_REGEX.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap());
    if re.is_match(name) {
        Ok(())
    } else {
        Err(FormError::InvalidName {
            name: name.to_string(),
        })
    }
}
