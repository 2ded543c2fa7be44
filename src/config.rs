use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{FormError, FormResult};

/// Display strings used by the builder's own elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub cancel: String,
    pub submit_create: String,
    pub submit_update: String,
    pub reset: String,
    pub has_many_delete: String,
    pub has_many_new: String,
}

impl Default for Labels {
    fn default() -> Self {
        Labels {
            cancel: "Cancel".to_string(),
            submit_create: "Create %{model}".to_string(),
            submit_update: "Update %{model}".to_string(),
            reset: "Reset".to_string(),
            has_many_delete: "Delete".to_string(),
            has_many_new: "Add New %{model}".to_string(),
        }
    }
}

impl Labels {
    /// Replace `%{model}` in `template`. Other placeholders are left untouched.
    pub fn interpolate(template: &str, model: &str) -> String {
        static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = PLACEHOLDER_REGEX.get_or_init(|| Regex::new(r"%\{(\w+)\}").unwrap());
        re.replace_all(template, |caps: &regex::Captures| match &caps[1] {
            "model" => model.to_string(),
            _ => caps[0].to_string(),
        })
        .into_owned()
    }
}

/// Builder configuration, normally loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub labels: Labels,
    /// Target of the default cancel link
    pub cancel_url: String,
    /// Child index used in has-many templates; replaced client-side
    pub new_record_placeholder: String,
    /// JavaScript run after a has-many template is inserted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_script: Option<String>,
}

impl Default for FormConfig {
    fn default() -> Self {
        FormConfig {
            labels: Labels::default(),
            cancel_url: "index".to_string(),
            new_record_placeholder: "NEW_RECORD".to_string(),
            add_script: None,
        }
    }
}

impl FormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a YAML configuration. Missing keys take their defaults.
    pub fn from_yaml(yaml: &str) -> FormResult<Self> {
        let config: FormConfig = if yaml.trim().is_empty() {
            FormConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML configuration file
    pub fn load(path: impl AsRef<Path>) -> FormResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> FormResult<()> {
        // The placeholder ends up inside a JavaScript regex literal
        static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = PLACEHOLDER_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
        if !re.is_match(&self.new_record_placeholder) {
            return Err(FormError::Config(format!(
                "new_record_placeholder '{}' must be an identifier",
                self.new_record_placeholder
            )));
        }
        if self.cancel_url.is_empty() {
            return Err(FormError::Config("cancel_url must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_model() {
        assert_eq!(Labels::interpolate("Create %{model}", "Post"), "Create Post");
        assert_eq!(Labels::interpolate("Cancel", "Post"), "Cancel");
        assert_eq!(Labels::interpolate("%{other} %{model}", "Tag"), "%{other} Tag");
    }

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let config = FormConfig::from_yaml("").unwrap();
        assert_eq!(config, FormConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = "labels:\n  cancel: \"Abbrechen\"\nadd_script: \"init();\"\n";
        let config = FormConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.labels.cancel, "Abbrechen");
        assert_eq!(config.labels.has_many_delete, "Delete");
        assert_eq!(config.cancel_url, "index");
        assert_eq!(config.add_script.as_deref(), Some("init();"));
    }

    #[test]
    fn test_invalid_placeholder_rejected() {
        let result = FormConfig::from_yaml("new_record_placeholder: \"a/b\"");
        assert!(matches!(result, Err(FormError::Config(_))));
    }

    #[test]
    fn test_malformed_yaml() {
        let result = FormConfig::from_yaml("labels: [unclosed");
        assert!(matches!(result, Err(FormError::Yaml(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = FormConfig::load("does/not/exist.yaml");
        assert!(matches!(result, Err(FormError::Io(_))));
    }
}
