//! Input renderers and the registry that picks one per input kind.
//!
//! Lookup walks three tiers in a fixed order: renderers registered by the
//! application (custom), the admin set shipped with this crate, then the
//! standard Formtastic-style inputs. The first tier that knows the kind wins.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{FormError, FormResult};
use crate::html::{content_tag, tag, SafeFragment};
use crate::inflect::titlecase;

/// Per-call overrides for a single input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputOptions {
    #[serde(rename = "as", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

impl InputOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }
}

/// Everything a renderer needs to produce one input's markup
#[derive(Debug, Clone)]
pub struct InputContext<'a> {
    /// Resolved input kind
    pub kind: &'a str,
    /// Parameter prefix of the enclosing object, e.g. `post[comments_attributes][0]`
    pub object_name: &'a str,
    /// DOM id prefix of the enclosing object, e.g. `post_comments_attributes_0`
    pub id_prefix: &'a str,
    pub method: &'a str,
    pub value: Option<&'a str>,
    pub label: String,
    pub hint: Option<&'a str>,
    pub required: bool,
    pub choices: &'a [String],
}

impl InputContext<'_> {
    pub fn input_id(&self) -> String {
        format!("{}_{}", self.id_prefix, self.method)
    }

    pub fn input_name(&self) -> String {
        format!("{}[{}]", self.object_name, self.method)
    }

    /// `<label for=...>Label<abbr title="required">*</abbr></label>`
    pub fn label_html(&self) -> SafeFragment {
        let id = self.input_id();
        let mut inner = SafeFragment::escape(&self.label);
        if self.required {
            inner.push(&content_tag("abbr", &[("title", "required")], &SafeFragment::escape("*")));
        }
        content_tag("label", &[("for", id.as_str()), ("class", "label")], &inner)
    }

    fn hint_html(&self) -> SafeFragment {
        match self.hint {
            Some(hint) => content_tag(
                "p",
                &[("class", "inline-hints")],
                &SafeFragment::escape(hint),
            ),
            None => SafeFragment::new(),
        }
    }

    /// Wrap `inner` in the `<li>` every input lives in
    pub fn wrapper(&self, inner: &SafeFragment) -> SafeFragment {
        let class = format!(
            "{} input {}",
            self.kind,
            if self.required { "required" } else { "optional" }
        );
        let id = format!("{}_input", self.input_id());
        let mut body = inner.clone();
        body.push(&self.hint_html());
        content_tag("li", &[("class", class.as_str()), ("id", id.as_str())], &body)
    }
}

/// Produces the markup of one input kind
pub trait InputRenderer: Send + Sync {
    fn render(&self, ctx: &InputContext) -> FormResult<SafeFragment>;
}

/// `<input type=...>` based inputs
pub struct TextFieldInput {
    html_type: &'static str,
    keep_value: bool,
}

impl TextFieldInput {
    pub fn new(html_type: &'static str) -> Self {
        TextFieldInput {
            html_type,
            keep_value: true,
        }
    }

    /// Never echo the current value back (passwords)
    pub fn without_value(html_type: &'static str) -> Self {
        TextFieldInput {
            html_type,
            keep_value: false,
        }
    }
}

impl InputRenderer for TextFieldInput {
    fn render(&self, ctx: &InputContext) -> FormResult<SafeFragment> {
        let id = ctx.input_id();
        let name = ctx.input_name();
        let mut attrs: Vec<(&str, &str)> = vec![("id", id.as_str()), ("type", self.html_type), ("name", name.as_str())];
        if self.keep_value {
            if let Some(value) = ctx.value {
                attrs.push(("value", value));
            }
        }
        let mut inner = ctx.label_html();
        inner.push(&tag("input", &attrs));
        Ok(ctx.wrapper(&inner))
    }
}

pub struct HiddenInput;

impl InputRenderer for HiddenInput {
    fn render(&self, ctx: &InputContext) -> FormResult<SafeFragment> {
        let id = ctx.input_id();
        let name = ctx.input_name();
        let value = ctx.value.unwrap_or("");
        let input = tag(
            "input",
            &[("id", id.as_str()), ("type", "hidden"), ("name", name.as_str()), ("value", value)],
        );
        Ok(ctx.wrapper(&input))
    }
}

pub struct TextAreaInput;

impl InputRenderer for TextAreaInput {
    fn render(&self, ctx: &InputContext) -> FormResult<SafeFragment> {
        let id = ctx.input_id();
        let name = ctx.input_name();
        let text = SafeFragment::escape(ctx.value.unwrap_or(""));
        let mut inner = ctx.label_html();
        inner.push(&content_tag(
            "textarea",
            &[("id", id.as_str()), ("name", name.as_str()), ("rows", "20")],
            &text,
        ));
        Ok(ctx.wrapper(&inner))
    }
}

/// Checkbox preceded by a hidden "0" so unchecked boxes still submit
pub struct BooleanInput;

impl InputRenderer for BooleanInput {
    fn render(&self, ctx: &InputContext) -> FormResult<SafeFragment> {
        let id = ctx.input_id();
        let name = ctx.input_name();
        let checked = matches!(ctx.value, Some("1") | Some("true"));

        let mut checkbox: Vec<(&str, &str)> =
            vec![("id", id.as_str()), ("type", "checkbox"), ("name", name.as_str()), ("value", "1")];
        if checked {
            checkbox.push(("checked", "checked"));
        }

        let mut label_inner = tag("input", &checkbox);
        label_inner.push(&SafeFragment::escape(&ctx.label));

        let mut inner = tag("input", &[("type", "hidden"), ("name", name.as_str()), ("value", "0")]);
        inner.push(&content_tag("label", &[("for", id.as_str())], &label_inner));
        Ok(ctx.wrapper(&inner))
    }
}

pub struct SelectInput;

impl InputRenderer for SelectInput {
    fn render(&self, ctx: &InputContext) -> FormResult<SafeFragment> {
        if ctx.choices.is_empty() {
            return Err(FormError::Render(format!(
                "select input '{}' has no choices",
                ctx.method
            )));
        }
        let id = ctx.input_id();
        let name = ctx.input_name();

        let mut options = content_tag("option", &[("value", "")], &SafeFragment::new());
        for choice in ctx.choices {
            let mut attrs: Vec<(&str, &str)> = vec![("value", choice.as_str())];
            if ctx.value == Some(choice.as_str()) {
                attrs.push(("selected", "selected"));
            }
            options.push(&content_tag("option", &attrs, &SafeFragment::escape(choice)));
        }

        let mut inner = ctx.label_html();
        inner.push(&content_tag("select", &[("id", id.as_str()), ("name", name.as_str())], &options));
        Ok(ctx.wrapper(&inner))
    }
}

/// Date text field picked up by the admin date picker script
pub struct DatepickerInput;

impl InputRenderer for DatepickerInput {
    fn render(&self, ctx: &InputContext) -> FormResult<SafeFragment> {
        let id = ctx.input_id();
        let name = ctx.input_name();
        let mut attrs: Vec<(&str, &str)> = vec![
            ("id", id.as_str()),
            ("type", "text"),
            ("name", name.as_str()),
            ("class", "datepicker"),
            ("maxlength", "10"),
        ];
        if let Some(value) = ctx.value {
            attrs.push(("value", value));
        }
        let mut inner = ctx.label_html();
        inner.push(&tag("input", &attrs));
        Ok(ctx.wrapper(&inner))
    }
}

/// Where a renderer was registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererTier {
    Custom,
    Admin,
    Standard,
}

impl RendererTier {
    /// Lookup precedence, highest first
    pub const ORDER: [RendererTier; 3] = [RendererTier::Custom, RendererTier::Admin, RendererTier::Standard];
}

impl fmt::Display for RendererTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RendererTier::Custom => "custom",
            RendererTier::Admin => "admin",
            RendererTier::Standard => "standard",
        };
        f.write_str(name)
    }
}

/// Input kind -> renderer, in three precedence tiers
#[derive(Default)]
pub struct InputRegistry {
    tiers: HashMap<RendererTier, HashMap<String, Box<dyn InputRenderer>>>,
}

impl fmt::Debug for InputRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for tier in RendererTier::ORDER {
            let mut kinds: Vec<&str> = self
                .tiers
                .get(&tier)
                .map(|t| t.keys().map(String::as_str).collect())
                .unwrap_or_default();
            kinds.sort_unstable();
            map.entry(&tier, &kinds);
        }
        map.finish()
    }
}

impl InputRegistry {
    /// A registry with no renderers at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Standard and admin renderers; the custom tier starts empty
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register_in(RendererTier::Standard, "string", TextFieldInput::new("text"));
        registry.register_in(RendererTier::Standard, "email", TextFieldInput::new("email"));
        registry.register_in(RendererTier::Standard, "url", TextFieldInput::new("url"));
        registry.register_in(RendererTier::Standard, "number", TextFieldInput::new("number"));
        registry.register_in(RendererTier::Standard, "password", TextFieldInput::without_value("password"));
        registry.register_in(RendererTier::Standard, "hidden", HiddenInput);
        registry.register_in(RendererTier::Standard, "text", TextAreaInput);
        registry.register_in(RendererTier::Standard, "boolean", BooleanInput);
        registry.register_in(RendererTier::Admin, "select", SelectInput);
        registry.register_in(RendererTier::Admin, "datepicker", DatepickerInput);
        registry
    }

    /// Register an application renderer; it shadows admin and standard ones
    pub fn register(&mut self, kind: impl Into<String>, renderer: impl InputRenderer + 'static) {
        self.register_in(RendererTier::Custom, kind, renderer);
    }

    pub fn register_in(
        &mut self,
        tier: RendererTier,
        kind: impl Into<String>,
        renderer: impl InputRenderer + 'static,
    ) {
        self.tiers
            .entry(tier)
            .or_default()
            .insert(kind.into(), Box::new(renderer));
    }

    /// Find the renderer for `kind`, highest tier first.
    ///
    /// A miss in one tier is not an error; only exhausting every tier is.
    pub fn resolve(&self, kind: &str) -> FormResult<(&dyn InputRenderer, RendererTier)> {
        for tier in RendererTier::ORDER {
            if let Some(renderer) = self.tiers.get(&tier).and_then(|t| t.get(kind)) {
                return Ok((renderer.as_ref(), tier));
            }
        }
        Err(FormError::UnknownInput {
            kind: kind.to_string(),
            searched: RendererTier::ORDER
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    pub fn render(&self, ctx: &InputContext) -> FormResult<SafeFragment> {
        let (renderer, tier) = self.resolve(ctx.kind)?;
        tracing::trace!(kind = ctx.kind, %tier, method = ctx.method, "rendering input");
        renderer.render(ctx)
    }
}

/// Default label for a method name ("published_at" -> "Published At")
pub fn default_label(method: &str) -> String {
    titlecase(method)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(kind: &'a str, value: Option<&'a str>, choices: &'a [String]) -> InputContext<'a> {
        InputContext {
            kind,
            object_name: "post",
            id_prefix: "post",
            method: "title",
            value,
            label: "Title".to_string(),
            hint: None,
            required: false,
            choices,
        }
    }

    struct Shout;

    impl InputRenderer for Shout {
        fn render(&self, ctx: &InputContext) -> FormResult<SafeFragment> {
            Ok(SafeFragment::escape(&ctx.label.to_uppercase()))
        }
    }

    #[test]
    fn test_string_input_markup() {
        let registry = InputRegistry::with_defaults();
        let html = registry.render(&ctx("string", Some("Hi <b>"), &[])).unwrap();
        assert_eq!(
            html.as_str(),
            "<li class=\"string input optional\" id=\"post_title_input\">\
             <label for=\"post_title\" class=\"label\">Title</label>\
             <input id=\"post_title\" type=\"text\" name=\"post[title]\" value=\"Hi &lt;b&gt;\" />\
             </li>"
        );
    }

    #[test]
    fn test_required_label_and_hint() {
        let registry = InputRegistry::with_defaults();
        let mut c = ctx("string", None, &[]);
        c.required = true;
        c.hint = Some("Keep it short");
        let html = registry.render(&c).unwrap();
        assert!(html.as_str().starts_with("<li class=\"string input required\""));
        assert!(html.as_str().contains("Title<abbr title=\"required\">*</abbr></label>"));
        assert!(html.as_str().contains("<p class=\"inline-hints\">Keep it short</p></li>"));
    }

    #[test]
    fn test_password_never_echoes_value() {
        let registry = InputRegistry::with_defaults();
        let html = registry.render(&ctx("password", Some("secret"), &[])).unwrap();
        assert!(!html.as_str().contains("secret"));
        assert!(html.as_str().contains("type=\"password\""));
    }

    #[test]
    fn test_boolean_input_checked() {
        let registry = InputRegistry::with_defaults();
        let html = registry.render(&ctx("boolean", Some("1"), &[])).unwrap();
        assert!(html.as_str().contains("<input type=\"hidden\" name=\"post[title]\" value=\"0\" />"));
        assert!(html.as_str().contains("checked=\"checked\""));
    }

    #[test]
    fn test_select_marks_selected_choice() {
        let registry = InputRegistry::with_defaults();
        let choices = vec!["draft".to_string(), "live".to_string()];
        let html = registry.render(&ctx("select", Some("live"), &choices)).unwrap();
        assert!(html.as_str().contains("<option value=\"draft\">draft</option>"));
        assert!(html.as_str().contains("<option value=\"live\" selected=\"selected\">live</option>"));
    }

    #[test]
    fn test_select_without_choices_fails() {
        let registry = InputRegistry::with_defaults();
        let result = registry.render(&ctx("select", None, &[]));
        assert!(matches!(result, Err(FormError::Render(_))));
    }

    #[test]
    fn test_custom_tier_shadows_standard() {
        let mut registry = InputRegistry::with_defaults();
        assert_eq!(registry.resolve("string").unwrap().1, RendererTier::Standard);
        registry.register("string", Shout);
        assert_eq!(registry.resolve("string").unwrap().1, RendererTier::Custom);
        assert_eq!(registry.render(&ctx("string", None, &[])).unwrap().as_str(), "TITLE");
    }

    #[test]
    fn test_admin_tier_shadows_standard() {
        let mut registry = InputRegistry::with_defaults();
        registry.register_in(RendererTier::Standard, "datepicker", Shout);
        assert_eq!(registry.resolve("datepicker").unwrap().1, RendererTier::Admin);
    }

    #[test]
    fn test_unknown_input_is_single_error() {
        let registry = InputRegistry::with_defaults();
        let err = registry.resolve("colour").err().unwrap();
        assert_eq!(
            err,
            FormError::UnknownInput {
                kind: "colour".to_string(),
                searched: "custom, admin, standard".to_string(),
            }
        );
    }

    #[test]
    fn test_default_label() {
        assert_eq!(default_label("published_at"), "Published At");
    }
}
