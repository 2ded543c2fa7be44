//! A single form render and the builder call sites that run inside it.
//!
//! [`RenderSession`] owns the [`BufferStack`] for exactly one form. Every
//! composite element (input sections, action rows, has-many blocks) renders
//! inside its own scope and folds the result into its parent when done; a
//! single input either hands its markup back to the caller or appends it to
//! the enclosing block, depending on whether the surrounding `inputs` call
//! was given an explicit block.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{FormConfig, Labels};
use crate::error::FormResult;
use crate::html::{content_tag, escape_javascript, link_to, tag, SafeFragment};
use crate::inflect::{singularize, titlecase};
use crate::inputs::{default_label, InputContext, InputOptions, InputRegistry};
use crate::record::{Association, Record};
use crate::stack::{BufferScope, BufferStack, MergePolicy};

/// Options for an `inputs` fieldset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldsetOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<String>,
    /// Extra classes next to "inputs"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

impl FieldsetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn legend(mut self, legend: impl Into<String>) -> Self {
        self.legend = Some(legend.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }
}

/// Options for a `has_many` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HasManyOptions {
    /// Heading text; defaults to the titlecased association name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    /// Extra classes on each child fieldset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

/// Options for a cancel link
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CancelLinkOptions {
    /// Link target; defaults to `FormConfig::cancel_url`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Class of the wrapping `<li>`; defaults to "cancel"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub li_class: Option<String>,
    /// Class of the `<a>` itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_class: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Submit,
    Reset,
    Cancel,
}

/// The record currently being rendered and where its parameters live
#[derive(Debug, Clone)]
struct FormObject {
    record: Record,
    object_name: String,
    id_prefix: String,
}

/// One top-level form render
#[derive(Debug)]
pub struct RenderSession {
    stack: BufferStack,
    inputs_with_block: bool,
    current: FormObject,
    config: FormConfig,
    registry: Arc<InputRegistry>,
}

/// Restores the enclosing `inputs` flag, also while unwinding
struct FlagGuard<'a> {
    session: &'a mut RenderSession,
    previous: bool,
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.session.inputs_with_block = self.previous;
    }
}

/// Makes the parent object current again when a nested form ends
struct ObjectGuard<'a> {
    session: &'a mut RenderSession,
    parent: Option<FormObject>,
}

impl Drop for ObjectGuard<'_> {
    fn drop(&mut self) {
        if let Some(parent) = self.parent.take() {
            self.session.current = parent;
        }
    }
}

impl AsMut<BufferStack> for RenderSession {
    fn as_mut(&mut self) -> &mut BufferStack {
        &mut self.stack
    }
}

impl BufferScope for RenderSession {}

impl RenderSession {
    pub fn new(record: Record, config: FormConfig, registry: Arc<InputRegistry>) -> FormResult<Self> {
        record.validate()?;
        config.validate()?;
        tracing::debug!(model = %record.model, id = ?record.id, "starting form render session");
        let object_name = record.model.clone();
        let id_prefix = record.model.clone();
        Ok(RenderSession {
            stack: BufferStack::new(),
            inputs_with_block: false,
            current: FormObject {
                record,
                object_name,
                id_prefix,
            },
            config,
            registry,
        })
    }

    /// Session with the default configuration and input registry
    pub fn with_defaults(record: Record) -> FormResult<Self> {
        Self::new(
            record,
            FormConfig::default(),
            Arc::new(InputRegistry::with_defaults()),
        )
    }

    /// Render a whole form: run `block`, check the stack is back at its root
    /// and wrap the output in a `<form>` element.
    pub fn render<F>(
        record: Record,
        config: FormConfig,
        registry: Arc<InputRegistry>,
        block: F,
    ) -> FormResult<String>
    where
        F: FnOnce(&mut RenderSession) -> FormResult<()>,
    {
        let mut session = RenderSession::new(record, config, registry)?;
        block(&mut session)?;

        let record = session.current.record.clone();
        let body = session.finish()?;

        let form_id = match record.id {
            Some(id) => format!("edit_{}_{}", record.model, id),
            None => format!("new_{}", record.model),
        };
        let class = format!("formtastic {}", record.model);
        let form = content_tag(
            "form",
            &[
                ("accept-charset", "UTF-8"),
                ("method", "post"),
                ("class", class.as_str()),
                ("id", form_id.as_str()),
                ("novalidate", "novalidate"),
            ],
            &body,
        );
        Ok(form.into_string())
    }

    /// Close the session and return everything appended to the root buffer
    pub fn finish(self) -> FormResult<SafeFragment> {
        let depth = self.stack.depth();
        if depth != 1 {
            tracing::error!(depth, "form render finished with open buffers");
        }
        let out = self.stack.finish()?;
        tracing::debug!(bytes = out.len(), "finished form render session");
        Ok(out)
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn stack(&self) -> &BufferStack {
        &self.stack
    }

    /// Append to whichever buffer is currently on top
    pub fn append(&mut self, fragment: SafeFragment) -> FormResult<()> {
        self.stack.append(fragment)
    }

    /// The record the innermost form block is rendering
    pub fn object(&self) -> &Record {
        &self.current.record
    }

    /// Parameter prefix of the current record, e.g. `post[comments_attributes][0]`
    pub fn object_name(&self) -> &str {
        &self.current.object_name
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Whether the enclosing `inputs` call was given an explicit block
    pub fn inputs_with_block(&self) -> bool {
        self.inputs_with_block
    }

    // --- inputs ---

    /// Fieldset with an input for every field of the current record
    pub fn inputs(&mut self, options: &FieldsetOptions) -> FormResult<()> {
        let methods: Vec<String> = self
            .object()
            .fields
            .iter()
            .map(|f| f.name.clone())
            .collect();
        self.fieldset(options, false, |f| {
            for method in &methods {
                if let Some(html) = f.input(method, &InputOptions::default())? {
                    f.append(html)?;
                }
            }
            Ok(())
        })
    }

    /// Fieldset whose content is produced by `block`; inputs rendered inside
    /// it append themselves
    pub fn inputs_with<F>(&mut self, options: &FieldsetOptions, block: F) -> FormResult<()>
    where
        F: FnOnce(&mut RenderSession) -> FormResult<()>,
    {
        self.fieldset(options, true, block)
    }

    fn fieldset<F>(&mut self, options: &FieldsetOptions, with_block: bool, body: F) -> FormResult<()>
    where
        F: FnOnce(&mut RenderSession) -> FormResult<()>,
    {
        let previous = std::mem::replace(&mut self.inputs_with_block, with_block);
        let mut guard = FlagGuard {
            session: self,
            previous,
        };
        guard.session.capture_and_append(|f| {
            let items = f.capture(body)?;
            f.append(fieldset_html(options, &items))
        })
    }

    /// Render one input.
    ///
    /// Inside an `inputs_with` block the markup is appended to the block and
    /// `None` is returned; otherwise the markup is returned for the caller
    /// to place.
    pub fn input(&mut self, method: &str, options: &InputOptions) -> FormResult<Option<SafeFragment>> {
        let policy = if self.inputs_with_block {
            MergePolicy::Append
        } else {
            MergePolicy::Return
        };
        self.capture_with(policy, |f| {
            let html = f.render_input(method, options)?;
            f.append(html)
        })
    }

    fn render_input(&self, method: &str, options: &InputOptions) -> FormResult<SafeFragment> {
        let field = self.current.record.find_field(method)?;
        let kind = options
            .kind
            .as_deref()
            .or(field.kind.as_deref())
            .unwrap_or("string");
        let label = options
            .label
            .clone()
            .or_else(|| field.label.clone())
            .unwrap_or_else(|| default_label(method));
        let choices = options.choices.as_deref().unwrap_or(field.choices.as_slice());

        let ctx = InputContext {
            kind,
            object_name: &self.current.object_name,
            id_prefix: &self.current.id_prefix,
            method,
            value: field.value.as_deref(),
            label,
            hint: options.hint.as_deref(),
            required: options.required.unwrap_or(field.required),
            choices,
        };
        self.registry.render(&ctx)
    }

    // --- actions ---

    /// Action row with a submit button and a cancel link
    pub fn actions(&mut self) -> FormResult<()> {
        self.actions_with(|f| f.commit_action_with_cancel_link())
    }

    /// Action row whose content is produced by `block`
    pub fn actions_with<F>(&mut self, block: F) -> FormResult<()>
    where
        F: FnOnce(&mut RenderSession) -> FormResult<()>,
    {
        self.capture_and_append(|f| {
            let items = f.capture(block)?;
            let list = content_tag("ol", &[], &items);
            f.append(content_tag("fieldset", &[("class", "actions")], &list))
        })
    }

    pub fn action(&mut self, kind: ActionKind) -> FormResult<()> {
        self.action_labeled(kind, None)
    }

    /// Like [`action`](Self::action) with an explicit button label
    pub fn action_labeled(&mut self, kind: ActionKind, label: Option<&str>) -> FormResult<()> {
        if kind == ActionKind::Cancel {
            let options = CancelLinkOptions::default();
            return self.capture_and_append(|f| f.cancel_link(&options));
        }
        let html = self.action_html(kind, label);
        self.capture_and_append(|f| f.append(html))
    }

    fn action_html(&self, kind: ActionKind, label: Option<&str>) -> SafeFragment {
        let record = &self.current.record;
        let model = titlecase(&record.model);
        let labels = &self.config.labels;
        let (input_type, name, template) = match kind {
            ActionKind::Reset => ("reset", "reset", &labels.reset),
            _ if record.is_new_record() => ("submit", "commit", &labels.submit_create),
            _ => ("submit", "commit", &labels.submit_update),
        };
        let value = match label {
            Some(label) => label.to_string(),
            None => Labels::interpolate(template, &model),
        };
        let id = format!("{}_{}_action", self.current.id_prefix, input_type);
        let button = tag(
            "input",
            &[("type", input_type), ("name", name), ("value", value.as_str())],
        );
        content_tag(
            "li",
            &[("class", "action input_action"), ("id", id.as_str())],
            &button,
        )
    }

    /// Append a `<li>` holding a cancel link to the current buffer
    pub fn cancel_link(&mut self, options: &CancelLinkOptions) -> FormResult<()> {
        let url = options.url.as_deref().unwrap_or(self.config.cancel_url.as_str());
        let li_class = options.li_class.as_deref().unwrap_or("cancel");
        let link_attrs: Vec<(&str, &str)> = match options.link_class.as_deref() {
            Some(class) => vec![("class", class)],
            None => Vec::new(),
        };
        let link = link_to(&self.config.labels.cancel, url, &link_attrs);
        let html = content_tag("li", &[("class", li_class)], &link);
        self.append(html)
    }

    pub fn commit_action_with_cancel_link(&mut self) -> FormResult<()> {
        self.action(ActionKind::Submit)?;
        self.cancel_link(&CancelLinkOptions::default())
    }

    // --- nested forms ---

    /// Render a nested form for every record of `association`, plus an
    /// "add" link carrying the markup of a blank record.
    ///
    /// `block` runs once per child (and once for the blank template) with the
    /// child as the session's current object.
    pub fn has_many<F>(&mut self, association: &str, options: &HasManyOptions, mut block: F) -> FormResult<()>
    where
        F: FnMut(&mut RenderSession) -> FormResult<()>,
    {
        let assoc = self.object().find_association(association)?.clone();
        let heading = options
            .heading
            .clone()
            .unwrap_or_else(|| titlecase(&assoc.name));
        let fieldset_options = FieldsetOptions {
            legend: None,
            class: Some(match &options.class {
                Some(class) => format!("{} has_many_fields", class),
                None => "has_many_fields".to_string(),
            }),
        };
        let placeholder = self.config.new_record_placeholder.clone();
        let div_class = format!("has_many {}", assoc.name);

        tracing::debug!(
            association = %assoc.name,
            children = assoc.records.len(),
            depth = self.depth(),
            "rendering has_many block"
        );

        self.capture_and_append(|f| {
            let body = f.capture(|f| {
                f.append(content_tag("h3", &[], &SafeFragment::escape(&heading)))?;

                for (index, child) in assoc.records.iter().enumerate() {
                    f.nested_fieldset(&assoc, child.clone(), &index.to_string(), &fieldset_options, &mut block)?;
                }

                let template = f.capture_and_return(|f| {
                    f.nested_fieldset(
                        &assoc,
                        assoc.blank_record(),
                        &placeholder,
                        &fieldset_options,
                        &mut block,
                    )
                })?;
                let add_link = f.add_record_link(&assoc, &template);
                f.append(add_link)
            })?;
            f.append(content_tag("div", &[("class", div_class.as_str())], &body))
        })
    }

    fn nested_fieldset(
        &mut self,
        assoc: &Association,
        child: Record,
        index: &str,
        options: &FieldsetOptions,
        block: &mut dyn FnMut(&mut RenderSession) -> FormResult<()>,
    ) -> FormResult<()> {
        let object = FormObject {
            object_name: format!("{}[{}_attributes][{}]", self.current.object_name, assoc.name, index),
            id_prefix: format!("{}_{}_attributes_{}", self.current.id_prefix, assoc.name, index),
            record: child,
        };
        let delete_label = self.config.labels.has_many_delete.clone();

        self.with_object(object, |f| {
            f.inputs_with(options, |f| {
                block(f)?;
                if f.object().is_new_record() {
                    let link = link_to(
                        &delete_label,
                        "#",
                        &[
                            ("onclick", "$(this).closest('.has_many_fields').remove(); return false;"),
                            ("class", "button"),
                        ],
                    );
                    f.append(content_tag("li", &[], &link))?;
                }
                Ok(())
            })?;
            if let Some(id) = f.object().id {
                let id = id.to_string();
                let name = format!("{}[id]", f.current.object_name);
                let dom_id = format!("{}_id", f.current.id_prefix);
                f.append(tag(
                    "input",
                    &[
                        ("id", dom_id.as_str()),
                        ("type", "hidden"),
                        ("name", name.as_str()),
                        ("value", id.as_str()),
                    ],
                ))?;
            }
            Ok(())
        })
    }

    fn add_record_link(&self, assoc: &Association, template: &SafeFragment) -> SafeFragment {
        let js = escape_javascript(template.as_str());
        let mut onclick = format!(
            "$(this).before('{}'.replace(/{}/g, new Date().getTime()));",
            js, self.config.new_record_placeholder
        );
        if let Some(script) = &self.config.add_script {
            onclick.push(' ');
            onclick.push_str(script.trim());
        }
        onclick.push_str(" return false;");

        let model = titlecase(&singularize(&assoc.name));
        let text = Labels::interpolate(&self.config.labels.has_many_new, &model);
        link_to(&text, "#", &[("onclick", onclick.as_str()), ("class", "button")])
    }

    /// Make `object` current for the duration of `work`
    fn with_object<T, F>(&mut self, object: FormObject, work: F) -> FormResult<T>
    where
        F: FnOnce(&mut RenderSession) -> FormResult<T>,
    {
        let parent = std::mem::replace(&mut self.current, object);
        let mut guard = ObjectGuard {
            session: self,
            parent: Some(parent),
        };
        work(&mut *guard.session)
    }

    // --- deprecated aliases ---

    #[deprecated(note = "use `action(ActionKind::Submit)`")]
    pub fn commit_button(&mut self, label: Option<&str>) -> FormResult<()> {
        tracing::warn!("commit_button is deprecated in favour of action(Submit)");
        self.action_labeled(ActionKind::Submit, label)
    }

    #[deprecated(note = "use `commit_action_with_cancel_link`")]
    pub fn commit_button_with_cancel_link(&mut self) -> FormResult<()> {
        tracing::warn!(
            "commit_button_with_cancel_link is deprecated in favour of commit_action_with_cancel_link"
        );
        self.commit_action_with_cancel_link()
    }

    #[deprecated(note = "use `actions`")]
    pub fn buttons(&mut self) -> FormResult<()> {
        tracing::warn!("buttons is deprecated in favour of actions");
        self.actions()
    }

    #[deprecated(note = "use `actions_with`")]
    pub fn buttons_with<F>(&mut self, block: F) -> FormResult<()>
    where
        F: FnOnce(&mut RenderSession) -> FormResult<()>,
    {
        tracing::warn!("buttons_with is deprecated in favour of actions_with");
        self.actions_with(block)
    }
}

fn fieldset_html(options: &FieldsetOptions, items: &SafeFragment) -> SafeFragment {
    let class = match &options.class {
        Some(extra) => format!("inputs {}", extra),
        None => "inputs".to_string(),
    };
    let mut inner = match &options.legend {
        Some(legend) => content_tag(
            "legend",
            &[],
            &content_tag("span", &[], &SafeFragment::escape(legend)),
        ),
        None => SafeFragment::new(),
    };
    inner.push(&content_tag("ol", &[], items));
    content_tag("fieldset", &[("class", class.as_str())], &inner)
}
