//! # formstack
//!
//! Composes nested HTML form fragments (inputs, input fieldsets, action rows
//! and recursive has-many sub-forms) into one output string.
//!
//! ## Features
//! - A buffer stack giving every nesting level its own scratch buffer,
//!   popped on every exit path
//! - HTML safety as a type: buffers only accept [`SafeFragment`]s
//! - Input renderers looked up through a three-tier [`InputRegistry`]
//! - Has-many blocks with a JavaScript-embedded template for new records
//! - YAML configuration and YAML form layouts
//!
//! ## Example
//! ```ignore
//! use formstack::{render_form, Field, FieldsetOptions, InputOptions, Record};
//!
//! let post = Record::new("post").field(Field::new("title").value("Hello"));
//!
//! let html = render_form(post, |f| {
//!     f.inputs_with(&FieldsetOptions::new().legend("Details"), |f| {
//!         f.input("title", &InputOptions::new())?;
//!         Ok(())
//!     })?;
//!     f.actions()
//! })
//! .expect("Failed to render form");
//! ```

pub mod config;
pub mod error;
pub mod html;
pub mod inflect;
pub mod inputs;
pub mod layout;
pub mod record;
pub mod session;
pub mod stack;

use std::sync::Arc;

// --- Core types ---
pub use error::{FormError, FormResult};
pub use html::SafeFragment;
pub use stack::{Buffer, BufferScope, BufferStack, MergePolicy};
pub use session::{ActionKind, CancelLinkOptions, FieldsetOptions, HasManyOptions, RenderSession};

// --- Collaborators ---
pub use config::{FormConfig, Labels};
pub use inputs::{InputContext, InputOptions, InputRegistry, InputRenderer, RendererTier};
pub use layout::{FormDocument, Section};
pub use record::{Association, Field, Record};

/// Render a form for `record` with the default configuration and inputs
pub fn render_form<F>(record: Record, block: F) -> FormResult<String>
where
    F: FnOnce(&mut RenderSession) -> FormResult<()>,
{
    RenderSession::render(
        record,
        FormConfig::default(),
        Arc::new(InputRegistry::with_defaults()),
        block,
    )
}

/// Parse a YAML form document (record + layout) and render it
pub fn render_document(yaml: &str) -> FormResult<String> {
    let document = FormDocument::from_yaml(yaml)?;
    document.render(None, Arc::new(InputRegistry::with_defaults()))
}
