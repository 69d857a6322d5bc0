//! Templates are reusable blueprints that prefill a new income, expense or
//! transfer. They never create transactions by themselves.
//!
//! Each user may mark at most one template of each kind as the default, which
//! is the one used for one-click transaction creation. The default is only
//! ever changed through [set_default].

mod core;
mod default;

pub use core::{
    NewTemplate, Template, TemplateKind, TemplateRefs, TemplateUpdate, create_template,
    create_template_table, delete_template, duplicate_template, get_template, get_templates,
    update_template,
};
pub use default::{DefaultChange, get_default_template, set_default};
