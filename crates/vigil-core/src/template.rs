//! Message templating over the service context.
//!
//! Templates use minijinja syntax and see the owning service's details as
//! `service_id`, `service_name`, `service_url`, `web_url`, `icon` and the
//! version fields. Template *parse* failures are caught at validation time
//! via [`check_template`]; rendering at send time treats unknown variables
//! leniently (they render empty).

use minijinja::{context, Environment, Value};

use crate::info::ServiceInfo;

/// Renders `text` against the service context.
///
/// Text without template markers is returned unchanged. Render errors fall
/// back to the raw text: templates are vetted at validation time, so a
/// runtime failure only means a lenient best-effort message.
pub fn render_template(text: &str, info: &ServiceInfo) -> String {
    if !has_template(text) {
        return text.to_string();
    }

    let env = Environment::new();
    let ctx = context! {
        service_id => info.id,
        service_name => non_empty(&info.name),
        service_url => info.url,
        web_url => non_empty(&info.web_url),
        icon => non_empty(&info.icon),
        icon_link_to => non_empty(&info.icon_link_to),
        version => info.latest_version,
        approved_version => info.approved_version,
    };
    match env.render_str(text, ctx) {
        Ok(rendered) => rendered,
        Err(err) => {
            tracing::warn!(template = text, error = %err, "template failed to render");
            text.to_string()
        }
    }
}

/// Whether `text` parses as a valid template.
pub fn check_template(text: &str) -> bool {
    if !has_template(text) {
        return true;
    }
    Environment::new().template_from_str(text).is_ok()
}

fn has_template(text: &str) -> bool {
    text.contains("{{") || text.contains("{%")
}

// Empty optional fields are left undefined so `default(...)` filters fire.
fn non_empty(value: &str) -> Value {
    if value.is_empty() {
        Value::UNDEFINED
    } else {
        Value::from(value)
    }
}
