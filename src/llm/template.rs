//! Prompt template rendering.

/// Replace the first occurrence of each `{{name}}` placeholder with its value.
///
/// Each template uses a placeholder at most once, so first-occurrence
/// replacement is all that is needed. Placeholders with no matching value are
/// left in place; values with no matching placeholder are ignored.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in values {
        let token = format!("{{{{{}}}}}", name);
        if let Some(pos) = out.find(&token) {
            out.replace_range(pos..pos + token.len(), value);
        }
    }
    out
}
