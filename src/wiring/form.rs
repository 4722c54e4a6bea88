use serde::Serialize;

use crate::dom::Element;

pub const DEFAULT_METHOD: &str = "POST";
pub const VALIDATION_MESSAGE: &str = "Please fill all fields.";
pub const DEFAULT_SUBMIT_ERROR: &str = "Error submitting form.";

const SKIPPED_INPUT_TYPES: &[&str] = &["submit", "button", "reset", "image", "file"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub name: String,
    pub value: String,
    /// `input` type, or `select` / `textarea`.
    pub kind: String,
    pub required: bool,
    /// Only meaningful for checkboxes and radios.
    pub checked: bool,
}

impl FormField {
    fn is_checkable(&self) -> bool {
        self.kind == "checkbox" || self.kind == "radio"
    }

    fn from_element(el: &Element) -> Option<Self> {
        let name = el.attr("name").filter(|n| !n.is_empty())?;
        if el.has_attr("disabled") {
            return None;
        }

        let (kind, value) = match el.tag.as_str() {
            "input" => {
                let kind = el.attr("type").unwrap_or("text").to_ascii_lowercase();
                if SKIPPED_INPUT_TYPES.contains(&kind.as_str()) {
                    return None;
                }
                let default = if kind == "checkbox" || kind == "radio" { "on" } else { "" };
                (kind, el.attr("value").unwrap_or(default).to_string())
            }
            "select" => ("select".to_string(), selected_option(el)),
            "textarea" => ("textarea".to_string(), el.text_content()),
            _ => return None,
        };

        Some(Self {
            name: name.to_string(),
            value,
            kind,
            required: el.has_attr("required"),
            checked: el.has_attr("checked"),
        })
    }
}

fn option_value(option: &Element) -> String {
    option
        .attr("value")
        .map(str::to_string)
        .unwrap_or_else(|| option.text_content().trim().to_string())
}

fn selected_option(select: &Element) -> String {
    let options: Vec<&Element> = select.descendants().filter(|el| el.tag == "option").collect();
    options
        .iter()
        .find(|o| o.has_attr("selected"))
        .or_else(|| options.first())
        .map(|o| option_value(o))
        .unwrap_or_default()
}

/// A form submitted in the background instead of navigating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AjaxForm {
    pub id: Option<String>,
    pub name: Option<String>,
    pub method: String,
    pub url: Option<String>,
    pub redirect: Option<String>,
    pub error_message: Option<String>,
    #[serde(skip_serializing)]
    pub csrf: String,
    pub fields: Vec<FormField>,
}

impl AjaxForm {
    pub fn from_element(form: &Element) -> Self {
        let non_empty = |key: &str| form.data(key).filter(|v| !v.is_empty()).map(str::to_string);

        Self {
            id: form.id().map(str::to_string),
            name: form.attr("name").map(str::to_string),
            method: non_empty("method").unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            url: form.data("url").map(str::to_string),
            redirect: non_empty("redirect"),
            error_message: non_empty("errorMessage"),
            csrf: form.data("csrf").unwrap_or_default().to_string(),
            fields: form
                .descendants()
                .filter_map(FormField::from_element)
                .collect(),
        }
    }

    /// Whether `key` names this form by id, name or target url.
    pub fn answers_to(&self, key: &str) -> bool {
        self.id.as_deref() == Some(key)
            || self.name.as_deref() == Some(key)
            || self.url.as_deref() == Some(key)
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Set the value of the first non-checkable field called `name`.
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self
            .fields
            .iter_mut()
            .find(|f| f.name == name && !f.is_checkable())
        {
            Some(field) => {
                field.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Check or uncheck the checkbox/radio `name` with `value`. Checking a
    /// radio unchecks the rest of its group.
    pub fn set_checked(&mut self, name: &str, value: &str, checked: bool) -> bool {
        let mut found = false;
        for field in self.fields.iter_mut().filter(|f| f.name == name && f.is_checkable()) {
            if field.value == value {
                field.checked = checked;
                found = true;
            } else if checked && field.kind == "radio" {
                field.checked = false;
            }
        }
        found
    }

    /// Name/value pairs that a browser would submit, in document order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter(|f| !f.is_checkable() || f.checked)
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect()
    }

    /// Constraint validation. Returns the names of invalid fields.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut invalid: Vec<String> = Vec::new();
        for field in &self.fields {
            let ok = match field.kind.as_str() {
                "checkbox" => !field.required || field.checked,
                "radio" => {
                    let group_required = self
                        .fields
                        .iter()
                        .any(|f| f.name == field.name && f.kind == "radio" && f.required);
                    !group_required
                        || self
                            .fields
                            .iter()
                            .any(|f| f.name == field.name && f.kind == "radio" && f.checked)
                }
                kind => {
                    let empty = field.value.is_empty();
                    if field.required && empty {
                        false
                    } else if empty {
                        true
                    } else {
                        match kind {
                            "email" => is_email(&field.value),
                            "number" => field.value.trim().parse::<f64>().is_ok_and(f64::is_finite),
                            _ => true,
                        }
                    }
                }
            };
            if !ok && !invalid.contains(&field.name) {
                invalid.push(field.name.clone());
            }
        }

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(invalid)
        }
    }
}

fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse, Selector};
    use pretty_assertions::assert_eq;

    fn form(html: &str) -> AjaxForm {
        let doc = parse(html);
        let el = doc.select_first(&Selector::parse("form").unwrap()).unwrap();
        AjaxForm::from_element(el)
    }

    #[test]
    fn reads_metadata_with_defaults() {
        let f = form(r#"<form id="vendor" data-url="/api/vendor/" data-csrf="tok"></form>"#);
        assert_eq!(f.method, "POST");
        assert_eq!(f.url.as_deref(), Some("/api/vendor/"));
        assert_eq!(f.redirect, None);
        assert_eq!(f.error_message, None);
        assert_eq!(f.csrf, "tok");

        let f = form(
            r#"<form data-method="PATCH" data-url="/api/store/4/" data-redirect="/stores/"
                     data-error-message="Could not save store"></form>"#,
        );
        assert_eq!(f.method, "PATCH");
        assert_eq!(f.redirect.as_deref(), Some("/stores/"));
        assert_eq!(f.error_message.as_deref(), Some("Could not save store"));
    }

    #[test]
    fn collects_submittable_fields() {
        let f = form(
            r#"<form data-url="/x/">
                 <input name="name" value="Acme">
                 <input type="checkbox" name="active" checked>
                 <input type="checkbox" name="archived">
                 <select name="store"><option value="1">A</option><option value="2" selected>B</option></select>
                 <textarea name="notes">hello</textarea>
                 <input type="submit" name="go" value="Save">
                 <input name="locked" value="x" disabled>
               </form>"#,
        );
        assert_eq!(
            f.entries(),
            vec![
                ("name".to_string(), "Acme".to_string()),
                ("active".to_string(), "on".to_string()),
                ("store".to_string(), "2".to_string()),
                ("notes".to_string(), "hello".to_string()),
            ]
        );
    }

    #[test]
    fn required_fields_must_be_filled() {
        let mut f = form(
            r#"<form><input name="serial" required><input type="email" name="mail"></form>"#,
        );
        assert_eq!(f.validate(), Err(vec!["serial".to_string()]));

        assert!(f.set_value("serial", "SN-1"));
        assert_eq!(f.validate(), Ok(()));

        f.set_value("mail", "not-an-address");
        assert_eq!(f.validate(), Err(vec!["mail".to_string()]));
    }

    #[test]
    fn required_radio_groups_need_one_choice() {
        let mut f = form(
            r#"<form><input type="radio" name="kind" value="a" required>
                     <input type="radio" name="kind" value="b"></form>"#,
        );
        assert_eq!(f.validate(), Err(vec!["kind".to_string()]));
        assert!(f.set_checked("kind", "b", true));
        assert_eq!(f.validate(), Ok(()));
        assert!(f.set_checked("kind", "a", true));
        let checked: Vec<&str> = f
            .fields
            .iter()
            .filter(|k| k.checked)
            .map(|k| k.value.as_str())
            .collect();
        assert_eq!(checked, vec!["a"]);
        assert_eq!(f.entries(), vec![("kind".to_string(), "a".to_string())]);
    }

    #[test]
    fn number_fields_must_parse() {
        let mut f = form(r#"<form><input type="number" name="qty"></form>"#);
        assert_eq!(f.validate(), Ok(()));
        f.set_value("qty", "12x");
        assert!(f.validate().is_err());
        f.set_value("qty", "12.5");
        assert_eq!(f.validate(), Ok(()));
    }
}
