use serde::Serialize;

use crate::dom::Element;
use crate::error::WiringError;

pub const DEFAULT_MODEL: &str = "item";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteTrigger {
    pub id: Option<String>,
    pub model_url: String,
    pub model_name: String,
    #[serde(skip_serializing)]
    pub csrf: String,
}

impl DeleteTrigger {
    pub fn from_element(el: &Element) -> Self {
        let or_default = |key: &str| {
            el.data(key)
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_MODEL)
                .to_string()
        };

        Self {
            id: el.data("id").filter(|v| !v.is_empty()).map(str::to_string),
            model_url: or_default("modelUrl"),
            model_name: or_default("modelName"),
            csrf: el.data("csrf").unwrap_or_default().to_string(),
        }
    }

    /// `/api/{model_url}/{id}/`
    pub fn endpoint(&self) -> Result<String, WiringError> {
        let id = self.id.as_deref().ok_or(WiringError::MissingId)?;
        Ok(format!("/api/{}/{}/", self.model_url, id))
    }

    pub fn confirm_message(&self) -> String {
        format!("Are you sure you want to delete this {}?", self.model_name)
    }

    pub fn failure_message(&self) -> String {
        format!("Failed to delete {}.", self.model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse, Selector};
    use pretty_assertions::assert_eq;

    fn trigger(html: &str) -> DeleteTrigger {
        let doc = parse(html);
        let el = doc.select_first(&Selector::parse("button").unwrap()).unwrap();
        DeleteTrigger::from_element(el)
    }

    #[test]
    fn missing_model_attributes_fall_back_to_item() {
        let t = trigger(r#"<button class="delete-btn" data-id="7" data-csrf="abc">x</button>"#);
        assert_eq!(t.endpoint().unwrap(), "/api/item/7/");
        assert_eq!(t.confirm_message(), "Are you sure you want to delete this item?");
        assert_eq!(t.failure_message(), "Failed to delete item.");
        assert_eq!(t.csrf, "abc");
    }

    #[test]
    fn uses_model_url_and_name() {
        let t = trigger(
            r#"<button data-id="12" data-model-url="vendor" data-model-name="vendor record"></button>"#,
        );
        assert_eq!(t.endpoint().unwrap(), "/api/vendor/12/");
        assert_eq!(
            t.confirm_message(),
            "Are you sure you want to delete this vendor record?"
        );
    }

    #[test]
    fn endpoint_needs_an_id() {
        let t = trigger(r#"<button data-model-url="store"></button>"#);
        assert!(matches!(t.endpoint(), Err(WiringError::MissingId)));
    }
}
