//! Behaviour for server-rendered list and edit pages.
//!
//! [`init`] walks a parsed page once, picks up every element matched by the
//! configured [`Bindings`] and returns a [`Page`] whose handlers perform the
//! requests and report their effects to a [`Host`].

pub mod api;
pub mod delete;
pub mod form;
pub mod host;
pub mod widgets;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dom::{self, Element, Selector};
use crate::error::SelectorError;
use crate::pagination;

pub use api::ApiClient;
pub use delete::DeleteTrigger;
pub use form::{AjaxForm, FormField};
pub use host::{ConsoleHost, Effect, Host, Outcome, RecordingHost};
pub use widgets::{
    map_to_choices, ChoiceItem, ChoicesConfig, ChoicesWidget, DatePicker, NamedRecord,
};

/// Selectors that decide which elements get which behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bindings {
    pub ajax_form: String,
    pub delete_trigger: String,
    pub searchable_select: String,
    pub date_picker: String,
    pub pagination: String,
    pub date_format: String,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            ajax_form: ".ajax-form".to_string(),
            delete_trigger: ".delete-btn".to_string(),
            searchable_select: "select[data-choices]".to_string(),
            date_picker: ".flatpickr".to_string(),
            pagination: ".pagination".to_string(),
            date_format: widgets::DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl Bindings {
    /// Parse every selector; fails on the first malformed one.
    pub fn validate(&self) -> Result<(), SelectorError> {
        for selector in [
            &self.ajax_form,
            &self.delete_trigger,
            &self.searchable_select,
            &self.date_picker,
            &self.pagination,
        ] {
            Selector::parse(selector)?;
        }
        Ok(())
    }
}

/// A page after [`init`]: bound components plus the client their handlers use.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    #[serde(skip)]
    api: ApiClient,
    #[serde(skip)]
    pagination_mount: Selector,
    forms: Vec<AjaxForm>,
    delete_triggers: Vec<DeleteTrigger>,
    selects: Vec<ChoicesWidget>,
    date_pickers: Vec<DatePicker>,
}

/// Bind behaviour to `root` with today's local date as the date-picker limit.
pub fn init(root: &Element, bindings: &Bindings, api: ApiClient) -> Result<Page, SelectorError> {
    init_at(root, bindings, api, Local::now().date_naive())
}

pub fn init_at(
    root: &Element,
    bindings: &Bindings,
    api: ApiClient,
    today: NaiveDate,
) -> Result<Page, SelectorError> {
    let forms_sel = Selector::parse(&bindings.ajax_form)?;
    let delete_sel = Selector::parse(&bindings.delete_trigger)?;
    let select_sel = Selector::parse(&bindings.searchable_select)?;
    let date_sel = Selector::parse(&bindings.date_picker)?;
    let pagination_mount = Selector::parse(&bindings.pagination)?;

    let page = Page {
        forms: root
            .select(&forms_sel)
            .into_iter()
            .map(AjaxForm::from_element)
            .collect(),
        delete_triggers: root
            .select(&delete_sel)
            .into_iter()
            .map(DeleteTrigger::from_element)
            .collect(),
        selects: root
            .select(&select_sel)
            .into_iter()
            .map(ChoicesWidget::from_element)
            .collect(),
        date_pickers: root
            .select(&date_sel)
            .into_iter()
            .map(|el| DatePicker::from_element(el, &bindings.date_format, today))
            .collect(),
        api,
        pagination_mount,
    };

    info!(
        forms = page.forms.len(),
        delete_triggers = page.delete_triggers.len(),
        selects = page.selects.len(),
        date_pickers = page.date_pickers.len(),
        "page wired"
    );
    Ok(page)
}

impl Page {
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn forms(&self) -> &[AjaxForm] {
        &self.forms
    }

    pub fn form(&self, key: &str) -> Option<&AjaxForm> {
        self.forms.iter().find(|f| f.answers_to(key))
    }

    pub fn form_mut(&mut self, key: &str) -> Option<&mut AjaxForm> {
        self.forms.iter_mut().find(|f| f.answers_to(key))
    }

    pub fn delete_triggers(&self) -> &[DeleteTrigger] {
        &self.delete_triggers
    }

    /// Trigger for record `id`, optionally restricted to one model url.
    pub fn delete_trigger(&self, id: &str, model_url: Option<&str>) -> Option<&DeleteTrigger> {
        self.delete_triggers.iter().find(|t| {
            t.id.as_deref() == Some(id) && model_url.map_or(true, |m| t.model_url == m)
        })
    }

    pub fn selects(&self) -> &[ChoicesWidget] {
        &self.selects
    }

    pub fn select_mut(&mut self, key: &str) -> Option<&mut ChoicesWidget> {
        self.selects.iter_mut().find(|s| s.answers_to(key))
    }

    pub fn date_pickers(&self) -> &[DatePicker] {
        &self.date_pickers
    }

    pub fn date_picker(&self, key: &str) -> Option<&DatePicker> {
        self.date_pickers.iter().find(|d| d.answers_to(key))
    }

    /// Validate and send `form`. Invalid forms are never sent.
    pub async fn submit_form(&self, form: &AjaxForm, host: &dyn Host) -> Outcome {
        let outcome = match form.validate() {
            Err(invalid) => {
                warn!(?invalid, "form failed validation");
                Outcome::Alerted(form::VALIDATION_MESSAGE.to_string())
            }
            Ok(()) => match self.api.submit_form(form).await {
                Ok(()) => match &form.redirect {
                    Some(redirect) => Outcome::Navigated(redirect.clone()),
                    None => Outcome::Stayed,
                },
                Err(e) => {
                    warn!(error = %e, url = ?form.url, "form submission failed");
                    Outcome::Alerted(
                        form.error_message
                            .clone()
                            .unwrap_or_else(|| form::DEFAULT_SUBMIT_ERROR.to_string()),
                    )
                }
            },
        };
        outcome.apply(host);
        outcome
    }

    /// Ask for confirmation, then delete the trigger's record.
    pub async fn delete_item(&self, trigger: &DeleteTrigger, host: &dyn Host) -> Outcome {
        if !host.confirm(&trigger.confirm_message()) {
            return Outcome::Cancelled;
        }
        let outcome = match self.api.delete(trigger).await {
            Ok(()) => Outcome::Reloaded,
            Err(e) => {
                warn!(error = %e, model = %trigger.model_url, id = ?trigger.id, "delete failed");
                Outcome::Alerted(trigger.failure_message())
            }
        };
        outcome.apply(host);
        outcome
    }

    pub async fn fetch_custom_model<T: serde::de::DeserializeOwned>(
        &self,
        model_name: &str,
        params: &[(String, String)],
    ) -> Option<T> {
        self.api.fetch_custom_model(model_name, params).await
    }

    /// Fill the pagination mount inside `root`. Returns false when the page
    /// has no mount.
    pub fn mount_pagination(
        &self,
        root: &mut Element,
        page_no: u64,
        count: u64,
        query: &str,
    ) -> bool {
        let Some(mount) = root.find_mut(&self.pagination_mount) else {
            return false;
        };
        let markup = pagination::render(&pagination::pagination(page_no, count), query);
        mount.set_children(dom::parse(&markup).children);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"
        <form class="ajax-form" id="vendor-form" data-url="/api/vendor/" data-redirect="/vendors/">
          <input name="name" required>
          <select name="store" data-choices><option value="1">Main</option></select>
          <input class="flatpickr" name="opened">
        </form>
        <table>
          <tr><td>A</td><td><button class="delete-btn" data-id="1" data-model-url="vendor">x</button></td></tr>
          <tr><td>B</td><td><button class="delete-btn" data-id="2">x</button></td></tr>
        </table>
        <ul class="pagination"><li>stale</li></ul>
    "#;

    fn page() -> (Element, Page) {
        let root = dom::parse(PAGE);
        let api = ApiClient::new("http://localhost:8000/").unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let page = init_at(&root, &Bindings::default(), api, today).unwrap();
        (root, page)
    }

    #[test]
    fn binds_everything_the_selectors_match() {
        let (_, page) = page();
        assert_eq!(page.forms().len(), 1);
        assert_eq!(page.delete_triggers().len(), 2);
        assert_eq!(page.selects().len(), 1);
        assert_eq!(page.date_pickers().len(), 1);

        assert!(page.form("vendor-form").is_some());
        assert!(page.form("/api/vendor/").is_some());
        assert_eq!(
            page.delete_trigger("2", None).map(|t| t.model_url.as_str()),
            Some("item")
        );
        assert!(page.delete_trigger("2", Some("vendor")).is_none());
        assert_eq!(
            page.date_picker("opened").map(|d| d.max_date),
            NaiveDate::from_ymd_opt(2024, 1, 31)
        );
    }

    #[test]
    fn custom_bindings_and_bad_selectors() {
        let root = dom::parse(r#"<div class="confirm-delete" data-id="3"></div>"#);
        let bindings = Bindings {
            delete_trigger: ".confirm-delete".to_string(),
            ..Bindings::default()
        };
        let api = ApiClient::new("http://localhost:8000/").unwrap();
        let page = init(&root, &bindings, api.clone()).unwrap();
        assert_eq!(page.delete_triggers().len(), 1);

        let broken = Bindings {
            ajax_form: "form > input".to_string(),
            ..Bindings::default()
        };
        assert!(broken.validate().is_err());
        assert!(init(&root, &broken, api).is_err());
    }

    #[tokio::test]
    async fn invalid_form_alerts_without_sending() {
        let (_, page) = page();
        let host = RecordingHost::new(true);
        let form = page.form("vendor-form").unwrap();
        let outcome = page.submit_form(form, &host).await;
        assert_eq!(outcome, Outcome::Alerted("Please fill all fields.".to_string()));
        assert_eq!(host.effects(), vec![Effect::Alert("Please fill all fields.".to_string())]);
    }

    #[tokio::test]
    async fn declined_delete_sends_nothing() {
        let (_, page) = page();
        let host = RecordingHost::new(false);
        let trigger = page.delete_trigger("1", None).unwrap();
        assert_eq!(page.delete_item(trigger, &host).await, Outcome::Cancelled);
        assert_eq!(
            host.effects(),
            vec![Effect::Confirm("Are you sure you want to delete this item?".to_string())]
        );
    }

    #[test]
    fn mounts_rendered_pagination() {
        let (mut root, page) = page();
        assert!(page.mount_pagination(&mut root, 2, 25, "?q=x"));

        let mount = root.select_first(&Selector::parse(".pagination").unwrap()).unwrap();
        let labels: Vec<String> = mount
            .child_elements()
            .map(|li| li.text_content())
            .collect();
        assert_eq!(labels, vec!["Previous", "1", "2", "3", "Next"]);
        assert_eq!(
            mount.select_first(&Selector::parse(".active").unwrap()).map(|li| li.text_content()),
            Some("2".to_string())
        );

        let mut bare = dom::parse("<div></div>");
        assert!(!page.mount_pagination(&mut bare, 1, 5, ""));
    }

    #[test]
    fn zero_items_clear_a_stale_mount() {
        let (mut root, page) = page();
        let pagination = Selector::parse(".pagination").unwrap();
        let stale = root.select_first(&pagination).unwrap();
        assert_eq!(stale.text_content(), "stale");

        assert!(page.mount_pagination(&mut root, 1, 0, ""));
        let mount = root.select_first(&pagination).unwrap();
        assert_eq!(mount.child_elements().count(), 0);
        assert_eq!(mount.text_content(), "");
    }
}
