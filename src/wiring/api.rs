use reqwest::{multipart, Client, Method, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;

use super::delete::DeleteTrigger;
use super::form::AjaxForm;
use crate::error::WiringError;

pub const CSRF_HEADER: &str = "X-CSRFToken";

/// HTTP side of the page wiring. Paths are resolved against `base`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, WiringError> {
        Ok(Self::with_client(Client::new(), Url::parse(base_url)?))
    }

    pub fn with_client(http: Client, base: Url) -> Self {
        Self { http, base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn resolve(&self, path: &str) -> Result<Url, WiringError> {
        Ok(self.base.join(path)?)
    }

    /// Send the form's entries as multipart data to its `data-url`.
    pub async fn submit_form(&self, form: &AjaxForm) -> Result<(), WiringError> {
        let target = form.url.as_deref().ok_or(WiringError::MissingUrl)?;
        let url = self.resolve(target)?;
        let method = Method::from_bytes(form.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| WiringError::Method(form.method.clone()))?;

        let body = form
            .entries()
            .into_iter()
            .fold(multipart::Form::new(), |body, (name, value)| body.text(name, value));

        debug!(%method, %url, "submitting form");
        let response = self
            .http
            .request(method, url.clone())
            .header(CSRF_HEADER, &form.csrf)
            .multipart(body)
            .send()
            .await?;
        check_status(response, &url)?;
        Ok(())
    }

    pub async fn delete(&self, trigger: &DeleteTrigger) -> Result<(), WiringError> {
        let url = self.resolve(&trigger.endpoint()?)?;
        debug!(%url, "deleting record");
        let response = self
            .http
            .delete(url.clone())
            .header(CSRF_HEADER, &trigger.csrf)
            .send()
            .await?;
        check_status(response, &url)?;
        Ok(())
    }

    /// `GET /api/custom/{model_name}/` with `params` as the query string.
    pub async fn custom_model<T: DeserializeOwned>(
        &self,
        model_name: &str,
        params: &[(String, String)],
    ) -> Result<T, WiringError> {
        let mut url = self.resolve(&format!("/api/custom/{}/", model_name))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        let response = self.http.get(url.clone()).send().await?;
        Ok(check_status(response, &url)?.json::<T>().await?)
    }

    /// Like [`ApiClient::custom_model`], but failures are logged and turned
    /// into `None`.
    pub async fn fetch_custom_model<T: DeserializeOwned>(
        &self,
        model_name: &str,
        params: &[(String, String)],
    ) -> Option<T> {
        match self.custom_model(model_name, params).await {
            Ok(data) => Some(data),
            Err(e) => {
                error!(model = model_name, error = %e, "Error fetching custom model data");
                None
            }
        }
    }
}

fn check_status(response: Response, url: &Url) -> Result<Response, WiringError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(WiringError::Status {
            status,
            url: url.to_string(),
        })
    }
}
