//! Model name resolution and field introspection

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::client::core::Client;
use crate::client::options::{SearchOptions, Selector};
use crate::domain::{DomainInput, TermInput};
use crate::error::{Error, Result};
use crate::model::{Model, model_name_from_attribute};
use crate::reporter::repr;

impl Client {
    /// Names of the models whose name is like `pattern`.
    ///
    /// # Errors
    ///
    /// Transport faults, [`Error::NotLoggedIn`], or
    /// [`Error::UnexpectedResult`] for records without a `model` name.
    pub async fn models(&self, pattern: &str) -> Result<Vec<String>> {
        let domain = DomainInput::Terms(vec![TermInput::from(("model", "like", pattern))]);
        let ids = self.search("ir.model", domain, SearchOptions::default()).await?;
        let records = self
            .read("ir.model", Selector::Ids(ids), vec!["model"], SearchOptions::default())
            .await?;
        let Value::Array(records) = records else {
            return Err(Error::unexpected("ir.model.read", repr(&records)));
        };
        records
            .iter()
            .map(|record| {
                record
                    .get("model")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| Error::unexpected("ir.model.read", repr(record)))
            })
            .collect()
    }

    /// Handle on the model called exactly `name`.
    ///
    /// Handles are memoized per client. A name the server does not know is
    /// reported as "Model not found" and yields `None`.
    pub async fn model(&self, name: &str) -> Result<Option<Arc<Model>>> {
        let cached = self.registry.lock().get(name).cloned();
        if cached.is_some() {
            return Ok(cached);
        }
        let known = self.models(name).await?;
        if !known.iter().any(|m| m == name) {
            tracing::warn!(model = %name, "model not found");
            self.reporter().error(&format!("Model not found: {name}"));
            return Ok(None);
        }
        let mut registry = self.registry.lock();
        let model = registry
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Model::new(name, self.session.clone())));
        Ok(Some(Arc::clone(model)))
    }

    /// Resolve a PascalCase attribute (`ResPartner`) to a model handle.
    ///
    /// # Errors
    ///
    /// [`Error::MissingAttribute`] when `attribute` does not start with an
    /// uppercase letter.
    pub async fn model_attr(&self, attribute: &str) -> Result<Option<Arc<Model>>> {
        let name = model_name_from_attribute(attribute).ok_or_else(|| Error::missing_attribute("Client", attribute))?;
        self.model(&name).await
    }

    /// Field names of `model`, `None` if the model does not exist.
    pub async fn keys(&self, model: &str) -> Result<Option<Vec<String>>> {
        match self.model(model).await? {
            Some(model) => model.keys().await.map(Some),
            None => Ok(None),
        }
    }

    /// Field definitions of `model`, `None` if the model does not exist.
    pub async fn fields(&self, model: &str) -> Result<Option<Map<String, Value>>> {
        match self.model(model).await? {
            Some(model) => model.fields().await.map(Some),
            None => Ok(None),
        }
    }

    /// Definition of one field, `None` if the model or the field is missing.
    pub async fn field(&self, model: &str, field: &str) -> Result<Option<Value>> {
        match self.model(model).await? {
            Some(model) => model.field(field).await,
            None => Ok(None),
        }
    }
}
