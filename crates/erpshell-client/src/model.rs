//! Per-model facade.
//!
//! A [`Model`] is a named record collection on the server (`res.partner`,
//! `ir.module.module`, ...). Client code usually reaches one through its
//! attribute spelling: `ResPartner` resolves to `res.partner`.

use std::fmt;

use convert_case::{Case, Casing};
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::client::{FieldSpec, SearchOptions, Selector, Session};
use crate::domain::DomainInput;
use crate::error::{Error, Result};
use crate::reporter::repr;

/// `ResPartner` -> `res.partner`.
///
/// Returns `None` for names that do not start with an uppercase letter; those
/// are never model references.
pub fn model_name_from_attribute(attribute: &str) -> Option<String> {
    if !attribute.chars().next().is_some_and(char::is_uppercase) {
        return None;
    }
    Some(attribute.to_case(Case::Snake).replace('_', "."))
}

/// `res.partner` -> `ResPartner`.
pub fn attribute_name(model: &str) -> String {
    model.replace('.', "_").to_case(Case::Pascal)
}

/// Handle on one remote model.
///
/// Handles come from [`Client::model`](crate::Client::model) and are shared:
/// asking the same client for the same name twice yields the same `Arc`.
pub struct Model {
    name: String,
    session: Session,
    keys: Mutex<Option<Vec<String>>>,
    fields: Mutex<Option<Map<String, Value>>>,
}

impl Model {
    pub(crate) fn new(name: impl Into<String>, session: Session) -> Self {
        Self {
            name: name.into(),
            session,
            keys: Mutex::new(None),
            fields: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// PascalCase spelling of the name.
    pub fn attribute_name(&self) -> String {
        attribute_name(&self.name)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn search(&self, domain: impl Into<DomainInput>, options: SearchOptions) -> Result<Value> {
        self.session.search(&self.name, domain, options).await
    }

    pub async fn count(&self, domain: impl Into<DomainInput>, options: SearchOptions) -> Result<i64> {
        self.session.count(&self.name, domain, options).await
    }

    pub async fn read(
        &self,
        selector: impl Into<Selector>,
        fields: impl Into<FieldSpec>,
        options: SearchOptions,
    ) -> Result<Value> {
        self.session.read(&self.name, selector, fields, options).await
    }

    pub async fn write(&self, ids: impl Into<Value>, values: Value) -> Result<Value> {
        self.session.write(&self.name, ids, values).await
    }

    pub async fn create(&self, values: Value) -> Result<Value> {
        self.session.create(&self.name, values).await
    }

    pub async fn copy(&self, id: impl Into<Value>, default: Option<Value>) -> Result<Value> {
        self.session.copy(&self.name, id, default).await
    }

    pub async fn unlink(&self, ids: impl Into<Value>) -> Result<Value> {
        self.session.unlink(&self.name, ids).await
    }

    pub async fn perm_read(&self, ids: impl Into<Value>) -> Result<Value> {
        self.session.perm_read(&self.name, ids).await
    }

    /// Any other model method, arguments passed through.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        self.session.call_method(&self.name, method, args).await
    }

    /// Field names, fetched once with `fields_get_keys`.
    ///
    /// # Errors
    ///
    /// Transport faults, or [`Error::UnexpectedResult`] if the server did not
    /// answer with a list of names.
    pub async fn keys(&self) -> Result<Vec<String>> {
        if let Some(keys) = self.keys.lock().clone() {
            return Ok(keys);
        }
        let answer = self.session.object_execute(&self.name, "fields_get_keys", vec![]).await?;
        let keys: Vec<String> = serde_json::from_value(answer.clone())
            .map_err(|_| Error::unexpected(format!("{}.fields_get_keys", self.name), repr(&answer)))?;
        *self.keys.lock() = Some(keys.clone());
        Ok(keys)
    }

    /// Field definitions, fetched once with `fields_get`.
    ///
    /// # Errors
    ///
    /// Transport faults, or [`Error::UnexpectedResult`] if the answer is not a
    /// mapping.
    pub async fn fields(&self) -> Result<Map<String, Value>> {
        if let Some(fields) = self.fields.lock().clone() {
            return Ok(fields);
        }
        let fields = match self.session.object_execute(&self.name, "fields_get", vec![]).await? {
            Value::Object(map) => map,
            other => return Err(Error::unexpected(format!("{}.fields_get", self.name), repr(&other))),
        };
        *self.fields.lock() = Some(fields.clone());
        Ok(fields)
    }

    /// Definition of one field, `None` if the model has no such field.
    pub async fn field(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.fields().await?.get(name).cloned())
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Model '{}'>", self.name)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model").field("name", &self.name).finish_non_exhaustive()
    }
}
