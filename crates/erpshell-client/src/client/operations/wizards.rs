//! Wizard and report services

use serde_json::{Map, Value, json};

use crate::client::core::Session;
use crate::error::{Error, Result};
use crate::reporter::repr;

/// A wizard to run: by name (a new instance is created) or by the id of an
/// instance created earlier.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardRef {
    Name(String),
    Id(Value),
}

impl WizardRef {
    /// # Errors
    ///
    /// [`Error::Assertion`] for anything but a string or a number.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(name) => Ok(Self::Name(name)),
            id @ Value::Number(_) => Ok(Self::Id(id)),
            other => Err(Error::Assertion(format!("wizard must be a name or an id, got {}", repr(&other)))),
        }
    }
}

impl From<&str> for WizardRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<i64> for WizardRef {
    fn from(id: i64) -> Self {
        Self::Id(json!(id))
    }
}

/// Trailing `datas, context` arguments, only sent when one of them is given.
fn optional_tail(datas: Option<Value>, context: Option<Value>) -> Vec<Value> {
    if datas.is_none() && context.is_none() {
        return Vec::new();
    }
    vec![
        datas.unwrap_or_else(|| Value::Object(Map::new())),
        context.unwrap_or(Value::Null),
    ]
}

impl Session {
    /// Create and/or step a wizard.
    ///
    /// Without an `action`, only creates the instance (when given a name) and
    /// returns its id. With an action, executes that step with `datas`
    /// (default `{}`) and returns the step's result.
    pub async fn wizard(
        &self,
        wizard: impl Into<WizardRef>,
        datas: Option<Value>,
        action: Option<&str>,
        context: Option<Value>,
    ) -> Result<Value> {
        let service = &self.inner.services.wizard;
        let id = match wizard.into() {
            WizardRef::Name(name) => self.authenticated_call(service, "create", [name.as_str()], vec![]).await?,
            WizardRef::Id(id) => id,
        };
        let Some(action) = action else {
            return Ok(id);
        };
        let args = vec![
            id,
            datas.unwrap_or_else(|| Value::Object(Map::new())),
            json!(action),
            context.unwrap_or(Value::Null),
        ];
        self.authenticated_call(service, "execute", [], args).await
    }

    /// Start a report job; returns the job id to poll with
    /// [`Session::report_get`].
    pub async fn report(
        &self,
        model: &str,
        ids: impl Into<Value>,
        datas: Option<Value>,
        context: Option<Value>,
    ) -> Result<Value> {
        let mut args = vec![ids.into()];
        args.extend(optional_tail(datas, context));
        self.authenticated_call(&self.inner.services.report, "report", [model], args)
            .await
    }

    /// Render a report synchronously. Newer servers only.
    ///
    /// # Errors
    ///
    /// [`Error::MissingAttribute`] on legacy servers.
    pub async fn render_report(
        &self,
        model: &str,
        ids: impl Into<Value>,
        datas: Option<Value>,
        context: Option<Value>,
    ) -> Result<Value> {
        let mut args = vec![ids.into()];
        args.extend(optional_tail(datas, context));
        self.authenticated_call(&self.inner.services.report, "render_report", [model], args)
            .await
    }

    /// State (and, once done, the content) of a report job.
    pub async fn report_get(&self, report_id: impl Into<Value>) -> Result<Value> {
        self.authenticated_call(&self.inner.services.report, "report_get", [], vec![report_id.into()])
            .await
    }
}
