//! Record operations
//!
//! Everything here is an `object.execute` call with the authentication triple
//! prepended. Argument shapes are kept minimal: optional trailing arguments
//! are only sent when the caller supplied them, so older servers keep
//! accepting the calls.

use serde_json::{Value, json};

use crate::client::core::Session;
use crate::client::options::{FieldSpec, SearchOptions, Selector};
use crate::domain::{self, DomainInput};
use crate::error::{Error, Result};
use crate::reporter::repr;

impl Session {
    /// Ids of the records matching `domain`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDomain`] for malformed terms, [`Error::NotLoggedIn`],
    /// and server faults.
    pub async fn search(
        &self,
        model: &str,
        domain: impl Into<DomainInput>,
        options: SearchOptions,
    ) -> Result<Value> {
        let domain = domain::compile(domain.into(), self.reporter())?;
        let mut args = vec![domain.to_value()];
        args.extend(options.search_tail());
        self.object_execute(model, "search", args).await
    }

    /// Number of records matching `domain`.
    ///
    /// # Errors
    ///
    /// [`Error::Type`] if `offset`, `limit` or `order` is set, plus the
    /// errors of [`Session::search`].
    pub async fn count(
        &self,
        model: &str,
        domain: impl Into<DomainInput>,
        options: SearchOptions,
    ) -> Result<i64> {
        options.ensure_countable()?;
        let domain = domain::compile(domain.into(), self.reporter())?;
        let mut args = vec![domain.to_value()];
        args.extend(options.context);
        let answer = self.object_execute(model, "search_count", args).await?;
        answer
            .as_i64()
            .ok_or_else(|| Error::unexpected(format!("{model}.search_count"), repr(&answer)))
    }

    /// Read records selected by ids or by a domain.
    ///
    /// Ids are passed through exactly as given, a scalar id stays a scalar.
    /// A domain is searched first with `options`. With a
    /// [`FieldSpec::Template`] each record comes back rendered as a string.
    ///
    /// # Errors
    ///
    /// As for [`Session::search`].
    pub async fn read(
        &self,
        model: &str,
        selector: impl Into<Selector>,
        fields: impl Into<FieldSpec>,
        options: SearchOptions,
    ) -> Result<Value> {
        let ids = match selector.into() {
            Selector::Ids(ids) => ids,
            Selector::Domain(domain) => self.search(model, domain, options.clone()).await?,
        };
        let fields = fields.into();
        let mut args = vec![ids, fields.to_value()];
        args.extend(options.context);
        let records = self.object_execute(model, "read", args).await?;
        Ok(fields.render(records))
    }

    pub async fn write(&self, model: &str, ids: impl Into<Value>, values: Value) -> Result<Value> {
        self.object_execute(model, "write", vec![ids.into(), values]).await
    }

    pub async fn create(&self, model: &str, values: Value) -> Result<Value> {
        self.object_execute(model, "create", vec![values]).await
    }

    pub async fn copy(&self, model: &str, id: impl Into<Value>, default: Option<Value>) -> Result<Value> {
        let mut args = vec![id.into()];
        args.extend(default);
        self.object_execute(model, "copy", args).await
    }

    pub async fn unlink(&self, model: &str, ids: impl Into<Value>) -> Result<Value> {
        self.object_execute(model, "unlink", vec![ids.into()]).await
    }

    pub async fn perm_read(&self, model: &str, ids: impl Into<Value>) -> Result<Value> {
        self.object_execute(model, "perm_read", vec![ids.into()]).await
    }

    /// Call any model method, arguments passed through untouched.
    pub async fn call_method(&self, model: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        self.object_execute(model, method, args).await
    }

    /// Generic `object.execute` that routes the methods with local semantics.
    ///
    /// `search`, `search_count` and `read` go through the same argument
    /// handling as [`Session::search`], [`Session::count`] and
    /// [`Session::read`], taking the domain (or ids) and the field list from
    /// `params`. Any other method gets `params` followed by the context, if
    /// one is set; paging options are reported as ignored.
    ///
    /// # Errors
    ///
    /// [`Error::Assertion`] when `read` is given no ids, plus the errors of
    /// the routed operation.
    pub async fn execute(
        &self,
        model: &str,
        method: &str,
        params: Vec<Value>,
        options: SearchOptions,
    ) -> Result<Value> {
        let mut params = params.into_iter();
        match method {
            "search" => {
                let domain = DomainInput::from_value(params.next().unwrap_or(Value::Null))?;
                self.search(model, domain, options).await
            }
            "search_count" => {
                let domain = DomainInput::from_value(params.next().unwrap_or(Value::Null))?;
                self.count(model, domain, options).await.map(|n| json!(n))
            }
            "read" => {
                let selector = params
                    .next()
                    .ok_or_else(|| Error::Assertion(format!("{model}.read needs ids or a domain")))
                    .and_then(Selector::from_value)?;
                let fields = FieldSpec::from_value(params.next().unwrap_or(Value::Null))?;
                self.read(model, selector, fields, options).await
            }
            _ => {
                options.report_unused_paging(self.reporter());
                let mut args: Vec<Value> = params.collect();
                args.extend(options.context);
                self.object_execute(model, method, args).await
            }
        }
    }

    /// `object.execute_kw`, newer servers only.
    ///
    /// # Errors
    ///
    /// [`Error::MissingAttribute`] on legacy servers.
    pub async fn execute_kw(&self, model: &str, method: &str, params: Vec<Value>) -> Result<Value> {
        let object = &self.inner.services.object;
        self.authenticated_call(object, "execute_kw", [model, method], params).await
    }

    /// Fire a workflow signal on one record.
    pub async fn exec_workflow(&self, model: &str, signal: &str, id: impl Into<Value>) -> Result<Value> {
        let object = &self.inner.services.object;
        self.authenticated_call(object, "exec_workflow", [model, signal], vec![id.into()])
            .await
    }

    /// Whether the current user has `mode` access (`read`, `write`,
    /// `create`, `unlink`) on `model`.
    pub async fn access(&self, model: &str, mode: &str) -> Result<Value> {
        self.object_execute("ir.model.access", "check", vec![json!(model), json!(mode)])
            .await
    }
}
