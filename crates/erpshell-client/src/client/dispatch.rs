//! Call an operation by name.
//!
//! This is the untyped surface used by the command line: an operation name,
//! positional JSON arguments and keyword options. Known operation names are
//! routed to the typed methods, PascalCase names resolve to models, and any
//! other name is a custom method on the model given as first argument.
//!
//! Argument checks happen before any remote call: a missing or extra
//! positional argument is an [`Error::Type`], an argument of the wrong kind
//! an [`Error::Assertion`].

use std::collections::VecDeque;

use serde_json::{Value, json};

use crate::client::core::Client;
use crate::client::operations::database::NewDatabase;
use crate::client::operations::wizards::WizardRef;
use crate::client::options::{FieldSpec, Kwargs, SearchOptions, Selector};
use crate::domain::DomainInput;
use crate::error::{Error, Result};
use crate::model::model_name_from_attribute;
use crate::reporter::repr;

/// Operations [`Client::call`] routes to a typed method.
pub const OPERATIONS: &[&str] = &[
    "search",
    "count",
    "read",
    "execute",
    "execute_kw",
    "exec_workflow",
    "wizard",
    "report",
    "render_report",
    "report_get",
    "access",
    "models",
    "model",
    "keys",
    "fields",
    "field",
    "modules",
    "install",
    "upgrade",
    "uninstall",
    "login",
    "databases",
    "create_database",
];

/// Operations whose first argument is not a model name.
const MODEL_LESS_OPERATIONS: &[&str] = &[
    "wizard",
    "report_get",
    "models",
    "model",
    "modules",
    "install",
    "upgrade",
    "uninstall",
    "login",
    "databases",
    "create_database",
];

/// Outcome of a call addressed to a model attribute.
enum ModelCall {
    Done(Value),
    Forward(String, Vec<Value>),
}

/// Positional arguments being consumed by one operation.
struct Args {
    operation: String,
    items: VecDeque<Value>,
}

impl Args {
    fn new(operation: &str, items: Vec<Value>) -> Self {
        Self {
            operation: operation.to_string(),
            items: items.into(),
        }
    }

    fn required(&mut self, what: &str) -> Result<Value> {
        self.items.pop_front().ok_or_else(|| {
            Error::Type(format!(
                "{}() missing required positional argument: '{what}'",
                self.operation
            ))
        })
    }

    fn optional(&mut self) -> Option<Value> {
        self.items.pop_front()
    }

    fn string(&mut self, what: &str) -> Result<String> {
        match self.required(what)? {
            Value::String(s) => Ok(s),
            other => Err(Error::Assertion(format!(
                "{}(): {what} must be a string, got {}",
                self.operation,
                repr(&other)
            ))),
        }
    }

    fn optional_string(&mut self, what: &str, default: &str) -> Result<String> {
        if self.items.is_empty() {
            return Ok(default.to_string());
        }
        self.string(what)
    }

    fn rest(&mut self) -> Vec<Value> {
        self.items.drain(..).collect()
    }

    /// Fail if anything is left unconsumed.
    fn finish(self, at_most: usize) -> Result<()> {
        if self.items.is_empty() {
            return Ok(());
        }
        Err(Error::Type(format!(
            "{}() takes at most {at_most} positional arguments ({} extra given)",
            self.operation,
            self.items.len()
        )))
    }
}

fn take_kwarg(kwargs: &mut Kwargs, key: &str) -> Option<Value> {
    kwargs.remove(key).filter(|v| !v.is_null())
}

fn strings(operation: &str, values: Vec<Value>) -> Result<Vec<String>> {
    values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => Ok(s),
            other => Err(Error::Assertion(format!(
                "{operation}(): expected a string, got {}",
                repr(&other)
            ))),
        })
        .collect()
}

impl Client {
    /// Call operation `name` with untyped arguments.
    ///
    /// Results that are not JSON already are converted: a model handle
    /// becomes its name, a missing model `null`, module actions `null`.
    ///
    /// # Errors
    ///
    /// Usage errors as described in the module documentation, then whatever
    /// the routed operation returns.
    pub async fn call(&self, name: &str, args: Vec<Value>, kwargs: Kwargs) -> Result<Value> {
        if model_name_from_attribute(name).is_none() {
            return self.dispatch(name, args, kwargs).await;
        }
        match self.resolve_model_call(name, args).await? {
            ModelCall::Done(value) => Ok(value),
            ModelCall::Forward(method, args) => self.dispatch(&method, args, kwargs).await,
        }
    }

    async fn dispatch(&self, name: &str, args: Vec<Value>, mut kwargs: Kwargs) -> Result<Value> {
        if name.is_empty() || name.starts_with('_') || model_name_from_attribute(name).is_some() {
            return Err(Error::missing_attribute("Client", name));
        }

        let mut args = Args::new(name, args);
        match name {
            "search" | "count" => {
                // paging on a count is a type error whatever the positionals are
                let options = SearchOptions::from_kwargs(kwargs, self.reporter())?;
                if name == "count" {
                    options.ensure_countable()?;
                }
                let model = args.string("model")?;
                let domain = DomainInput::from_value(args.optional().unwrap_or(Value::Null))?;
                args.finish(2)?;
                if name == "count" {
                    self.count(&model, domain, options).await.map(|n| json!(n))
                } else {
                    self.search(&model, domain, options).await
                }
            }
            "read" => {
                let model = args.string("model")?;
                let selector = args
                    .optional()
                    .ok_or_else(|| Error::Assertion("read(): ids or a domain are required".into()))
                    .and_then(Selector::from_value)?;
                let fields = match args.optional() {
                    Some(fields) => fields,
                    None => take_kwarg(&mut kwargs, "fields").unwrap_or(Value::Null),
                };
                args.finish(3)?;
                let fields = FieldSpec::from_value(fields)?;
                let options = SearchOptions::from_kwargs(kwargs, self.reporter())?;
                self.read(&model, selector, fields, options).await
            }
            "execute" => {
                let model = args.string("model")?;
                let method = args.string("method")?;
                let params = args.rest();
                let options = SearchOptions::from_kwargs(kwargs, self.reporter())?;
                self.execute(&model, &method, params, options).await
            }
            "execute_kw" => {
                let model = args.string("model")?;
                let method = args.string("method")?;
                let mut params = args.rest();
                if !kwargs.is_empty() {
                    params.push(Value::Object(kwargs));
                }
                self.execute_kw(&model, &method, params).await
            }
            "exec_workflow" => {
                let model = args.string("model")?;
                let signal = args.string("signal")?;
                let id = args.required("id")?;
                args.finish(3)?;
                self.exec_workflow(&model, &signal, id).await
            }
            "wizard" => {
                let wizard = WizardRef::from_value(args.required("name")?)?;
                let datas = args.optional().or_else(|| take_kwarg(&mut kwargs, "datas"));
                let action = match args.optional().or_else(|| take_kwarg(&mut kwargs, "action")) {
                    Some(Value::String(action)) => Some(action),
                    Some(other) => {
                        return Err(Error::Assertion(format!("wizard(): action must be a string, got {}", repr(&other))));
                    }
                    None => None,
                };
                let context = args.optional().or_else(|| take_kwarg(&mut kwargs, "context"));
                args.finish(4)?;
                self.report_ignored(kwargs);
                self.wizard(wizard, datas, action.as_deref(), context).await
            }
            "report" | "render_report" => {
                let model = args.string("model")?;
                let ids = args.required("ids")?;
                let datas = args.optional().or_else(|| take_kwarg(&mut kwargs, "datas"));
                let context = args.optional().or_else(|| take_kwarg(&mut kwargs, "context"));
                args.finish(4)?;
                self.report_ignored(kwargs);
                if name == "report" {
                    self.report(&model, ids, datas, context).await
                } else {
                    self.render_report(&model, ids, datas, context).await
                }
            }
            "report_get" => {
                let report_id = args.required("report_id")?;
                args.finish(1)?;
                self.report_get(report_id).await
            }
            "access" => {
                let model = args.string("model")?;
                let mode = args.optional_string("mode", "read")?;
                args.finish(2)?;
                self.access(&model, &mode).await
            }
            "models" => {
                let pattern = args.optional_string("pattern", "")?;
                args.finish(1)?;
                self.models(&pattern).await.map(|names| json!(names))
            }
            "model" => {
                let model = args.string("name")?;
                args.finish(1)?;
                let found = self.model(&model).await?;
                Ok(found.map_or(Value::Null, |m| json!(m.name())))
            }
            "keys" | "fields" => {
                let model = args.string("model")?;
                args.finish(1)?;
                if name == "keys" {
                    self.keys(&model).await.map(|keys| json!(keys))
                } else {
                    self.fields(&model).await.map(|fields| json!(fields))
                }
            }
            "field" => {
                let model = args.string("model")?;
                let field = args.string("field")?;
                args.finish(2)?;
                self.field(&model, &field).await.map(|f| f.unwrap_or(Value::Null))
            }
            "modules" => {
                let pattern = args.optional_string("pattern", "")?;
                args.finish(1)?;
                let installed = match take_kwarg(&mut kwargs, "installed") {
                    Some(Value::Bool(installed)) => Some(installed),
                    Some(other) => {
                        return Err(Error::Type(format!("installed must be a boolean, got {}", repr(&other))));
                    }
                    None => None,
                };
                self.report_ignored(kwargs);
                self.modules(&pattern, installed).await.map(|m| json!(m))
            }
            "install" | "upgrade" | "uninstall" => {
                let modules = strings(name, args.rest())?;
                let modules: Vec<&str> = modules.iter().map(String::as_str).collect();
                match name {
                    "install" => self.install(&modules).await?,
                    "upgrade" => self.upgrade(&modules).await?,
                    _ => self.uninstall(&modules).await?,
                }
                Ok(Value::Null)
            }
            "login" => {
                let user = args.string("user")?;
                let password = match args.optional() {
                    Some(Value::String(p)) => Some(p),
                    Some(Value::Null) | None => None,
                    Some(other) => {
                        return Err(Error::Assertion(format!("login(): password must be a string, got {}", repr(&other))));
                    }
                };
                let database = match args.optional() {
                    Some(Value::String(db)) => Some(db),
                    Some(Value::Null) | None => None,
                    Some(other) => {
                        return Err(Error::Assertion(format!("login(): database must be a string, got {}", repr(&other))));
                    }
                };
                args.finish(3)?;
                self.login(&user, password, database.as_deref()).await.map(|uid| json!(uid))
            }
            "databases" => {
                args.finish(0)?;
                self.databases().await.map(|dbs| json!(dbs))
            }
            "create_database" => {
                let admin_password = args.string("admin_password")?;
                let mut database = NewDatabase::new(args.string("name")?);
                args.finish(2)?;
                if let Some(demo) = take_kwarg(&mut kwargs, "demo") {
                    database = database.demo(demo.as_bool().ok_or_else(|| Error::Type("demo must be a boolean".into()))?);
                }
                if let Some(lang) = take_kwarg(&mut kwargs, "lang") {
                    database = database.lang(lang.as_str().ok_or_else(|| Error::Type("lang must be a string".into()))?);
                }
                if let Some(password) = take_kwarg(&mut kwargs, "user_password") {
                    database = database.user_password(
                        password
                            .as_str()
                            .ok_or_else(|| Error::Type("user_password must be a string".into()))?,
                    );
                }
                self.report_ignored(kwargs);
                self.create_database(&admin_password, database).await.map(|uid| json!(uid))
            }
            method => {
                // any other name is a model method
                let model = args.string("model")?;
                let params = args.rest();
                let options = SearchOptions::from_kwargs(kwargs, self.reporter())?;
                self.execute(&model, method, params, options).await
            }
        }
    }

    /// `ResPartner` alone resolves the model; `ResPartner search ...` calls
    /// the operation with the model name prepended.
    async fn resolve_model_call(&self, attribute: &str, args: Vec<Value>) -> Result<ModelCall> {
        let mut args = Args::new(attribute, args);
        let Some(model) = self.model_attr(attribute).await? else {
            return Ok(ModelCall::Done(Value::Null));
        };
        if args.items.is_empty() {
            return Ok(ModelCall::Done(json!(model.name())));
        }
        let method = args.string("method")?;
        if MODEL_LESS_OPERATIONS.contains(&method.as_str()) {
            return Err(Error::missing_attribute(model.to_string(), method));
        }
        let mut forwarded = vec![json!(model.name())];
        forwarded.extend(args.rest());
        Ok(ModelCall::Forward(method, forwarded))
    }

    fn report_ignored(&self, kwargs: Kwargs) {
        for (key, value) in kwargs {
            self.reporter().notice(&format!("Ignoring: {key} = {}", repr(&value)));
        }
    }
}
