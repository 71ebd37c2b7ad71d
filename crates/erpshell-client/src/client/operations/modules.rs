//! Module listing and the install / upgrade / uninstall dispatcher
//!
//! A module action is several calls on `ir.module.module` followed by a
//! finalisation step that differs between protocol generations: newer
//! servers apply pending changes with `base.module.upgrade.upgrade_module`,
//! older ones through the `module.upgrade` wizard.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Value, json};
use tracing::Instrument;

use crate::client::core::Session;
use crate::client::options::{SearchOptions, Selector};
use crate::domain::{DomainInput, TermInput};
use crate::error::{Error, Result};
use crate::reporter::repr;
use crate::service::ProtocolGeneration;

const MODULE_MODEL: &str = "ir.module.module";
const UPGRADE_MODEL: &str = "base.module.upgrade";
const UPGRADE_WIZARD: &str = "module.upgrade";
/// States in which a module needs nothing more.
const SETTLED_STATES: [&str; 3] = ["uninstallable", "uninstalled", "installed"];

/// What to do with the named modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleAction {
    Install,
    Upgrade,
    Uninstall,
}

impl ModuleAction {
    /// The `ir.module.module` button that schedules this action.
    pub fn button(self) -> &'static str {
        match self {
            Self::Install => "button_install",
            Self::Upgrade => "button_upgrade",
            Self::Uninstall => "button_uninstall",
        }
    }
}

impl fmt::Display for ModuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Upgrade => write!(f, "upgrade"),
            Self::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// A module left in a transitional state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingModule {
    pub name: String,
    pub state: String,
}

/// Steps of one dispatcher run.
#[derive(Debug)]
enum DispatchState {
    UpdateList,
    LocateTargets,
    TriggerButton(Value),
    CollectPending,
    Finalize,
    Report,
}

/// Data accumulated while a run progresses.
#[derive(Debug, Default)]
struct ActionPlan {
    pending: Vec<PendingModule>,
}

impl Session {
    /// Modules whose name is like `pattern`, grouped by state.
    ///
    /// `installed` narrows the search to installed (`Some(true)`) or not
    /// installed (`Some(false)`) modules.
    pub async fn modules(&self, pattern: &str, installed: Option<bool>) -> Result<BTreeMap<String, Vec<String>>> {
        let mut domain: Vec<TermInput> = vec![("name", "like", pattern).into()];
        if let Some(installed) = installed {
            let operator = if installed { "=" } else { "!=" };
            domain.push(("state", operator, "installed").into());
        }
        let ids = self
            .search(MODULE_MODEL, DomainInput::Terms(domain), SearchOptions::default())
            .await?;
        let records = self
            .read(MODULE_MODEL, Selector::Ids(ids), vec!["name", "state"], SearchOptions::default())
            .await?;

        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for module in parse_modules(&records)? {
            grouped.entry(module.state).or_default().push(module.name);
        }
        for names in grouped.values_mut() {
            names.sort();
        }
        Ok(grouped)
    }

    pub async fn install(&self, modules: &[&str]) -> Result<()> {
        self.module_action(ModuleAction::Install, modules).await
    }

    pub async fn upgrade(&self, modules: &[&str]) -> Result<()> {
        self.module_action(ModuleAction::Upgrade, modules).await
    }

    pub async fn uninstall(&self, modules: &[&str]) -> Result<()> {
        self.module_action(ModuleAction::Uninstall, modules).await
    }

    /// Run `action` on `modules`.
    ///
    /// Outcomes are only reported: the summary of modules left "to process"
    /// goes to the reporter, and the call returns `()` whether or not the
    /// modules reached their target state. Unknown module names are skipped.
    ///
    /// # Errors
    ///
    /// Transport faults, and [`Error::NotLoggedIn`].
    pub async fn module_action(&self, action: ModuleAction, modules: &[&str]) -> Result<()> {
        let span = tracing::info_span!("module_action", %action, modules = ?modules);
        self.run_module_action(action, modules).instrument(span).await
    }

    async fn run_module_action(&self, action: ModuleAction, modules: &[&str]) -> Result<()> {
        let mut plan = ActionPlan::default();
        let mut state = DispatchState::UpdateList;
        loop {
            tracing::debug!(?state, "module dispatch step");
            state = match state {
                DispatchState::UpdateList => {
                    let counts = self.object_execute(MODULE_MODEL, "update_list", vec![]).await?;
                    if let Some(added) = added_modules(&counts) {
                        self.reporter().notice(&format!("{added} module(s) added to the list"));
                    }
                    DispatchState::LocateTargets
                }
                DispatchState::LocateTargets => {
                    let domain = vec![TermInput::from(("name", "in", json!(modules)))];
                    let ids = self.search(MODULE_MODEL, domain, SearchOptions::default()).await?;
                    if is_empty_list(&ids) {
                        tracing::warn!(modules = ?modules, "no matching module");
                        DispatchState::Report
                    } else {
                        DispatchState::TriggerButton(ids)
                    }
                }
                DispatchState::TriggerButton(ids) => {
                    self.object_execute(MODULE_MODEL, action.button(), vec![ids]).await?;
                    DispatchState::CollectPending
                }
                DispatchState::CollectPending => {
                    let domain = vec![TermInput::from(("state", "not in", json!(SETTLED_STATES)))];
                    let ids = self.search(MODULE_MODEL, domain, SearchOptions::default()).await?;
                    let records = self
                        .read(MODULE_MODEL, Selector::Ids(ids), vec!["name", "state"], SearchOptions::default())
                        .await?;
                    plan.pending = parse_modules(&records)?;
                    if plan.pending.is_empty() {
                        DispatchState::Report
                    } else {
                        DispatchState::Finalize
                    }
                }
                DispatchState::Finalize => {
                    self.finalize_module_changes().await?;
                    DispatchState::Report
                }
                DispatchState::Report => {
                    self.report_pending(&plan.pending);
                    return Ok(());
                }
            };
        }
    }

    async fn finalize_module_changes(&self) -> Result<()> {
        match self.generation() {
            ProtocolGeneration::Modern => {
                self.object_execute(UPGRADE_MODEL, "upgrade_module", vec![json!([])]).await?;
            }
            ProtocolGeneration::Legacy => {
                // only the "start" transition is driven; the wizard's
                // configuration step is left to the operator
                let answer = self.wizard(UPGRADE_WIZARD, None, Some("start"), None).await?;
                tracing::debug!(answer = %repr(&answer), "module.upgrade wizard started");
            }
        }
        Ok(())
    }

    fn report_pending(&self, pending: &[PendingModule]) {
        let mut lines = vec![format!("{} module(s) to process:", pending.len())];
        lines.extend(pending.iter().map(|m| format!("  {}\t{}", m.state, m.name)));
        self.reporter().notice(&lines.join("\n"));
    }
}

/// New modules found by `update_list`, which answers `[updated, added]`.
fn added_modules(counts: &Value) -> Option<i64> {
    counts.get(1).and_then(Value::as_i64).filter(|&added| added > 0)
}

fn is_empty_list(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Null | Value::Bool(false) => true,
        _ => false,
    }
}

fn parse_modules(records: &Value) -> Result<Vec<PendingModule>> {
    let Value::Array(items) = records else {
        return Err(Error::unexpected(format!("{MODULE_MODEL}.read"), repr(records)));
    };
    items
        .iter()
        .map(|record| {
            let text = |key: &str| record.get(key).and_then(Value::as_str).map(str::to_string);
            match (text("name"), text("state")) {
                (Some(name), Some(state)) => Ok(PendingModule { name, state }),
                _ => Err(Error::unexpected(format!("{MODULE_MODEL}.read"), repr(record))),
            }
        })
        .collect()
}
