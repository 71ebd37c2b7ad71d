//! Interactive password entry

use std::io::IsTerminal;

use dialoguer::Password;
use erpshell_client::{PasswordPrompt, ServerIdentity};

/// Asks on the terminal; never asks when stdin is not a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    /// Ask for a password with a free-form label.
    pub fn ask(label: &str) -> Option<String> {
        if !std::io::stdin().is_terminal() {
            return None;
        }
        Password::new()
            .with_prompt(label)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| tracing::warn!(error = %e, "password prompt failed"))
            .ok()
    }
}

impl PasswordPrompt for TerminalPrompt {
    fn prompt(&self, identity: &ServerIdentity) -> Option<String> {
        Self::ask(&format!("Password for {}", identity))
    }
}
