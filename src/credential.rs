//! Credential gate: makes sure an API key is active before a batch goes out.
//!
//! Key management is an optional host capability. When the host offers one
//! it is injected as a [`KeySelector`]; when it does not, [`NoKeySelector`]
//! treats the environment as pre-authorized.

use crate::error::{Result, WallGenError};
use async_trait::async_trait;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["API_KEY", "GOOGLE_API_KEY"];

/// Reads the first non-empty API key from the environment.
pub fn env_api_key() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Shared, replaceable API key selected at runtime.
///
/// Providers read it at construction, ahead of the environment.
#[derive(Debug, Clone, Default)]
pub struct ApiKeySlot {
    inner: Arc<RwLock<Option<String>>>,
}

impl ApiKeySlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the selected key, if any.
    pub fn get(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replaces the selected key.
    pub fn set(&self, key: impl Into<String>) {
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(key.into());
    }

    /// Returns true if a key has been selected.
    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }
}

/// Host capability for interactive key management.
#[async_trait]
pub trait KeySelector: Send + Sync {
    /// Returns true if a key is already selected.
    async fn has_selected_api_key(&self) -> Result<bool>;

    /// Runs the interactive selection flow. Returns true if a key was chosen.
    async fn open_select_key(&self) -> Result<bool>;
}

/// Selector for hosts without key management. Always reports a key.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeySelector;

#[async_trait]
impl KeySelector for NoKeySelector {
    async fn has_selected_api_key(&self) -> Result<bool> {
        Ok(true)
    }

    async fn open_select_key(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Asks for an API key on the terminal when none is configured.
#[derive(Debug, Clone, Default)]
pub struct TerminalKeySelector {
    slot: ApiKeySlot,
}

impl TerminalKeySelector {
    /// Creates a selector that stores the entered key in `slot`.
    pub fn new(slot: ApiKeySlot) -> Self {
        Self { slot }
    }
}

#[async_trait]
impl KeySelector for TerminalKeySelector {
    async fn has_selected_api_key(&self) -> Result<bool> {
        Ok(self.slot.is_set() || env_api_key().is_some())
    }

    async fn open_select_key(&self) -> Result<bool> {
        let line = tokio::task::spawn_blocking(|| -> std::io::Result<String> {
            let mut stderr = std::io::stderr();
            write!(
                stderr,
                "No API key found ({}). Enter a Gemini API key: ",
                API_KEY_ENV_VARS.join(", ")
            )?;
            stderr.flush()?;

            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            Ok(line)
        })
        .await
        .map_err(|e| WallGenError::Credential(format!("key prompt task failed: {e}")))??;

        let key = line.trim();
        if key.is_empty() {
            return Ok(false);
        }
        self.slot.set(key);
        Ok(true)
    }
}

/// Ensures a usable credential is active before generation.
pub struct CredentialGate {
    selector: Arc<dyn KeySelector>,
    prompts: AtomicUsize,
}

impl CredentialGate {
    /// Creates a gate backed by the given host capability.
    pub fn new(selector: Arc<dyn KeySelector>) -> Self {
        Self {
            selector,
            prompts: AtomicUsize::new(0),
        }
    }

    /// Creates a gate for hosts without key management.
    pub fn unmanaged() -> Self {
        Self::new(Arc::new(NoKeySelector))
    }

    /// Returns whether a usable credential is now active.
    ///
    /// Prompts only when no key is selected, so repeated calls with a key in
    /// place never prompt again.
    pub async fn ensure_credential(&self) -> Result<bool> {
        if self.selector.has_selected_api_key().await? {
            return Ok(true);
        }

        self.prompts.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("no API key selected, opening key selection");
        let selected = self.selector.open_select_key().await?;
        if !selected {
            tracing::warn!("key selection declined");
        }
        Ok(selected)
    }

    /// Number of interactive selections opened so far.
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::Relaxed)
    }
}

impl Default for CredentialGate {
    fn default() -> Self {
        Self::unmanaged()
    }
}

impl std::fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGate")
            .field("prompts", &self.prompt_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Selector whose interactive flow picks a key when `accept` is set.
    pub(crate) struct FakeSelector {
        pub(crate) slot: ApiKeySlot,
        pub(crate) accept: bool,
        pub(crate) fail: bool,
    }

    impl FakeSelector {
        pub(crate) fn accepting() -> Self {
            Self {
                slot: ApiKeySlot::new(),
                accept: true,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl KeySelector for FakeSelector {
        async fn has_selected_api_key(&self) -> Result<bool> {
            if self.fail {
                return Err(WallGenError::Credential("host unavailable".into()));
            }
            Ok(self.slot.is_set())
        }

        async fn open_select_key(&self) -> Result<bool> {
            if self.accept {
                self.slot.set("test-key");
            }
            Ok(self.accept)
        }
    }

    #[tokio::test]
    async fn test_unmanaged_gate_is_pre_authorized() {
        let gate = CredentialGate::unmanaged();
        assert!(gate.ensure_credential().await.unwrap());
        assert_eq!(gate.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_gate_prompts_once_then_is_idempotent() {
        let gate = CredentialGate::new(Arc::new(FakeSelector::accepting()));

        assert!(gate.ensure_credential().await.unwrap());
        assert_eq!(gate.prompt_count(), 1);

        assert!(gate.ensure_credential().await.unwrap());
        assert_eq!(gate.prompt_count(), 1);
    }

    #[tokio::test]
    async fn test_gate_with_preselected_key_never_prompts() {
        let selector = FakeSelector::accepting();
        selector.slot.set("already-there");
        let gate = CredentialGate::new(Arc::new(selector));

        assert!(gate.ensure_credential().await.unwrap());
        assert!(gate.ensure_credential().await.unwrap());
        assert_eq!(gate.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_gate_reports_declined_selection() {
        let selector = FakeSelector {
            slot: ApiKeySlot::new(),
            accept: false,
            fail: false,
        };
        let gate = CredentialGate::new(Arc::new(selector));

        assert!(!gate.ensure_credential().await.unwrap());
        assert_eq!(gate.prompt_count(), 1);
    }

    #[tokio::test]
    async fn test_gate_surfaces_host_errors() {
        let selector = FakeSelector {
            slot: ApiKeySlot::new(),
            accept: true,
            fail: true,
        };
        let gate = CredentialGate::new(Arc::new(selector));
        assert!(matches!(
            gate.ensure_credential().await,
            Err(WallGenError::Credential(_))
        ));
    }

    #[tokio::test]
    async fn test_terminal_selector_sees_slot_key() {
        let slot = ApiKeySlot::new();
        slot.set("from-slot");
        let selector = TerminalKeySelector::new(slot.clone());
        assert!(selector.has_selected_api_key().await.unwrap());
        assert_eq!(slot.get().as_deref(), Some("from-slot"));
    }
}
