use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::conversation_state::{Conversation, ConversationStore};
use crate::config::{AppConfig, BackendId};
use crate::error::{ChatError, GatewayError};
use crate::gateway::{GatewayTable, Message, Role};
use crate::scenarios::Scenario;

/// What happened to a submitted message.
#[derive(Debug)]
pub enum TurnOutcome {
    /// Blank input; nothing was appended and no model was called.
    Ignored,
    /// The model replied and the reply was appended.
    Replied(Message),
    /// The model answered with empty content; only the user message was kept.
    NoReply,
    /// The model call failed; only the user message was kept.
    Failed(GatewayError),
}

struct BackendProfile {
    pretty_name: String,
    strip_prefix: Option<String>,
    show_hints: bool,
}

/// Everything one chat session needs: conversations, model clients, the
/// current selection and per-backend turn state.
///
/// Each backend has its own in-flight flag, so turns on different backends
/// can overlap while a second send to a busy backend is refused.
pub struct ChatSession {
    store: ConversationStore,
    gateways: GatewayTable,
    order: Vec<BackendId>,
    profiles: BTreeMap<BackendId, BackendProfile>,
    selected: Mutex<BackendId>,
    in_flight: Mutex<HashSet<BackendId>>,
    scenarios: Mutex<BTreeMap<BackendId, &'static Scenario>>,
    timeout: Duration,
}

impl ChatSession {
    pub fn new(config: &AppConfig, gateways: GatewayTable) -> Result<Self, ChatError> {
        let store = ConversationStore::new(
            config
                .backends
                .iter()
                .map(|b| (b.id.clone(), b.system_message.clone())),
        );

        if !store.contains(&config.default_backend) {
            return Err(ChatError::UnknownBackend(config.default_backend.to_string()));
        }

        let order = config.backends.iter().map(|b| b.id.clone()).collect();
        let profiles = config
            .backends
            .iter()
            .map(|b| {
                let profile = BackendProfile {
                    pretty_name: b.pretty_name.clone(),
                    strip_prefix: b.strip_prefix.clone(),
                    show_hints: b.show_hints,
                };
                (b.id.clone(), profile)
            })
            .collect();

        Ok(Self {
            store,
            gateways,
            order,
            profiles,
            selected: Mutex::new(config.default_backend.clone()),
            in_flight: Mutex::new(HashSet::new()),
            scenarios: Mutex::new(BTreeMap::new()),
            timeout: config.timeout,
        })
    }

    /// Configured backends in display order.
    pub fn list_backends(&self) -> &[BackendId] {
        &self.order
    }

    pub fn pretty_name(&self, id: &BackendId) -> Result<&str, ChatError> {
        Ok(&self.profile(id)?.pretty_name)
    }

    pub fn conversation(&self, id: &BackendId) -> Result<Conversation, ChatError> {
        self.store.get(id)
    }

    pub fn has_user_turn(&self, id: &BackendId) -> Result<bool, ChatError> {
        self.store.has_user_turn(id)
    }

    pub fn selected(&self) -> BackendId {
        lock(&self.selected).clone()
    }

    /// Switches the active backend. Allowed even while another backend has a
    /// request outstanding.
    pub fn select(&self, id: &BackendId) -> Result<(), ChatError> {
        self.profile(id)?;
        *lock(&self.selected) = id.clone();
        info!("Selected backend {}", id);
        Ok(())
    }

    #[cfg(test)]
    pub fn is_sending(&self, id: &BackendId) -> bool {
        lock(&self.in_flight).contains(id)
    }

    /// Runs one turn: append the user message, ask the backend's model for a
    /// reply, append the reply.
    ///
    /// Model failures are reported through [`TurnOutcome::Failed`] and leave
    /// the user message in place.
    pub async fn submit_user_message(
        &self,
        id: &BackendId,
        text: &str,
    ) -> Result<TurnOutcome, ChatError> {
        self.profile(id)?;
        if text.trim().is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        let _sending = SendingGuard::acquire(&self.in_flight, id)?;

        self.store.append_user(id, text)?;
        let snapshot = self.store.get(id)?;

        let Some(gateway) = self.gateways.get(id) else {
            warn!("No model client for backend {}", id);
            return Ok(TurnOutcome::Failed(GatewayError::Unrouted(id.to_string())));
        };

        debug!(backend = %id, messages = snapshot.len(), "Sending turn");

        let result = match tokio::time::timeout(self.timeout, gateway.complete(snapshot.messages())).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.timeout)),
        };

        match result {
            Ok(reply) => {
                if self.store.append_assistant(id, reply.content())? {
                    info!(backend = %id, "Received reply");
                    Ok(TurnOutcome::Replied(reply))
                } else {
                    warn!(backend = %id, "Model returned an empty reply");
                    Ok(TurnOutcome::NoReply)
                }
            }
            Err(e) => {
                warn!(backend = %id, "Model call failed: {}", e);
                Ok(TurnOutcome::Failed(e))
            }
        }
    }

    /// Records the scenario picked for a backend and returns its first
    /// message, or `None` once that backend already has a user turn.
    pub fn choose_scenario(
        &self,
        id: &BackendId,
        scenario: &'static Scenario,
    ) -> Result<Option<&'static str>, ChatError> {
        if self.store.has_user_turn(id)? {
            return Ok(None);
        }
        lock(&self.scenarios).insert(id.clone(), scenario);
        Ok(Some(scenario.first_message))
    }

    /// The hint to show under the first reply, if this backend shows hints and
    /// a scenario with a hint was picked.
    pub fn hint_for(&self, id: &BackendId) -> Result<Option<&'static str>, ChatError> {
        if !self.profile(id)?.show_hints {
            return Ok(None);
        }
        let conversation = self.store.get(id)?;
        if conversation.len() != 3 || conversation.reply_count() != 1 {
            return Ok(None);
        }
        Ok(lock(&self.scenarios).get(id).and_then(|s| s.hint))
    }

    /// Text to display for a message, with the backend's reply prefix removed.
    pub fn display_content<'a>(&self, id: &BackendId, message: &'a Message) -> &'a str {
        let content = message.content();
        if message.role() != Role::Assistant {
            return content;
        }
        match self.profiles.get(id).and_then(|p| p.strip_prefix.as_deref()) {
            Some(prefix) => content.strip_prefix(prefix).unwrap_or(content),
            None => content,
        }
    }

    fn profile(&self, id: &BackendId) -> Result<&BackendProfile, ChatError> {
        self.profiles
            .get(id)
            .ok_or_else(|| ChatError::UnknownBackend(id.to_string()))
    }
}

/// Marks a backend as sending for as long as it lives.
struct SendingGuard<'a> {
    in_flight: &'a Mutex<HashSet<BackendId>>,
    id: BackendId,
}

impl<'a> SendingGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<BackendId>>, id: &BackendId) -> Result<Self, ChatError> {
        if !lock(in_flight).insert(id.clone()) {
            return Err(ChatError::Busy(id.to_string()));
        }
        Ok(Self {
            in_flight,
            id: id.clone(),
        })
    }
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.in_flight).remove(&self.id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
