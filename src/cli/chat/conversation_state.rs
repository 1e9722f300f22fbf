use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::config::BackendId;
use crate::error::ChatError;
use crate::gateway::{Message, Role};

/// Ordered, append-only history for one backend.
///
/// Always non-empty: the first message is the system message it was created
/// with, and only user or assistant messages can follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_message: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_message)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn system_message(&self) -> &str {
        self.messages[0].content()
    }

    pub fn has_user_turn(&self) -> bool {
        self.messages.len() > 1
    }

    /// Number of assistant replies so far.
    pub fn reply_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role() == Role::Assistant)
            .count()
    }

    fn push(&mut self, message: Message) {
        debug_assert_ne!(message.role(), Role::System);
        self.messages.push(message);
    }
}

/// One conversation per configured backend. The key set is fixed at
/// construction.
pub struct ConversationStore {
    conversations: BTreeMap<BackendId, Mutex<Conversation>>,
}

impl ConversationStore {
    pub fn new<I, S>(seeds: I) -> Self
    where
        I: IntoIterator<Item = (BackendId, S)>,
        S: Into<String>,
    {
        let conversations = seeds
            .into_iter()
            .map(|(id, system)| (id, Mutex::new(Conversation::new(system))))
            .collect();
        Self { conversations }
    }

    pub fn contains(&self, id: &BackendId) -> bool {
        self.conversations.contains_key(id)
    }

    /// Snapshot of the backend's conversation.
    pub fn get(&self, id: &BackendId) -> Result<Conversation, ChatError> {
        Ok(self.lock(id)?.clone())
    }

    /// Appends a user message. Blank text is dropped and `false` returned.
    pub fn append_user(&self, id: &BackendId, text: &str) -> Result<bool, ChatError> {
        let mut conversation = self.lock(id)?;
        if text.trim().is_empty() {
            return Ok(false);
        }
        conversation.push(Message::user(text));
        Ok(true)
    }

    /// Appends an assistant message. Empty content is dropped and `false`
    /// returned.
    pub fn append_assistant(&self, id: &BackendId, text: &str) -> Result<bool, ChatError> {
        let mut conversation = self.lock(id)?;
        if text.is_empty() {
            return Ok(false);
        }
        conversation.push(Message::assistant(text));
        Ok(true)
    }

    pub fn has_user_turn(&self, id: &BackendId) -> Result<bool, ChatError> {
        Ok(self.lock(id)?.has_user_turn())
    }

    fn lock(&self, id: &BackendId) -> Result<MutexGuard<'_, Conversation>, ChatError> {
        let slot = self
            .conversations
            .get(id)
            .ok_or_else(|| ChatError::UnknownBackend(id.to_string()))?;
        // A poisoned lock still holds a valid conversation: pushes are the
        // only mutation and cannot leave it half-written.
        Ok(slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}
