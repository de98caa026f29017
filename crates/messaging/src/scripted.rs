//! Provider that replays canned statuses. For tests and local dry runs.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    Error, Result,
    provider::{MessageStatus, MessagingProvider, SubmittedMessage},
};

/// A message recorded by [`ScriptedProvider::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    pub id: String,
    pub to: String,
    pub from: String,
    pub body: String,
}

#[derive(Default)]
struct State {
    /// Scripts consumed by successive submits, in order.
    pending: VecDeque<Vec<MessageStatus>>,
    /// Remaining fetch responses per message id.
    live: HashMap<String, VecDeque<MessageStatus>>,
    submitted: Vec<RecordedMessage>,
    fetches: usize,
}

/// Replays a status script per submitted message.
///
/// A script is the sequence of statuses one message goes through: the first
/// entry is returned by `submit`, the rest by successive `fetch` calls. The
/// last entry repeats once the script runs out. Messages without an explicit
/// script use the default script.
pub struct ScriptedProvider {
    default_script: Vec<MessageStatus>,
    fail_submit_at: Option<usize>,
    state: Mutex<State>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::delivering()
    }
}

impl ScriptedProvider {
    /// Every message goes `queued` then `delivered`.
    #[must_use]
    pub fn delivering() -> Self {
        Self::with_default_script(vec![MessageStatus::Queued, MessageStatus::Delivered])
    }

    #[must_use]
    pub fn with_default_script(script: Vec<MessageStatus>) -> Self {
        Self {
            default_script: script,
            fail_submit_at: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Use `script` for the next submitted message without its own script.
    #[must_use]
    pub fn then(self, script: Vec<MessageStatus>) -> Self {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pending
            .push_back(script);
        self
    }

    /// Make the `n`th submit (1-based) fail with a transport-style error.
    #[must_use]
    pub fn failing_submit_at(mut self, n: usize) -> Self {
        self.fail_submit_at = Some(n);
        self
    }

    pub fn submitted(&self) -> Vec<RecordedMessage> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .submitted
            .clone()
    }

    pub fn submit_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .submitted
            .len()
    }

    pub fn fetch_count(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).fetches
    }
}

#[async_trait]
impl MessagingProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn submit(&self, to: &str, from: &str, body: &str) -> Result<SubmittedMessage> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let attempt = state.submitted.len() + 1;
        let id = format!("SM{attempt:04}");
        state.submitted.push(RecordedMessage {
            id: id.clone(),
            to: to.to_string(),
            from: from.to_string(),
            body: body.to_string(),
        });
        if self.fail_submit_at == Some(attempt) {
            return Err(Error::message(format!("scripted submit failure #{attempt}")));
        }

        let mut script: VecDeque<MessageStatus> = state
            .pending
            .pop_front()
            .unwrap_or_else(|| self.default_script.clone())
            .into();
        let initial = script.pop_front().unwrap_or(MessageStatus::Queued);
        if script.is_empty() {
            script.push_back(initial.clone());
        }
        state.live.insert(id.clone(), script);

        Ok(SubmittedMessage {
            id,
            status: initial,
        })
    }

    async fn fetch(&self, id: &str) -> Result<MessageStatus> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.fetches += 1;
        let script = state
            .live
            .get_mut(id)
            .ok_or_else(|| Error::message(format!("unknown message id: {id}")))?;
        let status = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        status.ok_or_else(|| Error::message(format!("empty script for {id}")))
    }
}
