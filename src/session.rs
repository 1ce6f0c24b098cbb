use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::catalog::{self, GENERAL_WET_LAB};
use crate::protocol::ProtocolBuffer;
use crate::store::{Preset, StoreError, TemplateStore};

/// Where a resolved instruction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionSource {
    Preset,
    Template,
    Current,
    Default,
}

/// Which saved items the user has picked, if any
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstructionSelection {
    pub protocol_type: Option<String>,
    pub template: Option<String>,
    pub preset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedInstruction {
    pub protocol_type: String,
    pub instruction: String,
    pub source: InstructionSource,
}

/// All state of one interactive session. Dropped when the session ends.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub store: TemplateStore,
    pub protocol: ProtocolBuffer,
    pub protocol_type: String,
    pub current_instruction: Option<String>,
    pub last_result: Option<String>,
    /// Last time any request read or changed this session
    pub last_touched: Instant,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            store: TemplateStore::default(),
            protocol: ProtocolBuffer::default(),
            protocol_type: GENERAL_WET_LAB.to_string(),
            current_instruction: None,
            last_result: None,
            last_touched: Instant::now(),
        }
    }

    /// Pick the base instruction: a loaded preset wins (and switches the
    /// protocol type), then a loaded template, then the session's current
    /// instruction, then the default for the protocol type.
    pub fn resolve_instruction(&self, selection: &InstructionSelection) -> ResolvedInstruction {
        let protocol_type = selection
            .protocol_type
            .clone()
            .unwrap_or_else(|| self.protocol_type.clone());

        if let Some(preset) = selection.preset.as_deref().and_then(|n| self.store.presets.load(n)) {
            return ResolvedInstruction {
                protocol_type: preset.protocol_type,
                instruction: preset.instruction,
                source: InstructionSource::Preset,
            };
        }

        if let Some(template) = selection.template.as_deref().and_then(|n| self.store.templates.load(n)) {
            return ResolvedInstruction {
                protocol_type,
                instruction: template,
                source: InstructionSource::Template,
            };
        }

        match &self.current_instruction {
            Some(current) => ResolvedInstruction {
                protocol_type,
                instruction: current.clone(),
                source: InstructionSource::Current,
            },
            None => ResolvedInstruction {
                instruction: catalog::default_instruction(&protocol_type).to_string(),
                protocol_type,
                source: InstructionSource::Default,
            },
        }
    }

    pub fn select_protocol_type(&mut self, protocol_type: &str) {
        self.protocol_type = protocol_type.to_string();
    }

    /// Make the default instruction for `protocol_type` the current one
    pub fn reset_instruction(&mut self, protocol_type: &str) -> &str {
        self.select_protocol_type(protocol_type);
        self.current_instruction
            .insert(catalog::default_instruction(protocol_type).to_string())
    }

    /// Save a template; it also becomes the current instruction
    pub fn save_template(&mut self, name: &str, instruction: &str) -> Result<String, StoreError> {
        let saved = self.store.templates.save(name, instruction.to_string())?;
        self.current_instruction = Some(instruction.to_string());
        Ok(saved)
    }

    /// Save the selected protocol type together with `instruction`
    pub fn save_preset(&mut self, name: &str, instruction: &str) -> Result<String, StoreError> {
        self.store.presets.save(
            name,
            Preset {
                protocol_type: self.protocol_type.clone(),
                instruction: instruction.to_string(),
            },
        )
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionRegistry {
    pub async fn create(&self) -> Uuid {
        let session = Session::new();
        let id = session.id;
        let mut guard = self.inner.write().await;
        guard.insert(id, session);
        id
    }

    /// End a session and discard everything it held
    pub async fn remove(&self, id: &Uuid) -> bool {
        let mut guard = self.inner.write().await;
        guard.remove(id).is_some()
    }

    /// Reads count as activity, so this also takes the write lock
    pub async fn read<R>(&self, id: &Uuid, f: impl FnOnce(&Session) -> R) -> Option<R> {
        let mut guard = self.inner.write().await;
        guard.get_mut(id).map(|session| {
            session.last_touched = Instant::now();
            f(session)
        })
    }

    pub async fn update<R>(&self, id: &Uuid, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut guard = self.inner.write().await;
        guard.get_mut(id).map(|session| {
            session.last_touched = Instant::now();
            f(session)
        })
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Drop sessions untouched for at least `max_idle`; returns how many went
    pub async fn expire_idle(&self, max_idle: Duration) -> usize {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|_, session| session.last_touched.elapsed() < max_idle);
        before - guard.len()
    }

    /// Sweep idle sessions in the background every `max_idle / 4`
    pub fn spawn_expiry(&self, max_idle: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        let period = (max_idle / 4).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let expired = registry.expire_idle(max_idle).await;
                if expired > 0 {
                    info!(expired, idle_secs = max_idle.as_secs(), "Expired idle sessions");
                }
            }
        })
    }
}
