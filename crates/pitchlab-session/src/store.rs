//! In-memory registry of active practice sessions.

use pitchlab_types::{PersonaConfig, SessionSnapshot, TranscriptEntry, Turn, TurnRole};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// Instruction string used when a session id is unknown.
const FALLBACK_PERSONA_PROMPT: &str = "You are a professional buyer in a sales call.";

/// Mutable state of one session.
#[derive(Debug)]
struct SessionState {
    persona: PersonaConfig,
    turns: Vec<Turn>,
    transcript: Vec<TranscriptEntry>,
}

/// Registry of active sessions keyed by an opaque session id.
///
/// Each session sits behind its own mutex so operations on different
/// sessions never block each other; the outer map lock is held only for
/// brief get/insert/remove operations that never span `.await` points,
/// making synchronous locks safe here.
///
/// Unknown session ids are tolerated everywhere: appends become no-ops and
/// reads return empty results, so late or duplicate events after teardown
/// cannot crash the turn pipeline.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<SessionState>>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session with a freshly generated unique id and stores the
    /// persona verbatim. Returns the new session id.
    pub fn create(&self, persona: PersonaConfig) -> String {
        let session_id = Uuid::new_v4().to_string();
        let state = SessionState {
            persona,
            turns: Vec::new(),
            transcript: Vec::new(),
        };
        self.write_map()
            .insert(session_id.clone(), Arc::new(Mutex::new(state)));
        tracing::info!(session_id = %session_id, "created voice session");
        session_id
    }

    /// Appends one turn and its derived transcript entry.
    ///
    /// Both are written under the session's lock, so either both are
    /// visible or neither is. Unknown ids are a silent no-op.
    pub fn append_turn(&self, session_id: &str, role: TurnRole, message: &str) {
        let Some(entry) = self.entry(session_id) else {
            tracing::debug!(session_id = %session_id, "append_turn on unknown session ignored");
            return;
        };
        let mut state = lock_session(&entry);
        let sequence = state.transcript.len();
        state.turns.push(Turn {
            role,
            message: message.to_string(),
        });
        state.transcript.push(TranscriptEntry {
            speaker: role.into(),
            text: message.to_string(),
            sequence,
        });
    }

    /// Returns the ordered turn history, or empty for unknown ids.
    pub fn history(&self, session_id: &str) -> Vec<Turn> {
        match self.entry(session_id) {
            Some(entry) => lock_session(&entry).turns.clone(),
            None => Vec::new(),
        }
    }

    /// Returns the ordered public-facing transcript, or empty for unknown ids.
    pub fn transcript(&self, session_id: &str) -> Vec<TranscriptEntry> {
        match self.entry(session_id) {
            Some(entry) => lock_session(&entry).transcript.clone(),
            None => Vec::new(),
        }
    }

    /// Returns the session's persona configuration, if the session exists.
    pub fn persona(&self, session_id: &str) -> Option<PersonaConfig> {
        self.entry(session_id)
            .map(|entry| lock_session(&entry).persona.clone())
    }

    /// Renders the persona instruction string for a session.
    ///
    /// Deterministic template substitution over the stored persona; a
    /// generic buyer instruction is returned for unknown ids so the
    /// generation call can still proceed.
    pub fn persona_prompt(&self, session_id: &str) -> String {
        match self.persona(session_id) {
            Some(persona) => render_persona_prompt(&persona),
            None => FALLBACK_PERSONA_PROMPT.to_string(),
        }
    }

    /// Ends a session: returns its final state and removes it from the
    /// store. The id is permanently invalid afterwards; ending an unknown
    /// session yields an empty snapshot.
    pub fn end(&self, session_id: &str) -> SessionSnapshot {
        let removed = self.write_map().remove(session_id);
        match removed {
            Some(entry) => {
                let state = lock_session(&entry);
                tracing::info!(session_id = %session_id, turns = state.turns.len(), "ended voice session");
                SessionSnapshot {
                    persona: Some(state.persona.clone()),
                    turns: state.turns.clone(),
                    transcript: state.transcript.clone(),
                }
            }
            None => SessionSnapshot::default(),
        }
    }

    /// Number of currently active sessions.
    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, session_id: &str) -> Option<Arc<Mutex<SessionState>>> {
        self.read_map().get(session_id).cloned()
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Mutex<SessionState>>>> {
        match self.sessions.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("session map lock poisoned, recovering with stale state");
                poisoned.into_inner()
            }
        }
    }

    fn write_map(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Mutex<SessionState>>>> {
        match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("session map lock poisoned, recovering with stale state");
                poisoned.into_inner()
            }
        }
    }
}

fn lock_session(entry: &Arc<Mutex<SessionState>>) -> std::sync::MutexGuard<'_, SessionState> {
    match entry.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!("session lock poisoned, recovering with stale state");
            poisoned.into_inner()
        }
    }
}

fn render_persona_prompt(persona: &PersonaConfig) -> String {
    let mut prompt = format!(
        "You are {}, {} at {}.\n\nPersonality: {}\nBackground: {}\n",
        persona.name, persona.role, persona.company, persona.difficulty, persona.background
    );
    if !persona.company_info.is_empty() {
        prompt.push_str(&format!("Company context: {}\n", persona.company_info));
    }
    if !persona.personality.is_empty() {
        prompt.push_str(&format!("Personality notes: {}\n", persona.personality));
    }
    prompt.push_str(
        "\nInstructions:\n\
         - Keep responses short (1-2 sentences max in a live call)\n\
         - Ask probing questions about the product\n\
         - Raise realistic objections based on your role\n\
         - Stay in character\n\
         - Be natural and conversational",
    );
    prompt
}
