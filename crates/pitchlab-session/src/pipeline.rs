//! The per-turn orchestration pipeline.
//!
//! One inbound utterance becomes, in order: a transcript event for the
//! trainee's text, a persona-conditioned reply from the generation backend,
//! a transcript event for that reply, and (when synthesis yields audio) an
//! audio event. Failures degrade instead of ending the session: a failed
//! generation becomes a fixed clarification phrase, failed or empty
//! synthesis skips only the audio event.

use crate::events::{EventSink, OutboundEvent};
use crate::store::SessionStore;
use base64::Engine;
use pitchlab_llm::{ChatMessage, ChatRequest, GenerationBackend};
use pitchlab_types::{Speaker, TurnRole};
use pitchlab_voice::SpeechBackend;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Maximum number of prior turns included in the generation input. Older
/// turns are dropped, not summarized; bounded prompts keep reply latency
/// conversational.
const HISTORY_WINDOW_TURNS: usize = 5;

/// Reply substituted when the generation backend fails, so the conversation
/// can continue.
const FALLBACK_REPLY: &str = "I'm sorry, could you repeat that?";

/// Sampling temperature for conversational replies.
const CONVERSATION_TEMPERATURE: f32 = 0.7;

/// Token cap keeping replies short enough for a live call.
const CONVERSATION_MAX_TOKENS: u32 = 150;

/// Drives one session's turn-taking against the generation and speech
/// backends, emitting ordered events through the injected sink.
///
/// Turns are serialized per session: a second utterance (or an end request)
/// for the same session waits until the in-flight turn finishes. Different
/// sessions proceed fully concurrently.
pub struct TurnPipeline {
    store: SessionStore,
    generation: Arc<dyn GenerationBackend>,
    speech: Arc<dyn SpeechBackend>,
    sink: Arc<dyn EventSink>,
    turn_guards: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TurnPipeline {
    pub fn new(
        store: SessionStore,
        generation: Arc<dyn GenerationBackend>,
        speech: Arc<dyn SpeechBackend>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            generation,
            speech,
            sink,
            turn_guards: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Processes one transcribed utterance for a session.
    ///
    /// Blank text or a blank session id is dropped silently; malformed
    /// client events must not disturb a session.
    pub async fn handle_utterance(&self, session_id: &str, text: &str) {
        let text = text.trim();
        if session_id.is_empty() || text.is_empty() {
            tracing::debug!("dropping utterance event with missing session id or text");
            return;
        }

        let guard = self.turn_guard(session_id);
        let _turn = guard.lock().await;

        // Snapshot history before appending so the context window holds
        // prior turns only; the new utterance is passed separately.
        let history = self.store.history(session_id);

        self.store.append_turn(session_id, TurnRole::User, text);
        self.sink
            .emit(
                session_id,
                OutboundEvent::TranscriptUpdate {
                    speaker: Speaker::User,
                    text: text.to_string(),
                },
            )
            .await;

        let persona_prompt = self.store.persona_prompt(session_id);
        let mut messages = Vec::with_capacity(HISTORY_WINDOW_TURNS + 2);
        messages.push(ChatMessage::system(persona_prompt));
        let window_start = history.len().saturating_sub(HISTORY_WINDOW_TURNS);
        for turn in &history[window_start..] {
            messages.push(match turn.role {
                TurnRole::User => ChatMessage::user(turn.message.clone()),
                TurnRole::Assistant => ChatMessage::assistant(turn.message.clone()),
            });
        }
        messages.push(ChatMessage::user(text));

        let request = ChatRequest::new(messages)
            .with_temperature(CONVERSATION_TEMPERATURE)
            .with_max_tokens(CONVERSATION_MAX_TOKENS);

        let reply = match self.generation.generate(request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(session_id = %session_id, "generation failed, using fallback reply: {}", e);
                FALLBACK_REPLY.to_string()
            }
        };

        self.store
            .append_turn(session_id, TurnRole::Assistant, &reply);
        self.sink
            .emit(
                session_id,
                OutboundEvent::TranscriptUpdate {
                    speaker: Speaker::Ai,
                    text: reply.clone(),
                },
            )
            .await;

        match self.speech.synthesize(&reply).await {
            Ok(audio) if !audio.is_empty() => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&audio);
                self.sink
                    .emit(
                        session_id,
                        OutboundEvent::AiAudio {
                            audio: encoded,
                            text: reply,
                        },
                    )
                    .await;
            }
            Ok(_) => {
                tracing::warn!(session_id = %session_id, "synthesis returned no audio, skipping audio event");
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, "synthesis failed, skipping audio event: {}", e);
            }
        }
    }

    /// Ends a session: emits the final transcript and removes all
    /// session-scoped state. An end request arriving while a turn is in
    /// flight runs after that turn completes. Ending an unknown or
    /// already-ended session emits an empty transcript.
    pub async fn end_session(&self, session_id: &str) {
        if session_id.is_empty() {
            tracing::debug!("dropping end event with missing session id");
            return;
        }

        let guard = self.turn_guard(session_id);
        let _turn = guard.lock().await;

        let snapshot = self.store.end(session_id);
        self.sink
            .emit(
                session_id,
                OutboundEvent::SessionEnded {
                    transcript: snapshot.transcript,
                },
            )
            .await;

        self.remove_turn_guard(session_id);
    }

    fn turn_guard(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut guards = match self.turn_guards.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("turn guard lock poisoned, recovering with stale state");
                poisoned.into_inner()
            }
        };
        guards
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn remove_turn_guard(&self, session_id: &str) {
        let mut guards = match self.turn_guards.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("turn guard lock poisoned, recovering with stale state");
                poisoned.into_inner()
            }
        };
        guards.remove(session_id);
    }
}
