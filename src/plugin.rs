//! bevy front-end integration for the engine.
//!
//! - each session entity owns its `Transcript` and selected `LanguageMode`.
//! - requests run on a tiny tokio runtime so the main thread never blocks.
//! - results come back through a bounded inbox drained in `Update`; only settled
//!   turns are appended, so a ui never sees a partial turn.
//! - one request in flight per session. a newer `ChatRequest` waits (and
//!   replaces an older waiting one) until the current turn settles.

use std::sync::Arc;

use bevy::prelude::*;
use flume::{Receiver, Sender, TryRecvError};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::mode::LanguageMode;
use crate::transcript::{is_blank, Transcript, Turn};

/// the engine shared by every session. insert before running the app.
#[derive(Resource, Clone)]
pub struct EngineRes(pub Engine);

/// tokio runtime driving the network futures.
#[derive(Resource, Clone)]
pub struct TokioRt(pub Arc<tokio::runtime::Runtime>);

impl Default for TokioRt {
    fn default() -> Self {
        info!(target: "dualbot", "DualbotPlugin: initializing Tokio multi-thread runtime");
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("tokio runtime");
        Self(Arc::new(rt))
    }
}

/// system ordering so uis can run after we emit events
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum DualbotSet {
    /// settled turns are appended and Chat* events emitted here (in `Update`)
    Drain,
}

/// one chat session (one transcript) per entity.
#[derive(Component, Clone, Debug, Default)]
pub struct ChatSession {
    pub transcript: Transcript,
    pub mode: LanguageMode,
    awaiting: bool,
    epoch: u64,
}

impl ChatSession {
    pub fn new(mode: LanguageMode) -> Self {
        Self { mode, ..default() }
    }

    /// true between request issuance and the turn settling.
    pub fn is_awaiting(&self) -> bool {
        self.awaiting
    }
}

/// pending utterance for the session entity.
#[derive(Component, Clone, Debug)]
pub struct ChatRequest {
    pub utterance: String,
}

/// marker: reset the session's transcript.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct ClearTranscript;

/// enqueue user text on a session entity. blank input is dropped (returns false).
pub fn send_user_text(commands: &mut Commands, target: Entity, text: impl Into<String>) -> bool {
    let utterance = text.into();
    if is_blank(&utterance) {
        debug!(target: "dualbot", "send_user_text: ignoring blank input");
        return false;
    }
    info!(target: "dualbot", "send_user_text -> '{}' (len={})", utterance, utterance.len());
    commands.entity(target).insert(ChatRequest { utterance });
    true
}

pub fn clear_transcript(commands: &mut Commands, target: Entity) {
    commands.entity(target).insert(ClearTranscript);
}

#[derive(Event, Debug)]
pub struct ChatStarted {
    pub entity: Entity,
}
/// a turn was appended (answers and surfaced errors alike).
#[derive(Event, Debug)]
pub struct ChatCompletedEvt {
    pub entity: Entity,
    pub turn: Turn,
}
/// the appended turn is a surfaced failure; `error` is the raw message.
#[derive(Event, Debug)]
pub struct ChatErrorEvt {
    pub entity: Entity,
    pub error: String,
}
#[derive(Event, Debug)]
pub struct TranscriptCleared {
    pub entity: Entity,
}

/// cross-thread inbox; workers send, main thread drains.
#[derive(Resource, Clone)]
struct Inbox {
    tx: Sender<Settled>,
    rx: Receiver<Settled>,
}

impl Default for Inbox {
    fn default() -> Self {
        let (tx, rx) = flume::bounded(256);
        Self { tx, rx }
    }
}

#[derive(Debug)]
struct Settled {
    entity: Entity,
    epoch: u64,
    utterance: String,
    outcome: Result<String, EngineError>,
}

/// bevy plugin: wires systems, events, resources.
/// requires an `EngineRes` resource; inserts a `TokioRt` if none is present.
pub struct DualbotPlugin;

impl Plugin for DualbotPlugin {
    fn build(&self, app: &mut App) {
        info!(target: "dualbot", "DualbotPlugin: build()");
        app.init_resource::<Inbox>()
            .add_event::<ChatStarted>()
            .add_event::<ChatCompletedEvt>()
            .add_event::<ChatErrorEvt>()
            .add_event::<TranscriptCleared>()
            .configure_sets(Update, DualbotSet::Drain)
            .add_systems(Update, drain_inbox.in_set(DualbotSet::Drain))
            .add_systems(Update, (apply_clear_requests, spawn_chat_requests).chain());

        if app.world().get_resource::<TokioRt>().is_none() {
            app.insert_resource(TokioRt::default());
        }
    }
}

fn apply_clear_requests(
    mut commands: Commands,
    mut q: Query<(Entity, &mut ChatSession), With<ClearTranscript>>,
    mut ev_cleared: EventWriter<TranscriptCleared>,
) {
    for (e, mut session) in q.iter_mut() {
        info!(target: "dualbot", "clear transcript: entity={:?} turns={}", e, session.transcript.len());
        session.transcript.clear();
        // a turn still in flight belongs to the old transcript
        session.epoch += 1;
        session.awaiting = false;
        commands.entity(e).remove::<ClearTranscript>();
        ev_cleared.write(TranscriptCleared { entity: e });
    }
}

fn spawn_chat_requests(
    mut commands: Commands,
    engine: Res<EngineRes>,
    inbox: Res<Inbox>,
    rt: Res<TokioRt>,
    mut q: Query<(Entity, &mut ChatSession, &ChatRequest)>,
    mut ev_start: EventWriter<ChatStarted>,
) {
    for (e, mut session, req) in q.iter_mut() {
        if session.awaiting {
            continue;
        }

        let engine = engine.0.clone();
        let tx = inbox.tx.clone();
        let history = session.transcript.clone();
        let utterance = req.utterance.clone();
        let mode = session.mode;
        let epoch = session.epoch;
        info!(target: "dualbot",
            "spawn_chat_requests: entity={:?} mode={} history_turns={}",
            e, mode, history.len()
        );

        session.awaiting = true;
        commands.entity(e).remove::<ChatRequest>();
        ev_start.write(ChatStarted { entity: e });

        rt.0.spawn(async move {
            let outcome = engine.complete(&history, &utterance, mode).await;
            let settled = Settled { entity: e, epoch, utterance, outcome };
            if tx.send_async(settled).await.is_err() {
                warn!(target: "dualbot", "inbox closed; dropping settled turn for {:?}", e);
            }
        });
    }
}

fn drain_inbox(
    inbox: Res<Inbox>,
    mut q: Query<&mut ChatSession>,
    mut ev_done: EventWriter<ChatCompletedEvt>,
    mut ev_err: EventWriter<ChatErrorEvt>,
) {
    // cap per frame so a burst can't stall a frame
    const MAX_PER_FRAME: usize = 64;
    for _ in 0..MAX_PER_FRAME {
        let Settled { entity, epoch, utterance, outcome } = match inbox.rx.try_recv() {
            Ok(m) => m,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        };

        let Ok(mut session) = q.get_mut(entity) else {
            debug!(target: "dualbot", "settled turn for missing session {:?}", entity);
            continue;
        };
        if session.epoch != epoch {
            debug!(target: "dualbot", "dropping settled turn from before a clear ({:?})", entity);
            continue;
        }

        if let Err(err) = &outcome {
            error!(target: "dualbot", "chat error (entity={:?}): {}", entity, err);
            ev_err.write(ChatErrorEvt { entity, error: err.to_string() });
        }
        let turn = Turn::settled(utterance, outcome);
        session.transcript.push(turn.clone());
        session.awaiting = false;
        ev_done.write(ChatCompletedEvt { entity, turn });
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::config::Config;
    use crate::engine::tests::ScriptedBackend;

    fn app_with(backend: ScriptedBackend) -> App {
        app_sharing(Arc::new(backend))
    }

    fn app_sharing(backend: Arc<ScriptedBackend>) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        let engine = Engine::new(Config::new("gsk-test").unwrap(), backend);
        app.insert_resource(EngineRes(engine));
        app.add_plugins(DualbotPlugin);
        app
    }

    fn drain<E: Event>(app: &mut App) -> Vec<E> {
        app.world_mut().resource_mut::<Events<E>>().drain().collect()
    }

    #[test]
    fn blank_text_is_not_enqueued() {
        let mut app = app_with(ScriptedBackend::replying(&["x"]));
        let e = app.world_mut().spawn(ChatSession::default()).id();

        let sent = {
            let mut commands = app.world_mut().commands();
            send_user_text(&mut commands, e, "   ")
        };
        app.world_mut().flush();

        assert!(!sent);
        assert!(app.world().entity(e).get::<ChatRequest>().is_none());
    }

    #[test]
    fn request_settles_into_transcript() {
        let mut app = app_with(ScriptedBackend::replying(&["Hel", "lo", ""]));
        let e = app.world_mut().spawn(ChatSession::new(LanguageMode::EnglishOnly)).id();
        {
            let mut commands = app.world_mut().commands();
            assert!(send_user_text(&mut commands, e, "Say hello"));
        }
        app.world_mut().flush();

        app.update();
        assert_eq!(drain::<ChatStarted>(&mut app).len(), 1);
        assert!(app.world().entity(e).get::<ChatRequest>().is_none());

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut done = Vec::new();
        while done.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            app.update();
            done = drain::<ChatCompletedEvt>(&mut app);
        }

        assert_eq!(done.len(), 1);
        assert_eq!(done[0].turn, Turn::new("Say hello", "Hello"));
        let session = app.world().entity(e).get::<ChatSession>().unwrap();
        assert_eq!(session.transcript.turns(), &[Turn::new("Say hello", "Hello")]);
        assert!(!session.is_awaiting());
    }

    #[test]
    fn drain_appends_error_turns_and_emits_events() {
        let mut app = app_with(ScriptedBackend::replying(&[]));
        let e = app.world_mut().spawn(ChatSession::default()).id();

        {
            let tx = app.world().resource::<Inbox>().tx.clone();
            tx.send(Settled {
                entity: e,
                epoch: 0,
                utterance: "hi".into(),
                outcome: Err(EngineError::backend("Invalid API Key")),
            })
            .unwrap();
        }
        app.update();

        let errs = drain::<ChatErrorEvt>(&mut app);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].error, "Invalid API Key");

        let done = drain::<ChatCompletedEvt>(&mut app);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].turn.assistant_text(), "Error: Invalid API Key");

        let session = app.world().entity(e).get::<ChatSession>().unwrap();
        assert_eq!(session.transcript.len(), 1);
    }

    #[test]
    fn clear_resets_and_discards_stale_turns() {
        let mut app = app_with(ScriptedBackend::replying(&[]));
        let mut session = ChatSession::default();
        session.transcript.push(Turn::new("a", "b"));
        let e = app.world_mut().spawn(session).id();
        {
            let mut commands = app.world_mut().commands();
            clear_transcript(&mut commands, e);
        }
        app.world_mut().flush();
        app.update();
        assert_eq!(drain::<TranscriptCleared>(&mut app).len(), 1);

        // a turn issued before the clear arrives late
        {
            let tx = app.world().resource::<Inbox>().tx.clone();
            tx.send(Settled { entity: e, epoch: 0, utterance: "old".into(), outcome: Ok("late".into()) })
                .unwrap();
        }
        app.update();

        assert!(drain::<ChatCompletedEvt>(&mut app).is_empty());
        let session = app.world().entity(e).get::<ChatSession>().unwrap();
        assert!(session.transcript.is_empty());
        assert!(app.world().entity(e).get::<ClearTranscript>().is_none());
    }

    #[test]
    fn in_flight_session_holds_back_and_keeps_latest_request() {
        let backend = Arc::new(ScriptedBackend::replying(&["Sawa"]));
        let mut app = app_sharing(backend.clone());

        let mut session = ChatSession::default();
        session.awaiting = true;
        let e = app.world_mut().spawn(session).id();
        app.world_mut().entity_mut(e).insert(ChatRequest { utterance: "first".into() });
        app.world_mut().entity_mut(e).insert(ChatRequest { utterance: "second".into() });

        app.update();
        app.update();
        assert!(drain::<ChatStarted>(&mut app).is_empty());
        assert!(backend.seen.lock().unwrap().is_empty());
        assert_eq!(app.world().entity(e).get::<ChatRequest>().unwrap().utterance, "second");

        // the turn in flight settles
        {
            let tx = app.world().resource::<Inbox>().tx.clone();
            tx.send(Settled { entity: e, epoch: 0, utterance: "earlier".into(), outcome: Ok("ok".into()) })
                .unwrap();
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut started = Vec::new();
        while started.is_empty() && Instant::now() < deadline {
            app.update();
            started.extend(drain::<ChatStarted>(&mut app));
        }
        assert_eq!(started.len(), 1);
        assert!(app.world().entity(e).get::<ChatRequest>().is_none());

        while backend.seen.lock().unwrap().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let last = seen[0].messages.last().unwrap();
        assert_eq!(last.content, "second");
        assert!(seen[0].messages.iter().all(|m| m.content != "first"));
    }
}
