#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use checkers_link::adapter::{GameFrontend, Session};
use checkers_link::types::{Move, SessionState};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Move(Move),
    EndOfTurn(Option<String>),
    Invitation(Option<String>, String),
    GameOver(Option<String>),
    Error(String),
    Finished,
}

/// Frontend that records every callback.
#[derive(Default)]
pub struct RecordingFrontend {
    events: Mutex<Vec<Event>>,
    taunt: Mutex<Option<String>>,
}

impl RecordingFrontend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn set_taunt(&self, taunt: &str) {
        *self.taunt.lock() = Some(taunt.to_string());
    }

    pub fn saw_game_over(&self) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, Event::GameOver(_)))
    }
}

impl GameFrontend for RecordingFrontend {
    fn apply_remote_move(&self, mv: Move) {
        self.events.lock().push(Event::Move(mv));
    }

    fn apply_end_of_remote_turn(&self, taunt: Option<&str>) {
        self.events.lock().push(Event::EndOfTurn(taunt.map(String::from)));
    }

    fn invitation_received(&self, taunt: Option<&str>, peer: &str) {
        self.events
            .lock()
            .push(Event::Invitation(taunt.map(String::from), peer.to_string()));
    }

    fn game_over(&self, taunt: Option<&str>) {
        self.events.lock().push(Event::GameOver(taunt.map(String::from)));
    }

    fn transport_error(&self, message: &str) {
        self.events.lock().push(Event::Error(message.to_string()));
    }

    fn take_outgoing_taunt(&self) -> Option<String> {
        self.taunt.lock().take()
    }

    fn session_finished(&self) {
        self.events.lock().push(Event::Finished);
    }
}

pub fn mv(sx: i8, sy: i8, dx: i8, dy: i8) -> Move {
    Move::new(sx, sy, dx, dy).expect("valid move")
}

pub async fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timeout waiting for {what}"));
}

pub async fn wait_for_state(session: &Session, state: SessionState) {
    let what = format!("state {state}");
    wait_until(&what, || session.state() == state).await;
}

pub async fn wait_finished(session: &Session) {
    tokio::time::timeout(Duration::from_secs(2), session.wait_finished())
        .await
        .expect("timeout waiting for session to finish");
}
