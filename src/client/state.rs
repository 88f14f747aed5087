use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{Role, SessionWithTurns, Turn};

/// One entry of the displayed transcript. Confirmed turns carry the store id;
/// provisional turns exist only in this process and carry a local counter id.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayTurn {
    Confirmed {
        id: i64,
        text: String,
        is_user: bool,
        timestamp: DateTime<Utc>,
    },
    Provisional {
        local_id: u64,
        text: String,
        is_user: bool,
        timestamp: DateTime<Utc>,
    },
}

impl DisplayTurn {
    pub fn text(&self) -> &str {
        match self {
            DisplayTurn::Confirmed { text, .. } => text,
            DisplayTurn::Provisional { text, .. } => text,
        }
    }

    pub fn is_user(&self) -> bool {
        match self {
            DisplayTurn::Confirmed { is_user, .. } => *is_user,
            DisplayTurn::Provisional { is_user, .. } => *is_user,
        }
    }

    pub fn is_provisional(&self) -> bool {
        matches!(self, DisplayTurn::Provisional { .. })
    }

    fn from_turn(turn: &Turn) -> Self {
        DisplayTurn::Confirmed {
            id: turn.id,
            text: turn.content.clone(),
            is_user: turn.role == Role::User,
            timestamp: turn.created_at,
        }
    }
}

/// The transcript shown for whichever session is current. Absorbs network
/// latency with provisional entries; confirmed data always supersedes them.
#[derive(Debug, Default)]
pub struct ClientSessionState {
    current: Option<Uuid>,
    turns: Vec<DisplayTurn>,
    next_local_id: u64,
    last_error: Option<String>,
}

impl ClientSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_session(&self) -> Option<Uuid> {
        self.current
    }

    pub fn turns(&self) -> &[DisplayTurn] {
        &self.turns
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.last_error = error;
    }

    pub fn has_provisional(&self) -> bool {
        self.turns.iter().any(|t| t.is_provisional())
    }

    /// Replace the current session pointer. Switching sessions rebuilds the
    /// transcript from the canonical turns; re-selecting the same session is
    /// treated as a canonical refresh and goes through `reconcile`.
    pub fn select_session(&mut self, session: Option<&SessionWithTurns>) {
        match session {
            None => {
                self.current = None;
                self.turns.clear();
            }
            Some(s) => {
                if self.current == Some(s.session.id) {
                    self.reconcile(s.session.id, &s.turns);
                } else {
                    self.current = Some(s.session.id);
                    self.turns = s.turns.iter().map(DisplayTurn::from_turn).collect();
                }
            }
        }
    }

    /// Append a not-yet-confirmed turn and return its local id.
    pub fn push_provisional(&mut self, text: &str, is_user: bool) -> u64 {
        let local_id = self.next_local_id;
        self.next_local_id += 1;
        self.turns.push(DisplayTurn::Provisional {
            local_id,
            text: text.to_string(),
            is_user,
            timestamp: Utc::now(),
        });
        local_id
    }

    /// Absorb canonical turns for a session.
    ///
    /// Provisional entries present and canonical non-empty: canonical replaces
    /// the transcript wholesale. No provisional entries: plain refresh.
    /// Provisional entries present but canonical empty: keep the provisional
    /// entries, so a refresh racing the first exchange cannot blank the view.
    /// A result for a session that is no longer current is discarded.
    pub fn reconcile(&mut self, session_id: Uuid, canonical: &[Turn]) {
        if self.current != Some(session_id) {
            return;
        }

        if self.has_provisional() && canonical.is_empty() {
            return;
        }

        self.turns = canonical.iter().map(DisplayTurn::from_turn).collect();
    }

    /// Rollback of the display after a failed exchange: every provisional
    /// entry is removed, confirmed entries stay.
    pub fn purge_provisional(&mut self) {
        self.turns.retain(|t| !t.is_provisional());
    }
}
