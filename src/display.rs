//! Text status view for the connection state.

use crate::system::state::StateRegister;
use crate::types::ConnectionState;
use heapless::HistoryBuffer;
use log::debug;

const HISTORY_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct StatusView {
    current: ConnectionState,
    history: HistoryBuffer<ConnectionState, HISTORY_LEN>,
}

impl Default for StatusView {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusView {
    pub fn new() -> Self {
        Self {
            current: ConnectionState::Idle,
            history: HistoryBuffer::new(),
        }
    }

    pub fn current(&self) -> ConnectionState {
        self.current
    }

    pub fn update(&mut self, state: ConnectionState) {
        self.current = state;
        self.history.write(state);
    }

    /// Most recent transitions, oldest first.
    pub fn recent(&self) -> Vec<ConnectionState> {
        self.history.oldest_ordered().copied().collect()
    }

    pub fn render(&self) -> String {
        let trail = self
            .history
            .oldest_ordered()
            .map(|s| s.label())
            .collect::<Vec<_>>()
            .join(" -> ");
        if trail.is_empty() {
            self.current.label().to_string()
        } else {
            format!("{:<20}[{}]", self.current.label(), trail)
        }
    }

    /// Wait for the register to change and fold the new value in.
    pub async fn follow(&mut self, register: &StateRegister) -> ConnectionState {
        let state = register.next_change().await;
        debug!("Display picked up {:?}", state);
        self.update(state);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::state::StateSink;
    use embassy_futures::block_on;

    #[test]
    fn test_initial_render() {
        let view = StatusView::new();
        assert_eq!(view.render(), "Idle");
        assert!(view.recent().is_empty());
    }

    #[test]
    fn test_history_keeps_latest() {
        let mut view = StatusView::new();
        for _ in 0..5 {
            view.update(ConnectionState::Scanning);
            view.update(ConnectionState::Failure);
        }
        assert_eq!(view.recent().len(), HISTORY_LEN);
        assert_eq!(view.recent().last(), Some(&ConnectionState::Failure));
        assert!(view.render().starts_with("Exception occurred"));
    }

    #[test]
    fn test_render_trail() {
        let mut view = StatusView::new();
        view.update(ConnectionState::Scanning);
        view.update(ConnectionState::Connecting);
        assert!(view.render().ends_with("[Scanning... -> Connecting...]"));
    }

    #[test]
    fn test_follow_register() {
        let register = StateRegister::new();
        let mut view = StatusView::new();
        register.emit(ConnectionState::Reconnecting);
        register.emit(ConnectionState::Reconnected);
        assert_eq!(
            block_on(view.follow(&register)),
            ConnectionState::Reconnected
        );
        assert_eq!(view.current(), ConnectionState::Reconnected);
        assert_eq!(view.recent(), vec![ConnectionState::Reconnected]);
    }
}
