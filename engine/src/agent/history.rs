//! Bounded conversation history
//!
//! Keeps the most recent turns in memory for prompt building. Older turns
//! are dropped first; they survive only in the memory store.

use std::collections::VecDeque;

use crate::llm::ConversationTurn;

/// Default capacity: five user/assistant exchanges
pub const DEFAULT_HISTORY_TURNS: usize = 10;

#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_TURNS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a turn, evicting the oldest when full
    pub fn push(&mut self, turn: ConversationTurn) {
        while self.turns.len() >= self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// Record a completed user/assistant exchange
    pub fn push_exchange(&mut self, query: impl Into<String>, answer: impl Into<String>) {
        self.push(ConversationTurn::user(query));
        self.push(ConversationTurn::assistant(answer));
    }

    /// Turns oldest first
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn test_exchange_adds_two_turns() {
        let mut history = ConversationHistory::new();
        history.push_exchange("hi", "hello");

        let turns = history.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Assistant);
    }

    #[test]
    fn test_oldest_turns_evicted_first() {
        let mut history = ConversationHistory::new();
        for i in 0..6 {
            history.push_exchange(format!("q{}", i), format!("a{}", i));
        }

        assert_eq!(history.len(), 10);
        let turns = history.turns();
        assert_eq!(turns[0].content, "q1");
        assert_eq!(turns[9].content, "a5");
    }

    #[test]
    fn test_clear() {
        let mut history = ConversationHistory::with_capacity(2);
        history.push_exchange("q", "a");
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 2);
    }
}
