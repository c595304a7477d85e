//! Conversation Memory
//!
//! Holds the dialogue history fed to the prompt. The caller owns the history
//! and resends it on every request, so memory never merges: `update` is a
//! full resynchronization.

use parking_lot::RwLock;

use folio_core::ConversationTurn;

/// Conversation memory
#[derive(Debug, Default)]
pub struct ConversationMemory {
    turns: RwLock<Vec<ConversationTurn>>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory seeded from a history
    pub fn from_history(history: &[ConversationTurn]) -> Self {
        let memory = Self::new();
        memory.update(history);
        memory
    }

    /// Drop all turns
    pub fn clear(&self) {
        self.turns.write().clear();
    }

    /// Replace contents with `history`, preserving order and roles
    pub fn update(&self, history: &[ConversationTurn]) {
        let mut turns = self.turns.write();
        turns.clear();
        turns.extend_from_slice(history);
    }

    /// Snapshot of the current history
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.turns.read().clone()
    }

    pub fn len(&self) -> usize {
        self.turns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::TurnRole;

    #[test]
    fn test_update_replaces_everything() {
        let memory = ConversationMemory::new();
        memory.update(&[
            ConversationTurn::user("Where do you work?"),
            ConversationTurn::assistant("Acme Corp"),
        ]);
        assert_eq!(memory.len(), 2);

        memory.update(&[ConversationTurn::user("What is your degree?")]);
        let history = memory.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "What is your degree?");
        assert_eq!(history[0].role, TurnRole::User);
    }

    #[test]
    fn test_update_preserves_order_and_roles() {
        let memory = ConversationMemory::from_history(&[
            ConversationTurn::user("a"),
            ConversationTurn::assistant("b"),
            ConversationTurn::user("c"),
        ]);

        let contents: Vec<String> = memory.history().into_iter().map(|t| t.content).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
        let roles: Vec<TurnRole> = memory.history().into_iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![TurnRole::User, TurnRole::Assistant, TurnRole::User]);
    }

    #[test]
    fn test_clear() {
        let memory = ConversationMemory::from_history(&[
            ConversationTurn::user("hi"),
            ConversationTurn::assistant("hello"),
        ]);
        assert_eq!(memory.len(), 2);

        memory.clear();
        assert!(memory.is_empty());
    }

    #[test]
    fn test_update_with_empty_history_clears() {
        let memory = ConversationMemory::from_history(&[ConversationTurn::user("a")]);
        memory.update(&[]);
        assert!(memory.is_empty());
    }
}
