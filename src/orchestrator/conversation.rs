//! Conversation state owned by one session

use serde::{Deserialize, Serialize};

use crate::llm::{Message, Role};

/// Ordered turns of a session. Turns can only be appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    turns: Vec<Message>,
}

impl ConversationState {
    /// Start a conversation with the system context and the user's query
    pub fn new(system: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            turns: vec![Message::system(system), Message::user(query)],
        }
    }

    pub fn push(&mut self, turn: Message) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.turns.last()
    }

    /// Copy of the turns for a completion request
    pub fn to_messages(&self) -> Vec<Message> {
        self.turns.clone()
    }

    /// Tool turns, in the order they were appended
    pub fn tool_turns(&self) -> impl Iterator<Item = &Message> {
        self.turns.iter().filter(|m| m.role == Role::Tool)
    }

    /// True once the last turn is an assistant answer with no tool request
    pub fn is_terminal(&self) -> bool {
        self.last()
            .is_some_and(|m| m.role == Role::Assistant && m.tool_calls.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;
    use serde_json::json;

    #[test]
    fn test_new_has_system_and_user() {
        let convo = ConversationState::new("rules", "Who owes us?");
        assert_eq!(convo.len(), 2);
        assert_eq!(convo.turns()[0].role, Role::System);
        assert_eq!(convo.turns()[1].content, "Who owes us?");
        assert!(!convo.is_terminal());
    }

    #[test]
    fn test_append_preserves_order() {
        let mut convo = ConversationState::new("s", "q");
        let a = ToolCall::new("1", "get_sundry_debtors", json!({}));
        let b = ToolCall::new("2", "get_trial_balance", json!({}));

        convo.push(Message::assistant_with_tools("", vec![a.clone(), b.clone()]));
        convo.push(Message::tool(&a, "A"));
        convo.push(Message::tool(&b, "B"));
        assert!(!convo.is_terminal());

        convo.push(Message::assistant("done"));

        let tool_names: Vec<_> = convo.tool_turns().map(|m| m.name.clone().unwrap()).collect();
        assert_eq!(tool_names, vec!["get_sundry_debtors", "get_trial_balance"]);
        assert!(convo.is_terminal());
        assert_eq!(convo.to_messages().len(), 6);
    }
}
