//! Prompt Building
//!
//! Constructs the grounding prompt: fixed instructions, the caller's
//! conversation history, then the retrieved evidence and the question.

use serde::{Deserialize, Serialize};
use std::fmt;

use folio_core::{ConversationTurn, ScoredChunk, TurnRole};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ConversationTurn> for Message {
    fn from(turn: &ConversationTurn) -> Self {
        match turn.role {
            TurnRole::User => Message::user(turn.content.clone()),
            TurnRole::Assistant => Message::assistant(turn.content.clone()),
        }
    }
}

/// Reply the model is told to give when the context lacks an answer
pub const NO_INFORMATION: &str = "I don't have that information";

/// Separator between evidence chunks in the context block
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Grounding prompt template
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    subject: String,
}

impl PromptTemplate {
    /// `subject` is the person the knowledge base describes
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Fixed instruction block
    pub fn instructions(&self) -> String {
        format!(
            "You are an AI assistant answering questions about {subject}.\n\
             \n\
             INSTRUCTIONS:\n\
             1. Read the CONTEXT carefully - it contains all the factual information about {subject}\n\
             2. Answer the QUESTION using ONLY information from the CONTEXT\n\
             3. For factual data (phone, email, names, dates, universities, numbers), copy EXACTLY from context\n\
             4. Always give the SAME answer for the SAME question - be consistent\n\
             5. If you reference previous conversation, use the chat history to understand the context\n\
             6. If information is NOT in context, say \"{none}\"\n\
             7. If no single passage answers the question, combine related passages from the CONTEXT. \
             Only as a last resort give an inference, clearly labeled as one, and never invent names, \
             numbers or employers",
            subject = self.subject,
            none = NO_INFORMATION,
        )
    }

    /// Join evidence text in ranked order
    pub fn format_context(evidence: &[ScoredChunk]) -> String {
        evidence
            .iter()
            .map(|e| e.chunk.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    /// Final user turn carrying the evidence and the question
    pub fn question_block(context: &str, question: &str) -> String {
        format!(
            "CONTEXT FROM KNOWLEDGE BASE:\n{}\n\nQUESTION: {}\n\nANSWER (Extract facts directly from context above):",
            context, question
        )
    }

    /// Build the full message list for one answer
    pub fn build(
        &self,
        question: &str,
        evidence: &[ScoredChunk],
        history: &[ConversationTurn],
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.instructions()));
        messages.extend(history.iter().map(Message::from));

        let context = Self::format_context(evidence);
        messages.push(Message::user(Self::question_block(&context, question)));
        messages
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new("the portfolio owner")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{Chunk, MatchSource};

    fn evidence(texts: &[&str]) -> Vec<ScoredChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| ScoredChunk::new(Chunk::with_id(i.to_string(), *t), 1.0, MatchSource::Hybrid))
            .collect()
    }

    #[test]
    fn test_message_creation() {
        let msg = Message::system("You are helpful");
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.role.to_string(), "system");
    }

    #[test]
    fn test_instructions_cover_grounding_rules() {
        let template = PromptTemplate::new("Jane Doe");
        let text = template.instructions();

        assert!(text.contains("about Jane Doe"));
        assert!(text.contains("ONLY information from the CONTEXT"));
        assert!(text.contains("copy EXACTLY"));
        assert!(text.contains("SAME answer for the SAME question"));
        assert!(text.contains(NO_INFORMATION));
        assert!(text.contains("never invent names"));
    }

    #[test]
    fn test_build_orders_messages() {
        let template = PromptTemplate::new("Jane Doe");
        let history = vec![
            ConversationTurn::user("Where do you work?"),
            ConversationTurn::assistant("Acme Corp"),
        ];

        let messages = template.build(
            "What is the contact email?",
            &evidence(&["Email: foo@example.com", "Phone: +1 555 0100"]),
            &history,
        );

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "Where do you work?");
        assert_eq!(messages[2].role, Role::Assistant);

        let last = &messages[3];
        assert_eq!(last.role, Role::User);
        assert!(last.content.starts_with("CONTEXT FROM KNOWLEDGE BASE:\nEmail: foo@example.com\n\nPhone: +1 555 0100"));
        assert!(last.content.contains("QUESTION: What is the contact email?"));
        assert!(last.content.ends_with("ANSWER (Extract facts directly from context above):"));
    }

    #[test]
    fn test_empty_evidence_still_builds() {
        let messages = PromptTemplate::default().build("What is the expected salary?", &[], &[]);
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("CONTEXT FROM KNOWLEDGE BASE:\n\n"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let template = PromptTemplate::new("Jane Doe");
        let ev = evidence(&["MSc Computer Science"]);
        let a = template.build("Degree?", &ev, &[]);
        let b = template.build("Degree?", &ev, &[]);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.content, y.content);
        }
    }
}
