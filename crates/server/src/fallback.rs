//! Fixed replies for when the answering pipeline fails

/// Message returned when no model could answer
pub fn fallback_message(subject: &str) -> String {
    format!(
        "I apologize, but I'm having trouble processing your question at the moment. \
         Here are some things I can help you with:\n\n\
         - Information about {subject}'s technical skills and experience\n\
         - Details about their projects\n\
         - Their educational background\n\
         - Contact information\n\n\
         Please try rephrasing your question, or ask about any of these topics!"
    )
}

/// Suggested starter questions
pub fn suggestions(subject: &str) -> Vec<String> {
    vec![
        format!("What are {subject}'s main technical skills?"),
        format!("What projects has {subject} built?"),
        format!("What is {subject}'s educational background?"),
        format!("How can I contact {subject}?"),
        format!("What professional experience does {subject} have?"),
        format!("Describe {subject}'s machine learning expertise"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_message_lists_topics() {
        let message = fallback_message("Jane Doe");
        assert!(message.starts_with("I apologize, but I'm having trouble"));
        assert!(message.contains("Jane Doe's technical skills"));
        assert!(message.contains("- Contact information"));
        assert!(message.ends_with("ask about any of these topics!"));
    }

    #[test]
    fn test_suggestions() {
        let suggestions = suggestions("Jane Doe");
        assert_eq!(suggestions.len(), 6);
        assert!(suggestions.iter().all(|s| s.contains("Jane Doe")));
    }
}
