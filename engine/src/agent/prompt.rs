//! Prompt assembly for one query cycle

use crate::llm::ConversationTurn;

/// Context items included in the prompt
pub const MAX_CONTEXT_ITEMS: usize = 3;

/// Turns of conversation included in the prompt (five exchanges)
pub const MAX_PROMPT_TURNS: usize = 10;

/// Build the single prompt sent to the completion service.
///
/// Layout: role line, up to three memory context items, recent conversation,
/// the query, the tool catalogue as `- name: description` lines, and the
/// response-format instruction.
pub fn build_prompt(
    query: &str,
    context: &[String],
    history: &[ConversationTurn],
    tools: &[(&str, &str)],
) -> String {
    let context_lines: Vec<String> = context
        .iter()
        .take(MAX_CONTEXT_ITEMS)
        .map(|c| format!("- {}", c))
        .collect();

    let skip = history.len().saturating_sub(MAX_PROMPT_TURNS);
    let history_lines: Vec<String> = history
        .iter()
        .skip(skip)
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect();

    let tool_lines: Vec<String> = tools
        .iter()
        .map(|(name, description)| format!("- {}: {}", name, description))
        .collect();

    let parts = [
        "You are an AI agent that helps users with software development tasks.".to_string(),
        String::new(),
        "Context from memory:".to_string(),
        context_lines.join("\n"),
        String::new(),
        "Current conversation:".to_string(),
        history_lines.join("\n"),
        String::new(),
        format!("User query: {}", query),
        String::new(),
        "Available tools:".to_string(),
        tool_lines.join("\n"),
        String::new(),
        "Please respond with either:".to_string(),
        "1. A direct answer to the user's question, OR".to_string(),
        "2. Tool calls in JSON format if you need to use tools to complete the task".to_string(),
        String::new(),
        "If using tools, respond with:".to_string(),
        r#"{"tool_calls": [{"name": "tool_name", "arguments": {"param1": "value1"}}]}"#
            .to_string(),
        String::new(),
        "Do not include any other text in your response.".to_string(),
    ];

    parts.join("\n")
}
