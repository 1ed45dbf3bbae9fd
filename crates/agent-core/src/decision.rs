//! Decision Parsing
//!
//! Turns raw model output into an [`AgentDecision`]. The primary format is
//! the ReAct text protocol:
//!
//! ```text
//! Thought: I should look up the invoices
//! Action: search_invoices
//! Action Input: Alice Johnson
//! ```
//!
//! or `Final Answer: ...`. A fenced ```` ```tool ```` JSON block
//! (`{"tool": "...", "input": "..."}`) is accepted as a fallback.

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";
const FINAL_ANSWER: &str = "Final Answer:";
const OBSERVATION: &str = "Observation:";
const THOUGHT: &str = "Thought:";

/// What the model decided to do next
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentDecision {
    Invoke {
        tool_name: String,
        tool_input: String,
        rationale: String,
    },
    Finish {
        final_answer: String,
        rationale: String,
    },
}

impl AgentDecision {
    pub fn rationale(&self) -> &str {
        match self {
            AgentDecision::Invoke { rationale, .. } | AgentDecision::Finish { rationale, .. } => {
                rationale
            }
        }
    }
}

#[derive(Deserialize)]
struct JsonAction {
    #[serde(alias = "name")]
    tool: String,
    #[serde(default, alias = "arguments")]
    input: serde_json::Value,
}

/// Parse raw model output into a decision
pub fn parse_decision(raw: &str) -> Result<AgentDecision> {
    // A model that keeps going after its action invents its own observations.
    let text = match raw.find(&format!("\n{OBSERVATION}")) {
        Some(idx) => &raw[..idx],
        None => raw,
    };

    if let Some(decision) = parse_tool_block(text) {
        return Ok(decision);
    }

    let has_final = text.contains(FINAL_ANSWER);

    if let Some((tool_name, tool_input)) = parse_action(text) {
        if has_final {
            return Err(AgentError::Parse(
                "output contains both a final answer and a parse-able action".into(),
            ));
        }

        return Ok(AgentDecision::Invoke {
            tool_name,
            tool_input,
            rationale: rationale_before(text, ACTION),
        });
    }

    if let Some(idx) = text.find(FINAL_ANSWER) {
        let final_answer = text[idx + FINAL_ANSWER.len()..].trim().to_string();
        if final_answer.is_empty() {
            return Err(AgentError::Parse("'Final Answer:' is empty".into()));
        }
        return Ok(AgentDecision::Finish {
            final_answer,
            rationale: rationale_before(text, FINAL_ANSWER),
        });
    }

    if !text.contains(ACTION) {
        return Err(AgentError::Parse("missing 'Action:' after 'Thought:'".into()));
    }

    Err(AgentError::Parse("missing 'Action Input:' after 'Action:'".into()))
}

/// Locate `Action: X` followed by `Action Input: Y`
fn parse_action(text: &str) -> Option<(String, String)> {
    let action_idx = text.find(ACTION)?;
    let after_action = &text[action_idx + ACTION.len()..];
    let input_idx = after_action.find(ACTION_INPUT)?;

    let tool_name = after_action[..input_idx].trim().to_string();
    if tool_name.is_empty() {
        return None;
    }

    let tool_input = after_action[input_idx + ACTION_INPUT.len()..]
        .trim()
        .trim_matches('"')
        .to_string();

    Some((tool_name, tool_input))
}

/// Look for a fenced ```tool JSON block
fn parse_tool_block(content: &str) -> Option<AgentDecision> {
    let tool_start = "```tool";
    let tool_end = "```";

    let start_idx = content.find(tool_start)?;
    let after_marker = &content[start_idx + tool_start.len()..];
    let end_idx = after_marker.find(tool_end)?;
    let json_str = after_marker[..end_idx].trim();

    let action = serde_json::from_str::<JsonAction>(json_str).ok()?;
    let tool_input = match action.input {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };

    Some(AgentDecision::Invoke {
        tool_name: action.tool,
        tool_input,
        rationale: content[..start_idx].trim().to_string(),
    })
}

fn rationale_before(text: &str, marker: &str) -> String {
    let head = text.find(marker).map_or(text, |idx| &text[..idx]);
    let head = head.trim();
    head.strip_prefix(THOUGHT).unwrap_or(head).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        let raw = "Thought: I need the invoices\nAction: search_invoices\nAction Input: \"Alice Johnson\"";
        let decision = parse_decision(raw).unwrap();
        assert_eq!(
            decision,
            AgentDecision::Invoke {
                tool_name: "search_invoices".into(),
                tool_input: "Alice Johnson".into(),
                rationale: "I need the invoices".into(),
            }
        );
    }

    #[test]
    fn test_parse_final_answer() {
        let raw = "I now know the final answer\nFinal Answer: Alice Johnson has 2 invoices.";
        let decision = parse_decision(raw).unwrap();
        assert_eq!(
            decision,
            AgentDecision::Finish {
                final_answer: "Alice Johnson has 2 invoices.".into(),
                rationale: "I now know the final answer".into(),
            }
        );
    }

    #[test]
    fn test_hallucinated_observation_is_cut() {
        let raw = "Action: ocr_extract\nAction Input: image.png\nObservation: made up\nFinal Answer: nope";
        let decision = parse_decision(raw).unwrap();
        assert!(matches!(decision, AgentDecision::Invoke { ref tool_input, .. } if tool_input == "image.png"));
    }

    #[test]
    fn test_both_action_and_final_is_error() {
        let raw = "Action: ocr_extract\nAction Input: image.png\nFinal Answer: done";
        assert!(matches!(parse_decision(raw), Err(AgentError::Parse(_))));
    }

    #[test]
    fn test_missing_action_is_error() {
        let err = parse_decision("I am not sure what to do").unwrap_err();
        assert!(err.to_string().contains("missing 'Action:'"));
    }

    #[test]
    fn test_missing_action_input_is_error() {
        let err = parse_decision("Thought: hmm\nAction: search_invoices").unwrap_err();
        assert!(err.to_string().contains("missing 'Action Input:'"));
    }

    #[test]
    fn test_parse_tool_block() {
        let raw = r#"Let me check that for you.
```tool
{"tool": "ocr_extract", "input": "scan.png"}
```"#;
        let decision = parse_decision(raw).unwrap();
        assert_eq!(
            decision,
            AgentDecision::Invoke {
                tool_name: "ocr_extract".into(),
                tool_input: "scan.png".into(),
                rationale: "Let me check that for you.".into(),
            }
        );
    }
}
