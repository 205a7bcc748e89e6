//! Parsing of ReAct model output.
//!
//! A model turn either names an action (`Action:` / `Action Input:`) or ends
//! with `Final Answer:`. Anything else is a format error that is fed back to
//! the model as an observation.

use regex::Regex;
use std::fmt;

use crate::error::{Result, SqlChatError};

const FINAL_ANSWER: &str = "Final Answer:";

const ACTION_PATTERN: &str = r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)";
const ACTION_ONLY_PATTERN: &str = r"(?s)Action\s*\d*\s*:[\s]*(.*?)";
const ACTION_INPUT_PATTERN: &str = r"(?s)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)";

/// What the model decided to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutput {
    Action {
        tool: String,
        input: String,
        thought: String,
    },
    Finish {
        answer: String,
        thought: String,
    },
}

/// Model output that follows neither the action nor the final answer format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    MissingAction,
    MissingActionInput,
    ActionAndFinalAnswer,
}

impl FormatError {
    /// Corrective text handed back to the model.
    pub fn observation(&self) -> &'static str {
        match self {
            Self::MissingAction => "Invalid Format: Missing 'Action:' after 'Thought:'",
            Self::MissingActionInput => "Invalid Format: Missing 'Action Input:' after 'Action:'",
            Self::ActionAndFinalAnswer => {
                "Invalid Format: Give either an 'Action:' or a 'Final Answer:', not both"
            }
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.observation())
    }
}

/// Compiled patterns for ReAct output.
#[derive(Debug, Clone)]
pub struct OutputParser {
    action: Regex,
    action_only: Regex,
    action_input: Regex,
}

impl OutputParser {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| SqlChatError::internal(format!("Invalid output pattern: {}", e)))
        };
        Ok(Self {
            action: compile(ACTION_PATTERN)?,
            action_only: compile(ACTION_ONLY_PATTERN)?,
            action_input: compile(ACTION_INPUT_PATTERN)?,
        })
    }

    pub fn parse(&self, text: &str) -> std::result::Result<AgentOutput, FormatError> {
        let includes_answer = text.contains(FINAL_ANSWER);

        if let Some(caps) = self.action.captures(text) {
            if includes_answer {
                return Err(FormatError::ActionAndFinalAnswer);
            }
            let start = caps.get(0).map(|m| m.start()).unwrap_or_default();
            let tool = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let input = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            return Ok(AgentOutput::Action {
                tool: tool.trim().to_string(),
                input: clean_input(input),
                thought: text[..start].trim().to_string(),
            });
        }

        if includes_answer {
            let (thought, answer) = match (text.find(FINAL_ANSWER), text.rfind(FINAL_ANSWER)) {
                (Some(first), Some(last)) => (&text[..first], &text[last + FINAL_ANSWER.len()..]),
                _ => ("", text),
            };
            return Ok(AgentOutput::Finish {
                answer: answer.trim().to_string(),
                thought: thought.trim().to_string(),
            });
        }

        if !self.action_only.is_match(text) {
            Err(FormatError::MissingAction)
        } else if !self.action_input.is_match(text) {
            Err(FormatError::MissingActionInput)
        } else {
            Err(FormatError::MissingAction)
        }
    }
}

/// Strips the quoting models like to put around tool input.
fn clean_input(input: &str) -> String {
    let input = input.trim_matches(' ').trim_matches('"');
    match extract_code_block(input) {
        Some(code) => code.trim().to_string(),
        None => input.trim().to_string(),
    }
}

/// Extracts the body of the first fenced code block, with or without a
/// language tag.
pub fn extract_code_block(text: &str) -> Option<String> {
    let fence = text.find("```")?;
    let after_fence = &text[fence + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].to_string())
}

/// Pulls the SQL out of a query-checker reply: the code block if there is
/// one, otherwise the reply itself.
pub fn extract_sql(response: &str) -> String {
    let sql = extract_code_block(response).unwrap_or_else(|| response.to_string());
    let sql = sql.trim();
    sql.strip_prefix("SQL Query:").unwrap_or(sql).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> std::result::Result<AgentOutput, FormatError> {
        OutputParser::new().unwrap().parse(text)
    }

    #[test]
    fn test_parse_action() {
        let output = parse(
            "I should look at the tables.\nAction: sql_db_list_tables\nAction Input: ",
        )
        .unwrap();
        assert_eq!(
            output,
            AgentOutput::Action {
                tool: "sql_db_list_tables".to_string(),
                input: String::new(),
                thought: "I should look at the tables.".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_action_strips_quotes() {
        let output = parse("Action: sql_db_schema\nAction Input: \"STUDENT\"").unwrap();
        match output {
            AgentOutput::Action { tool, input, .. } => {
                assert_eq!(tool, "sql_db_schema");
                assert_eq!(input, "STUDENT");
            }
            other => panic!("expected action, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_action_input_in_code_block() {
        let output =
            parse("Action: sql_db_query\nAction Input: ```sql\nSELECT COUNT(*) FROM STUDENT\n```")
                .unwrap();
        match output {
            AgentOutput::Action { input, .. } => {
                assert_eq!(input, "SELECT COUNT(*) FROM STUDENT")
            }
            other => panic!("expected action, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_multiline_input() {
        let output =
            parse("Action: sql_db_query\nAction Input: SELECT NAME\nFROM STUDENT\nLIMIT 10").unwrap();
        match output {
            AgentOutput::Action { input, .. } => {
                assert_eq!(input, "SELECT NAME\nFROM STUDENT\nLIMIT 10")
            }
            other => panic!("expected action, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_final_answer() {
        let output = parse("I now know the final answer.\nFinal Answer: There are 5 students.").unwrap();
        assert_eq!(
            output,
            AgentOutput::Finish {
                answer: "There are 5 students.".to_string(),
                thought: "I now know the final answer.".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_format_errors() {
        assert_eq!(parse("I am not sure what to do."), Err(FormatError::MissingAction));
        assert_eq!(
            parse("Action: sql_db_list_tables"),
            Err(FormatError::MissingActionInput)
        );
        assert_eq!(
            parse("Action: sql_db_query\nAction Input: SELECT 1\nFinal Answer: 1"),
            Err(FormatError::ActionAndFinalAnswer)
        );
    }

    #[test]
    fn test_format_error_observation() {
        assert_eq!(
            FormatError::MissingAction.to_string(),
            "Invalid Format: Missing 'Action:' after 'Thought:'"
        );
    }

    #[test]
    fn test_extract_sql() {
        assert_eq!(extract_sql("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(extract_sql("```\nSELECT 2\n```"), "SELECT 2");
        assert_eq!(extract_sql("  SELECT 3  "), "SELECT 3");
        assert_eq!(extract_sql("SQL Query: SELECT 4"), "SELECT 4");
    }
}
