//! Prompt templates for the SQL agent.

use super::ToolDefinition;

/// Maximum number of rows the agent is told to ask for.
pub const TOP_K: usize = 10;

const PREFIX: &str = r#"You are an agent designed to interact with a SQL database.
Given an input question, create a syntactically correct {dialect} query to run, then look at the results of the query and return the answer.
Unless the user specifies a specific number of examples they wish to obtain, always limit your query to at most {top_k} results.
You can order the results by a relevant column to return the most interesting examples in the database.
Never query for all the columns from a specific table, only ask for the relevant columns given the question.
You have access to tools for interacting with the database.
Only use the below tools. Only use the information returned by the below tools to construct your final answer.
You MUST double check your query before executing it. If you get an error while executing a query, rewrite the query and try again.

DO NOT make any DML statements (INSERT, UPDATE, DELETE, DROP etc.) to the database.

If the question does not seem related to the database, just return "I don't know" as the answer."#;

const FORMAT_INSTRUCTIONS: &str = r#"Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question"#;

const SUFFIX: &str = "Begin!\n\nQuestion: {input}\n\
Thought: I should look at the tables in the database to see what I can query.  \
Then I should query the schema of the most relevant tables.\n{agent_scratchpad}";

const QUERY_CHECKER: &str = r#"```sql
{query}
```
Double check the {dialect} query above for common mistakes, including:
- Using NOT IN with NULL values
- Using UNION when UNION ALL should have been used
- Using BETWEEN for exclusive ranges
- Data type mismatch in predicates
- Properly quoting identifiers
- Using the correct number of arguments for functions
- Casting to the correct data type
- Using the proper columns for joins

If there are any of the above mistakes, rewrite the query. If there are no mistakes, just reproduce the original query.

Output the final SQL query only."#;

/// Builds the full ReAct prompt for one iteration.
///
/// `scratchpad` holds the previous steps of this run, already formatted as
/// `Action` / `Action Input` / `Observation` lines.
pub fn build_react_prompt(
    dialect: &str,
    tools: &[ToolDefinition],
    question: &str,
    scratchpad: &str,
) -> String {
    let prefix = PREFIX
        .replace("{dialect}", dialect)
        .replace("{top_k}", &TOP_K.to_string());

    let tool_list = tools
        .iter()
        .map(|t| format!("{}: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    let tool_names = tools
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let format = FORMAT_INSTRUCTIONS.replace("{tool_names}", &tool_names);

    let suffix = fill(SUFFIX, &[("{input}", question), ("{agent_scratchpad}", scratchpad)]);

    [prefix, tool_list, format, suffix].join("\n\n")
}

/// Builds the prompt asking the model to double-check a query.
pub fn build_checker_prompt(dialect: &str, query: &str) -> String {
    fill(QUERY_CHECKER, &[("{query}", query), ("{dialect}", dialect)])
}

/// Substitutes placeholders in one pass over `template`; substituted text is
/// never scanned again.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some((pos, key, value)) = vars
        .iter()
        .filter_map(|(key, value)| rest.find(key).map(|pos| (pos, *key, *value)))
        .min_by_key(|(pos, _, _)| *pos)
    {
        out.push_str(&rest[..pos]);
        out.push_str(value);
        rest = &rest[pos + key.len()..];
    }

    out.push_str(rest);
    out
}

/// Appends one completed step to the scratchpad.
pub fn append_step(scratchpad: &mut String, model_output: &str, observation: &str) {
    scratchpad.push_str(model_output);
    scratchpad.push_str("\nObservation: ");
    scratchpad.push_str(observation);
    scratchpad.push_str("\nThought: ");
}
