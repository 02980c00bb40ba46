//! `contacts` agent — extracts name/email pairs from arbitrary CSV.
//!
//! No parsing logic lives here: the whole task goes to the code interpreter
//! tool, which has the model write a program for whatever layout the data
//! has. When the program prints a JSON array it is surfaced as `contacts`.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::warn;

use super::prompt::PromptBuilder;
use super::{Agent, AgentFuture, AgentsState, InvocationContext, KindTag, RequestKind, Response, mismatched};
use crate::tools::ToolError;
use crate::tools::code_interpreter::INPUT_FILENAME;

const PREVIEW_CHARS: usize = 200;
const PARADIGM: &str = "Give an Agent a Tool - no hard-coded parsing logic needed!";

const SYSTEM_TEMPLATE: &str = "contacts_system.md";
const SYSTEM_FALLBACK: &str = "You are a contact extraction assistant.

Your goal: extract name and email from CSV data, regardless of format.

Write one Python 3 program, using only the standard library, that:
1. Reads the CSV from `input.csv` in the current directory (handle any delimiter, any header names, any language)
2. Extracts each person's name and email
3. Prints the contacts to stdout as a JSON list: [{\"name\": \"John Doe\", \"email\": \"john@example.com\"}, ...]

Be flexible: names may be split across columns or in a single column, emails may sit in a column called \"Email\", \"Work Email\", \"Correo\" or be mixed with other data, and extra columns should be ignored.

Reply with the program in a single ```python fenced block.";

const TEMPLATE: &str = "contacts.txt";
const FALLBACK: &str = "Extract contacts from this CSV data (saved as {{input_file}} in your working directory):

{{csv}}

Write Python code to parse it and extract name + email for each person. Print the results as a JSON list.";

pub(crate) struct ContactsAgent;

impl Agent for ContactsAgent {
    fn id(&self) -> &str { "contacts" }

    fn expects(&self) -> KindTag {
        KindTag::Contacts
    }

    fn handle(&self, kind: RequestKind, _ctx: InvocationContext, state: Arc<AgentsState>) -> AgentFuture {
        let RequestKind::Contacts { csv } = kind else {
            return mismatched(self.id());
        };
        Box::pin(async move {
            if csv.trim().is_empty() {
                return Response::failure("Please provide CSV data in the 'csv' field").with(
                    "example",
                    json!({ "csv": "First Name,Last Name,Email\nJohn,Doe,john@example.com" }),
                );
            }

            let system = PromptBuilder::new(&state.prompts_dir)
                .template(SYSTEM_TEMPLATE, SYSTEM_FALLBACK)
                .build();
            let instruction = PromptBuilder::new(&state.prompts_dir)
                .template(TEMPLATE, FALLBACK)
                .var("input_file", INPUT_FILENAME)
                .var("csv", &csv)
                .build();

            let result = state
                .tools
                .code_interpreter
                .run(&state.llm, &system, &instruction, &csv)
                .await;

            let run = match result {
                Ok(run) => run,
                Err(e) => {
                    warn!("contacts: code interpreter failed: {e}");
                    let message = match &e {
                        ToolError::Timeout(secs) => format!("Code execution timed out after {secs}s"),
                        other => format!("Error: {other}"),
                    };
                    return Response::failure(message)
                        .with_error(&e)
                        .with("csv_preview", preview(&csv));
                }
            };

            let mut response = Response::success("Contacts extracted successfully using Code Interpreter")
                .with("agent_response", run.output.as_str())
                .with("csv_preview", preview(&csv))
                .with("paradigm", PARADIGM)
                .with("model", state.llm.model_label())
                .with_usage(run.usage);

            if let Some(contacts) = parse_contacts(&run.output) {
                response = response
                    .with("contacts_found", contacts.len())
                    .with("contacts", contacts);
            }
            response
        })
    }
}

/// First [`PREVIEW_CHARS`] characters, with `...` when cut.
fn preview(csv: &str) -> String {
    match csv.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &csv[..idx]),
        None => csv.to_string(),
    }
}

/// A JSON array in the program output, either the whole output or the
/// outermost `[...]` span inside it.
fn parse_contacts(output: &str) -> Option<Vec<Value>> {
    let trimmed = output.trim();
    if let Ok(list) = serde_json::from_str::<Vec<Value>>(trimmed) {
        return Some(list);
    }
    let start = trimmed.find('[')?;
    let end = trimmed.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Vec<Value>>(&trimmed[start..=end]).ok()
}
