//! Two-pass strategy that first asks the model which page lines it can ignore
//!
//! Arguments the page can't be filtered with fall back to the unfiltered page. Model failures abort the step.

use crate::{afford::{AffordanceStrategy, Affordances, FunctionAfforder, render_state},
            browser::{BrowserSession, RenderLanguage},
            error::{AgentError, AgentResult},
            llm::{ChatCompletion, FunctionDef, Message, call_function},
            trajectory::{Trajectory, TrajectoryItem}};
use async_trait::async_trait;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use std::{collections::BTreeSet, sync::Arc};

const SYSTEM_PROMPT: &str = include_str!("prompts/filter_affordances.txt");

const FILTER_FUNCTION: &str = "filter_irrelevant_lines";

/// `12`, `<12>`, `3-10`, `3:10`, `:10` or `40:`, optionally followed by `description="..."`
const LINE_RANGE_PATTERN: &str =
    r#"^\s*(?:(\d+)\s*[-:]\s*(\d+)|:\s*(\d+)|(\d+)\s*:|<(\d+)>|(\d+))(?:\s+description="(.*)")?\s*$"#;

#[derive(Debug, Deserialize, JsonSchema)]
struct FilterParams {
    /// A description of the next action that should be taken. This description should be a single line of text.
    next_action_description: String,

    /// A sequence of the irrelevant lines. Each item is a number or a range followed by a description.
    irrelevant_lines: Vec<String>,
}

pub struct FilterAfforder {
    base: FunctionAfforder,
    model: Arc<dyn ChatCompletion>,
}

impl FilterAfforder {
    pub fn new(model: Arc<dyn ChatCompletion>) -> Self {
        Self { base: FunctionAfforder::new(), model }
    }

    /// Page with the lines the model marked irrelevant removed
    async fn filter_display(&self, display: &str, trajectory: &Trajectory) -> AgentResult<String> {
        let lines: Vec<&str> = display.lines().collect();
        let messages = vec![
            Message::system(SYSTEM_PROMPT.trim()),
            Message::user(format!(
                "{}\n\nFirst, list a description of the next action that should be taken. Then, list a sequence of \
                 the irrelevant lines. These lines will be deleted and the remaining lines will be displayed as the \
                 web browser for your next action.",
                render_state(&number_lines(&lines), trajectory)
            )),
        ];
        let function = FunctionDef::for_params::<FilterParams>(
            FILTER_FUNCTION,
            "Filter out the irrelevant lines from the browser display. The remaining lines will be displayed as the \
             web browser for your next action.",
        );

        let params: FilterParams = call_function(self.model.as_ref(), &messages, function).await?;
        log::debug!("Filter pass expects next action: {}", params.next_action_description);

        let irrelevant = parse_line_ranges(&params.irrelevant_lines, lines.len())?;
        let kept: Vec<&str> =
            lines.iter().enumerate().filter(|(i, _)| !irrelevant.contains(i)).map(|(_, line)| *line).collect();
        Ok(kept.join("\n"))
    }
}

#[async_trait]
impl AffordanceStrategy for FilterAfforder {
    async fn affordances(&self, trajectory: &Trajectory, session: &BrowserSession) -> AgentResult<Affordances> {
        let display = session.render(RenderLanguage::Markdown).await?;
        let display = match self.filter_display(&display, trajectory).await {
            Ok(filtered) => filtered,
            Err(e @ AgentError::InvalidArguments { .. }) => {
                log::warn!("Filter pass failed, showing the whole page: {}", e);
                display
            }
            Err(e) => return Err(e),
        };
        Ok(Affordances { messages: self.base.prompt(&display, trajectory), functions: self.base.functions() })
    }

    fn parse_next_action(&self, name: &str, arguments: &str) -> AgentResult<TrajectoryItem> {
        self.base.parse_next_action(name, arguments)
    }

    fn does_action_exist(&self, name: &str) -> bool {
        self.base.does_action_exist(name)
    }

    fn functions(&self) -> Vec<FunctionDef> {
        self.base.functions()
    }
}

/// Prefix each line with its zero-based number, e.g. `[0] # Title`
pub fn number_lines(lines: &[&str]) -> String {
    lines.iter().enumerate().map(|(i, line)| format!("[{}] {}", i, line)).collect::<Vec<_>>().join("\n")
}

/// Parse line descriptors into the set of line numbers they cover
///
/// Ranges are inclusive and clamped to `line_count`. Any unparsable descriptor fails the whole set.
pub fn parse_line_ranges(descriptors: &[String], line_count: usize) -> AgentResult<BTreeSet<usize>> {
    let invalid = |descriptor: &str, reason: &str| AgentError::InvalidArguments {
        action: FILTER_FUNCTION.to_string(),
        reason: format!("{}: {}", reason, descriptor),
    };
    let pattern = Regex::new(LINE_RANGE_PATTERN).map_err(|e| invalid(LINE_RANGE_PATTERN, &e.to_string()))?;
    let last = line_count.saturating_sub(1);

    let mut lines = BTreeSet::new();
    for descriptor in descriptors {
        let caps = pattern.captures(descriptor).ok_or_else(|| invalid(descriptor, "invalid line descriptor"))?;
        let number = |i: usize| -> AgentResult<Option<usize>> {
            caps.get(i)
                .map(|m| m.as_str().parse::<usize>().map_err(|_| invalid(descriptor, "line number out of range")))
                .transpose()
        };

        let (start, end) = match (number(1)?, number(2)?, number(3)?, number(4)?, number(5)?, number(6)?) {
            (Some(start), Some(end), ..) => (start, end),
            (_, _, Some(end), ..) => (0, end),
            (_, _, _, Some(start), ..) => (start, last),
            (_, _, _, _, Some(line), _) | (_, _, _, _, _, Some(line)) => (line, line),
            _ => return Err(invalid(descriptor, "invalid line descriptor")),
        };
        if start > end {
            return Err(invalid(descriptor, "range start is after its end"));
        }
        lines.extend((start..=end.min(last)).take_while(|_| line_count > 0));
    }
    Ok(lines)
}
