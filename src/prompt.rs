//! Line-oriented prompts and a fuzzy server picker.
//!
//! Input and output are injected so every interactive command can be driven
//! from a script in tests.

use crate::{Result, SshyError};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::io::{BufRead, Write};

const TERMINAL: &str = "<terminal>";

pub struct Prompter<'a> {
    input: &'a mut dyn BufRead,
    output: &'a mut dyn Write,
}

impl std::fmt::Debug for Prompter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prompter").finish_non_exhaustive()
    }
}

impl<'a> Prompter<'a> {
    pub fn new(input: &'a mut dyn BufRead, output: &'a mut dyn Write) -> Self {
        Self { input, output }
    }

    /// Where command output goes.
    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.output
    }

    /// Write one line of output.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{line}").map_err(|e| SshyError::io(TERMINAL, e))
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        self.output.flush().map_err(|e| SshyError::io(TERMINAL, e))?;
        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(|e| SshyError::io(TERMINAL, e))?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask for a value, returning `default` when the answer is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read or written, or input
    /// ends before an answer is given.
    pub fn ask(&mut self, label: &str, default: &str) -> Result<String> {
        let written = if default.is_empty() {
            write!(self.output, "{label}: ")
        } else {
            write!(self.output, "{label} [{default}]: ")
        };
        written.map_err(|e| SshyError::io(TERMINAL, e))?;

        match self.read_line()? {
            Some(answer) if answer.is_empty() => Ok(default.to_string()),
            Some(answer) => Ok(answer),
            None => Err(SshyError::Validation("unexpected end of input".to_string())),
        }
    }

    /// Ask for a replacement value, showing `current`. An empty answer or end
    /// of input keeps the current value and yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read or written.
    pub fn ask_change(&mut self, label: &str, current: &str) -> Result<Option<String>> {
        write!(self.output, "{label} ({current}): ").map_err(|e| SshyError::io(TERMINAL, e))?;
        Ok(self.read_line()?.filter(|answer| !answer.is_empty()))
    }

    /// Ask a yes/no question. Anything other than `y` or `yes` is a no.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read or written.
    pub fn confirm(&mut self, label: &str) -> Result<bool> {
        write!(self.output, "{label} [y/N]: ").map_err(|e| SshyError::io(TERMINAL, e))?;
        let answer = self.read_line()?.unwrap_or_default().to_ascii_lowercase();
        Ok(matches!(answer.as_str(), "y" | "yes"))
    }
}

/// Indices of `items` matching `pattern`, best match first. An empty pattern
/// keeps every item in order.
pub fn fuzzy_filter<S: AsRef<str>>(items: &[S], pattern: &str) -> Vec<usize> {
    if pattern.is_empty() {
        return (0..items.len()).collect();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(i64, usize)> = items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| matcher.fuzzy_match(item.as_ref(), pattern).map(|s| (s, idx)))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, idx)| idx).collect()
}

/// Let the user pick one of `items`.
///
/// A number picks from the list shown; any other text narrows the list with
/// fuzzy matching. An empty answer or end of input cancels.
///
/// # Errors
///
/// Returns an error if the terminal cannot be read or written.
pub fn select<S: AsRef<str>>(
    prompter: &mut Prompter<'_>,
    label: &str,
    items: &[S],
) -> Result<Option<usize>> {
    if items.is_empty() {
        return Ok(None);
    }

    let mut visible = fuzzy_filter(items, "");
    loop {
        prompter.say(label)?;
        for (pos, idx) in visible.iter().enumerate() {
            prompter.say(&format!("  {:>2}) {}", pos + 1, items[*idx].as_ref()))?;
        }
        write!(prompter.out(), "Number or filter (empty to cancel): ")
            .map_err(|e| SshyError::io(TERMINAL, e))?;

        let Some(answer) = prompter.read_line()? else {
            return Ok(None);
        };
        if answer.is_empty() {
            return Ok(None);
        }

        if let Ok(choice) = answer.parse::<usize>() {
            if let Some(idx) = choice.checked_sub(1).and_then(|pos| visible.get(pos)) {
                return Ok(Some(*idx));
            }
            prompter.say(&format!("No entry numbered {choice}"))?;
            continue;
        }

        let filtered = fuzzy_filter(items, &answer);
        if filtered.len() == 1 {
            return Ok(Some(filtered[0]));
        }
        if filtered.is_empty() {
            prompter.say(&format!("Nothing matches '{answer}'"))?;
        } else {
            visible = filtered;
        }
    }
}
