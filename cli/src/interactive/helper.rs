use std::borrow::Cow;
use std::collections::HashSet;
use std::marker::PhantomData;

use anstyle::Style;
use clap::{Command, CommandFactory};
use rustyline::{
    completion::Completer,
    highlight::Highlighter,
    hint::Hinter,
    validate::{ValidationContext, ValidationResult, Validator},
    Context,
};
use rustyline_derive::Helper;

/// Rustyline helper, that handles interactive completion, highlighting and hinting.
#[derive(Helper, Debug)]
pub(crate) struct RunHelper<T: CommandFactory> {
    app: PhantomData<T>,
}

impl<T: CommandFactory> RunHelper<T> {
    pub fn new() -> Self {
        RunHelper { app: PhantomData }
    }
}

fn suggest(command: &Command, input: &[String]) -> (usize, HashSet<String>) {
    // We're building the suggestions here
    // The only downside is that it's wasted work if we're not on the first word (second pattern of
    // the match bellow)
    let mut suggestions: HashSet<_> = command
        .get_subcommands()
        .flat_map(|cmd| {
            std::iter::once(cmd.get_name().to_string())
                .chain(cmd.get_visible_aliases().map(ToString::to_string))
        })
        .collect();

    // If the app has subcommands, it has a `help` command
    if command.has_subcommands() {
        suggestions.insert("help".to_string());
    }

    match input {
        [last] => (
            last.len(),
            suggestions
                .into_iter()
                .filter(|alias| alias.starts_with(last))
                .collect(),
        ),

        [head, tail @ ..] => command
            .find_subcommand(head)
            .map(|sub: &Command| suggest(sub, tail))
            .unwrap_or_default(),

        [] => (0, suggestions),
    }
}

/// Split the line up to the cursor in words. An empty word is added when the
/// line ends with a space, to complete the next word.
fn words_before(line: &str, pos: usize) -> Option<Vec<String>> {
    let line = line.get(..pos)?;
    let mut words = shell_words::split(line).ok()?;
    if line.ends_with([' ', '\t']) {
        words.push(String::new());
    }
    Some(words)
}

impl<T: CommandFactory> Completer for RunHelper<T> {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let Some(words) = words_before(line, pos) else {
            return Ok((0, Vec::new()));
        };

        let app = T::command();
        let (offset, candidates) = suggest(&app, words.as_slice());
        let mut candidates: Vec<_> = candidates.into_iter().collect();
        candidates.sort_unstable();

        Ok((pos.saturating_sub(offset), candidates))
    }
}

impl<T: CommandFactory> Highlighter for RunHelper<T> {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        let style = Style::new().dimmed();
        Cow::Owned(format!("{}{hint}{}", style.render(), style.render_reset()))
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        let style = Style::new().bold();
        Cow::Owned(format!("{}{prompt}{}", style.render(), style.render_reset()))
    }
}

impl<T: CommandFactory> Hinter for RunHelper<T> {
    type Hint = String;
    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let words = words_before(line, pos)?;

        let app = T::command();
        let (offset, candidates) = suggest(&app, words.as_slice());

        if candidates.len() == 1 {
            candidates
                .into_iter()
                .next()
                .and_then(|candidate| candidate.get(offset..).map(ToString::to_string))
        } else {
            None
        }
    }
}

impl<T: CommandFactory> Validator for RunHelper<T> {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();
        let res = shell_words::split(input);
        if res.is_err() {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}
