use super::plan::ClassifiedUpdate;
use crate::error::{ApmError, Result};
use colored::Colorize;
use std::io::{self, BufRead, Write};

/// Answer to a single yes/no/all/quit prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Yes,
    No,
    All,
    Quit,
}

/// Empty input means no; prompts here are opt-in.
fn parse_decision(input: &str) -> Option<Decision> {
    match input.trim().to_lowercase().as_str() {
        "" | "n" | "no" => Some(Decision::No),
        "y" | "yes" => Some(Decision::Yes),
        "a" | "all" => Some(Decision::All),
        "q" | "quit" => Some(Decision::Quit),
        _ => None,
    }
}

/// How confirmations are obtained during an update run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    /// Ask on the terminal.
    Prompt,
    /// `--yes`: accept the plan without asking.
    AssumeYes,
    /// No terminal and no `--yes`: nothing gets confirmed.
    Unattended,
}

impl InteractionMode {
    pub fn detect(assume_yes: bool, is_terminal: bool) -> Self {
        match (assume_yes, is_terminal) {
            (true, _) => InteractionMode::AssumeYes,
            (false, true) => InteractionMode::Prompt,
            (false, false) => InteractionMode::Unattended,
        }
    }
}

/// Manages the human-in-the-loop part of an update run.
///
/// Questionable updates are confirmed one by one; the overall plan gets a
/// final confirmation unless the run was started with `--yes`.
pub struct UpdateInteraction<R> {
    input: R,
    mode: InteractionMode,
    accept_all: bool,
}

impl UpdateInteraction<io::StdinLock<'static>> {
    pub fn stdin(mode: InteractionMode) -> Self {
        Self::new(io::stdin().lock(), mode)
    }
}

impl<R: BufRead> UpdateInteraction<R> {
    pub fn new(input: R, mode: InteractionMode) -> Self {
        Self {
            input,
            mode,
            accept_all: false,
        }
    }

    /// Ask whether a questionable update should join the plan. Defaults to no;
    /// non-interactive runs never accept.
    pub fn confirm_questionable(&mut self, update: &ClassifiedUpdate) -> Result<bool> {
        if self.mode != InteractionMode::Prompt {
            return Ok(false);
        }

        println!(
            "\n{} {} {} {} to {}",
            "[Questionable]".yellow().bold(),
            update.record.package.white().bold(),
            "from".dimmed(),
            update.record.current.red(),
            update.record.latest.yellow().bold()
        );
        println!("   {}", update.reason.dimmed());

        if self.accept_all {
            println!("{}", "Including (previously selected 'all').".dimmed());
            return Ok(true);
        }

        loop {
            match self.ask("Include this update? [y/N/a/q]: ")? {
                Some(Decision::Yes) => return Ok(true),
                Some(Decision::No) => {
                    println!("{}", "Leaving this update out.".dimmed());
                    return Ok(false);
                }
                Some(Decision::All) => {
                    println!(
                        "{}",
                        "Including this and all remaining questionable updates."
                            .yellow()
                            .bold()
                    );
                    self.accept_all = true;
                    return Ok(true);
                }
                Some(Decision::Quit) => {
                    println!("{}", "Stopping update process at user request.".yellow());
                    return Err(ApmError::UserCancelled);
                }
                None => println!(
                    "{}",
                    "Please answer with y(es), n(o), a(ll), or q(uit).".red()
                ),
            }
        }
    }

    /// Final go-ahead for installing `count` updates. Defaults to no.
    pub fn confirm_plan(&mut self, count: usize) -> Result<bool> {
        match self.mode {
            InteractionMode::AssumeYes => return Ok(true),
            InteractionMode::Unattended => {
                let message = format!(
                    "⚠ Not installing {count} update(s): no terminal to confirm, rerun with --yes"
                );
                println!("{}", message.yellow());
                return Ok(false);
            }
            InteractionMode::Prompt => {}
        }

        loop {
            let prompt = format!("Update {count} packages? [y/N]: ");
            match self.ask(&prompt)? {
                Some(Decision::Yes) | Some(Decision::All) => return Ok(true),
                Some(Decision::No) | Some(Decision::Quit) => return Ok(false),
                None => println!("{}", "Please answer with y(es) or n(o).".red()),
            }
        }
    }

    fn ask(&mut self, prompt: &str) -> Result<Option<Decision>> {
        print!("{}", prompt.bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            // EOF on stdin
            return Ok(Some(Decision::Quit));
        }
        Ok(parse_decision(&line))
    }
}
