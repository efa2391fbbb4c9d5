// src/ask/terminal.rs

//! Terminal prompts

use super::{AskPolicy, EquivalentChoice, SuggestsChoice};
use crate::package::{CapReq, Package};
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Prompts on stdout and reads answers from stdin
///
/// A read failure (closed stdin) answers with the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalAsk;

impl TerminalAsk {
    pub fn new() -> Self {
        Self
    }

    fn read_answer(&self, prompt: &str) -> Option<String> {
        let mut stdout = io::stdout();
        if write!(stdout, "{}", prompt).and_then(|_| stdout.flush()).is_err() {
            return None;
        }

        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(0) => None,
            Ok(_) => Some(input.trim().to_lowercase()),
            Err(e) => {
                warn!("Failed to read answer: {}", e);
                None
            }
        }
    }
}

/// Parse a yes/no answer; empty means the default
pub(crate) fn parse_confirm(answer: &str, default: bool) -> Option<bool> {
    match answer {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a 1-based choice; empty means the default, `q` aborts
pub(crate) fn parse_choice(answer: &str, count: usize, default: usize) -> Option<EquivalentChoice> {
    match answer {
        "" => Some(EquivalentChoice::Chosen(default)),
        "q" | "quit" => Some(EquivalentChoice::Abort),
        n => match n.parse::<usize>() {
            Ok(n) if n >= 1 && n <= count => Some(EquivalentChoice::Chosen(n - 1)),
            _ => None,
        },
    }
}

/// Parse `a`, `n`, or a space/comma separated list of 1-based indexes
pub(crate) fn parse_suggests(answer: &str, count: usize) -> Option<SuggestsChoice> {
    match answer {
        "a" | "all" | "y" | "yes" => Some(SuggestsChoice::All),
        "" | "n" | "no" | "none" => Some(SuggestsChoice::None),
        list => {
            let mut picked = Vec::new();
            for part in list.split([',', ' ']).filter(|s| !s.is_empty()) {
                match part.parse::<usize>() {
                    Ok(n) if n >= 1 && n <= count => picked.push(n - 1),
                    _ => return None,
                }
            }
            picked.sort_unstable();
            picked.dedup();
            Some(SuggestsChoice::Subset(picked))
        }
    }
}

impl AskPolicy for TerminalAsk {
    fn confirm(&self, question: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let Some(answer) = self.read_answer(&format!("{} {} ", question, hint)) else {
                return default;
            };
            if let Some(yes) = parse_confirm(&answer, default) {
                return yes;
            }
            println!("Please answer y or n.");
        }
    }

    fn choose_equivalent(
        &self,
        req: &CapReq,
        candidates: &[&Package],
        default_index: usize,
    ) -> EquivalentChoice {
        println!("There are {} package(s) providing \"{}\":", candidates.len(), req);
        for (i, pkg) in candidates.iter().enumerate() {
            let marker = if i == default_index { "*" } else { " " };
            println!(" {}{}) {}", marker, i + 1, pkg);
        }

        loop {
            let prompt = format!("Which one do you want to install ('q' to abort)? [{}] ", default_index + 1);
            let Some(answer) = self.read_answer(&prompt) else {
                return EquivalentChoice::Chosen(default_index);
            };
            if let Some(choice) = parse_choice(&answer, candidates.len(), default_index) {
                return choice;
            }
            println!("Please pick a number between 1 and {}.", candidates.len());
        }
    }

    fn choose_suggests(&self, pkg: &Package, suggested: &[&Package]) -> SuggestsChoice {
        println!("Package {} suggests installation of:", pkg);
        for (i, s) in suggested.iter().enumerate() {
            println!("  {}) {}", i + 1, s);
        }

        loop {
            let Some(answer) = self.read_answer("Install them? [a]ll, [N]one or numbers: ") else {
                return SuggestsChoice::None;
            };
            if let Some(choice) = parse_suggests(&answer, suggested.len()) {
                return choice;
            }
            println!("Please answer a, n, or a list of numbers.");
        }
    }
}
