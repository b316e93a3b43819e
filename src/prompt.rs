//! Operator interaction: line prompts, masked input and the system browser.
//!
//! The sign-in flow only talks to these traits so it can run against a
//! terminal in the binary and against scripted answers in tests.

use std::io;

/// Blocking line prompts.
pub trait Prompter {
    /// Ask for one line of input. Multi-line prompts show every line but the
    /// last as context and the last as the question.
    fn ask(&mut self, prompt: &str) -> io::Result<String>;

    /// Ask for one line of input without echoing it.
    fn ask_masked(&mut self, prompt: &str) -> io::Result<String>;

    /// Show a message to the operator.
    fn say(&mut self, message: &str);
}

/// Launches URLs in the operator's browser.
pub trait Browser {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Terminal prompts backed by `dialoguer`.
#[cfg(feature = "cli")]
pub struct TerminalPrompter {
    theme: dialoguer::theme::ColorfulTheme,
}

#[cfg(feature = "cli")]
impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: dialoguer::theme::ColorfulTheme::default(),
        }
    }
}

#[cfg(feature = "cli")]
impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "cli")]
impl Prompter for TerminalPrompter {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        let question = print_preamble(prompt);
        dialoguer::Input::<String>::with_theme(&self.theme)
            .with_prompt(question)
            .allow_empty(true)
            .interact_text()
            .map_err(io::Error::other)
    }

    fn ask_masked(&mut self, prompt: &str) -> io::Result<String> {
        let question = print_preamble(prompt);
        dialoguer::Password::with_theme(&self.theme)
            .with_prompt(question)
            .interact()
            .map_err(io::Error::other)
    }

    fn say(&mut self, message: &str) {
        println!("{message}");
    }
}

/// Print all but the last line of `prompt` and return the last line.
#[cfg(feature = "cli")]
fn print_preamble(prompt: &str) -> &str {
    let prompt = prompt.trim_end();
    match prompt.rsplit_once('\n') {
        Some((preamble, question)) => {
            println!("{preamble}");
            question.trim_end_matches([':', ' '])
        }
        None => prompt.trim_end_matches([':', ' ']),
    }
}

/// Opens URLs with the platform's default handler.
#[cfg(feature = "cli")]
pub struct SystemBrowser;

#[cfg(feature = "cli")]
impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        open::that(url)
    }
}

/// Prompter answering from a fixed script, recording what was asked.
#[cfg(test)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<String>,
    prompts: Vec<String>,
    messages: Vec<String>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    fn next(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        self.next(prompt)
    }

    fn ask_masked(&mut self, prompt: &str) -> io::Result<String> {
        self.next(prompt)
    }

    fn say(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

/// Browser that records URLs and optionally fails to launch.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingBrowser {
    pub fail: bool,
    pub opened: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl Browser for RecordingBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(url.to_string());
        }
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no browser available"));
        }
        Ok(())
    }
}
