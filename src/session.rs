//! src/session.rs
//! Interactive prompts. A `Session` is opened for the phases that need the
//! user and restores the terminal when it goes out of scope.

use anyhow::Result;
use console::Term;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};

pub struct Session {
    term: Term,
    theme: ColorfulTheme,
}

impl Session {
    pub fn open() -> Self {
        Self {
            term: Term::stderr(),
            theme: ColorfulTheme::default(),
        }
    }

    pub fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text_on(&self.term)?.trim().to_string())
    }

    /// Like `input`, but keeps asking until the answer is non-empty.
    pub fn required(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        loop {
            let answer = self.input(prompt, default)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            self.term.write_line("A value is required.")?;
        }
    }

    pub fn secret(&mut self, prompt: &str) -> Result<String> {
        let value = Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_on(&self.term)?;
        Ok(value.trim().to_string())
    }

    pub fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact_on(&self.term)?)
    }

    pub fn select<T: ToString>(&mut self, prompt: &str, items: &[T], default: usize) -> Result<usize> {
        Ok(Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact_on(&self.term)?)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // dialoguer 可能在中断时隐藏光标
        let _ = self.term.show_cursor();
        let _ = self.term.flush();
    }
}
