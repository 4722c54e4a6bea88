use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use tracing::info;

/// Receives the browser-side effects of event handlers.
pub trait Host: Send + Sync {
    fn alert(&self, message: &str);
    fn confirm(&self, message: &str) -> bool;
    fn navigate(&self, url: &str);
    fn reload(&self);
}

/// What a handler ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Navigated(String),
    /// Request succeeded and the page stays as it is.
    Stayed,
    Reloaded,
    Alerted(String),
    /// The user declined the confirmation; nothing was sent.
    Cancelled,
}

impl Outcome {
    pub fn apply(&self, host: &dyn Host) {
        match self {
            Self::Navigated(url) => host.navigate(url),
            Self::Reloaded => host.reload(),
            Self::Alerted(message) => host.alert(message),
            Self::Stayed | Self::Cancelled => {}
        }
    }
}

/// Terminal host for the CLI.
pub struct ConsoleHost {
    assume_yes: bool,
}

impl ConsoleHost {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Host for ConsoleHost {
    fn alert(&self, message: &str) {
        println!("⚠️  {}", message);
    }

    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            info!(message, "confirmation assumed");
            return true;
        }
        print!("{} [y/N] ", message);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }

    fn navigate(&self, url: &str) {
        println!("➡️  {}", url);
    }

    fn reload(&self) {
        println!("🔄 reload");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Alert(String),
    Confirm(String),
    Navigate(String),
    Reload,
}

/// Records every effect and answers confirmations with a fixed reply.
pub struct RecordingHost {
    confirm_reply: bool,
    effects: Mutex<Vec<Effect>>,
}

impl RecordingHost {
    pub fn new(confirm_reply: bool) -> Self {
        Self {
            confirm_reply,
            effects: Mutex::new(Vec::new()),
        }
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.effects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, effect: Effect) {
        self.effects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(effect);
    }
}

impl Host for RecordingHost {
    fn alert(&self, message: &str) {
        self.record(Effect::Alert(message.to_string()));
    }

    fn confirm(&self, message: &str) -> bool {
        self.record(Effect::Confirm(message.to_string()));
        self.confirm_reply
    }

    fn navigate(&self, url: &str) {
        self.record(Effect::Navigate(url.to_string()));
    }

    fn reload(&self) {
        self.record(Effect::Reload);
    }
}
