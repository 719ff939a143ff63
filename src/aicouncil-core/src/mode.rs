//! Operation modes and the process-wide current mode.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CouncilError;

/// How the council answers a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// All backends answer concurrently, each blind to the others.
    #[default]
    Compare,
    /// Backends answer in turn, each seeing every prior reply.
    Debate,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Compare => "compare",
            Mode::Debate => "debate",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Mode::Compare => "Compare Mode: All AI models respond concurrently",
            Mode::Debate => "Debate Mode: AI models respond sequentially",
        }
    }

    /// Whether backends are hidden from each other's replies.
    pub fn isolates_backends(&self) -> bool {
        matches!(self, Mode::Compare)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = CouncilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compare" => Ok(Mode::Compare),
            "debate" => Ok(Mode::Debate),
            _ => Err(CouncilError::InvalidMode(s.to_string())),
        }
    }
}

/// The global current mode.
///
/// Set once at startup from configuration, changed only through
/// [`ModeState::set`], and read at the start of every run. Reads never
/// block writers and may happen from any number of in-flight runs.
#[derive(Debug)]
pub struct ModeState {
    current: ArcSwap<Mode>,
}

impl ModeState {
    pub fn new(initial: Mode) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    pub fn get(&self) -> Mode {
        **self.current.load()
    }

    pub fn set(&self, mode: Mode) {
        self.current.store(Arc::new(mode));
    }
}

impl Default for ModeState {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}

static INLINE_MODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)mode=(\S+)").expect("inline mode pattern is valid")
});

/// Pull a one-off `mode=<value>` token out of a user's message.
///
/// Returns the raw override value (unvalidated; the orchestrator rejects
/// unknown values) and the text with the token removed.
pub fn extract_inline_mode(text: &str) -> (Option<String>, String) {
    let Some(caps) = INLINE_MODE.captures(text) else {
        return (None, text.trim().to_string());
    };
    let value = caps[1].to_string();
    let stripped = INLINE_MODE.replace(text, " ");
    let cleaned = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    (Some(value), cleaned)
}

/// A `/mode` command typed into a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeCommand {
    Set(Mode),
    Status,
}

impl ModeCommand {
    pub fn is_mode_command(text: &str) -> bool {
        text.split_whitespace()
            .next()
            .is_some_and(|command| command.eq_ignore_ascii_case("/mode"))
    }

    /// Parse `/mode compare`, `/mode debate` or `/mode status`.
    ///
    /// `Ok(None)` means the text is not a mode command at all.
    pub fn parse(text: &str) -> Result<Option<Self>, CouncilError> {
        if !Self::is_mode_command(text) {
            return Ok(None);
        }
        let mut parts = text.split_whitespace().skip(1);
        match parts.next() {
            Some(arg) if arg.eq_ignore_ascii_case("status") => Ok(Some(ModeCommand::Status)),
            Some(arg) => arg.parse().map(|mode| Some(ModeCommand::Set(mode))),
            None => Ok(Some(ModeCommand::Status)),
        }
    }
}
