//! Types exchanged with the remote assistant (generation + analysis) service.

use serde::{Deserialize, Serialize};

/// A generated reply, with an optional follow-up question and quick-reply options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedReply {
    pub reply: String,
    pub follow_up: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

impl GeneratedReply {
    /// Separator between reply, follow-up and option list in the wire form.
    pub const FIELD_SEPARATOR: &'static str = "|||";
    /// Separator between individual options.
    pub const OPTION_SEPARATOR: char = '|';

    /// A plain reply with no follow-up.
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            follow_up: None,
            options: Vec::new(),
        }
    }

    /// Parse the delimited wire form `reply|||follow-up|||opt1|opt2`.
    ///
    /// Missing segments are simply absent. A blank follow-up is treated as none,
    /// and options are only kept alongside a follow-up question.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(Self::FIELD_SEPARATOR);
        let reply = parts.next().unwrap_or_default().trim().to_string();
        let follow_up = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let options = match (&follow_up, parts.next()) {
            (Some(_), Some(list)) => list
                .split(Self::OPTION_SEPARATOR)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };
        Self {
            reply,
            follow_up,
            options,
        }
    }
}
