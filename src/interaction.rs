// Discord interaction envelope: inbound payload types and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;

pub const RESPONSE_PONG: u8 = 1;
pub const RESPONSE_CHANNEL_MESSAGE: u8 = 4;

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("malformed interaction: {0}")]
    Malformed(String),
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("unsupported interaction type {0}")]
    UnsupportedType(u8),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub member: Option<Member>,
    /// Set instead of `member` when the command is invoked in a DM.
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub data: Option<CommandData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    #[serde(default)]
    pub value: Option<Value>,
}

impl CommandOption {
    /// Option value as text; non-string scalars are rendered as JSON.
    pub fn text(&self) -> Option<String> {
        match &self.value {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

/// A slash command invocation with everything the dispatcher needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub user_id: String,
    pub command: String,
    /// First option's value, if any.
    pub argument: Option<String>,
}

/// What an inbound interaction asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Ping,
    Command(Invocation),
}

/// Parse and validate a raw interaction body.
pub fn parse(body: &[u8]) -> Result<Inbound, PayloadError> {
    let interaction: Interaction =
        serde_json::from_slice(body).map_err(|e| PayloadError::Malformed(e.to_string()))?;
    interaction.into_inbound()
}

impl Interaction {
    pub fn into_inbound(self) -> Result<Inbound, PayloadError> {
        match self.kind {
            INTERACTION_PING => Ok(Inbound::Ping),
            INTERACTION_APPLICATION_COMMAND => {
                let user_id = self
                    .member
                    .map(|m| m.user.id)
                    .or(self.user.map(|u| u.id))
                    .ok_or(PayloadError::MissingField("member.user.id"))?;
                let data = self.data.ok_or(PayloadError::MissingField("data"))?;
                let argument = data.options.first().and_then(CommandOption::text);
                Ok(Inbound::Command(Invocation {
                    user_id,
                    command: data.name,
                    argument,
                }))
            }
            other => Err(PayloadError::UnsupportedType(other)),
        }
    }
}

/// Body returned to Discord for an interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageData>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageData {
    pub content: String,
}

/// Response acknowledging a PING.
pub fn pong() -> InteractionResponse {
    InteractionResponse {
        kind: RESPONSE_PONG,
        data: None,
    }
}

/// Response posting `content` to the invoking channel.
pub fn channel_message(content: &str) -> InteractionResponse {
    InteractionResponse {
        kind: RESPONSE_CHANNEL_MESSAGE,
        data: Some(MessageData {
            content: content.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ping() {
        assert_eq!(parse(br#"{"type": 1}"#).unwrap(), Inbound::Ping);
    }

    #[test]
    fn test_parse_guild_command() {
        let body = br##"{
            "type": 2,
            "member": {"user": {"id": "80351110224678912", "username": "nelly"}},
            "data": {"name": "stats", "options": [{"name": "target", "type": 3, "value": "#ABC123"}]}
        }"##;
        assert_eq!(
            parse(body).unwrap(),
            Inbound::Command(Invocation {
                user_id: "80351110224678912".into(),
                command: "stats".into(),
                argument: Some("#ABC123".into()),
            })
        );
    }

    #[test]
    fn test_parse_dm_command_without_options() {
        let body = br#"{"type": 2, "user": {"id": "42"}, "data": {"name": "gains"}}"#;
        assert_eq!(
            parse(body).unwrap(),
            Inbound::Command(Invocation {
                user_id: "42".into(),
                command: "gains".into(),
                argument: None,
            })
        );
    }

    #[test]
    fn test_numeric_option_value() {
        let body = br#"{"type": 2, "user": {"id": "1"}, "data": {"name": "stats", "options": [{"name": "n", "value": 5}]}}"#;
        match parse(body).unwrap() {
            Inbound::Command(inv) => assert_eq!(inv.argument.as_deref(), Some("5")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(parse(b"not json"), Err(PayloadError::Malformed(_))));
        assert_eq!(
            parse(br#"{"type": 2, "data": {"name": "stats"}}"#),
            Err(PayloadError::MissingField("member.user.id"))
        );
        assert_eq!(
            parse(br#"{"type": 2, "user": {"id": "1"}}"#),
            Err(PayloadError::MissingField("data"))
        );
        assert_eq!(
            parse(br#"{"type": 3, "user": {"id": "1"}}"#),
            Err(PayloadError::UnsupportedType(3))
        );
    }

    #[test]
    fn test_response_bodies() {
        assert_eq!(serde_json::to_value(pong()).unwrap(), json!({"type": 1}));
        assert_eq!(
            serde_json::to_value(channel_message("hello")).unwrap(),
            json!({"type": 4, "data": {"content": "hello"}})
        );
    }
}
