//! Turning an operator command into an immutable delivery request

use crate::{
    error::BroadcastError,
    types::{ChatId, MessageId, MessageRef, Payload, PinMode},
};

const PIN_LOUD: &str = "-pinloud";
const PIN: &str = "-pin";
const IDENTITIES: &str = "-assistant";
const USERS: &str = "-user";
const NO_PRIMARY: &str = "-nobot";

/// A broadcast command as handed over by the command layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastCommand {
    /// Chat the command was issued in
    pub chat_id: ChatId,
    /// Message the command replied to, if any
    pub reply_to: Option<MessageId>,
    /// Everything after the command word
    pub arguments: Option<String>,
}

/// Which destination classes a run covers, and how it pins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct TargetFlags {
    pub pin_silent: bool,
    pub pin_loud: bool,
    pub include_secondary_users: bool,
    pub include_secondary_identities: bool,
    pub exclude_primary_chats: bool,
}

impl TargetFlags {
    /// Silent pinning wins when both pin flags are given.
    #[must_use]
    pub const fn pin_mode(&self) -> Option<PinMode> {
        if self.pin_silent {
            Some(PinMode::Silent)
        } else if self.pin_loud {
            Some(PinMode::Loud)
        } else {
            None
        }
    }

    /// Strip every flag token out of `raw`, returning the flags and the trimmed remainder.
    ///
    /// `-pinloud` is stripped before `-pin` so the longer token is never
    /// half-consumed.
    #[must_use]
    pub fn parse(raw: &str) -> (Self, String) {
        let mut text = raw.to_string();
        let mut flags = Self::default();

        let mut take = |token: &str| {
            let found = text.contains(token);
            if found {
                text = text.replace(token, "");
            }
            found
        };

        flags.pin_loud = take(PIN_LOUD);
        flags.pin_silent = take(PIN);
        flags.include_secondary_identities = take(IDENTITIES);
        flags.include_secondary_users = take(USERS);
        flags.exclude_primary_chats = take(NO_PRIMARY);

        (flags, text.trim().to_string())
    }
}

/// What to deliver and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    payload: Payload,
    flags: TargetFlags,
}

impl DeliveryRequest {
    /// Build the request for a command.
    ///
    /// A reply forwards the replied-to message and carries no flags. Otherwise
    /// the argument text is parsed for flags and what remains is sent as text.
    pub fn from_command(command: &BroadcastCommand) -> Result<Self, BroadcastError> {
        if let Some(message_id) = command.reply_to {
            return Ok(Self {
                payload: Payload::Forward(MessageRef {
                    chat_id: command.chat_id,
                    message_id,
                }),
                flags: TargetFlags::default(),
            });
        }

        let raw = command
            .arguments
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .ok_or(BroadcastError::MissingPayload)?;

        let (flags, text) = TargetFlags::parse(raw);
        if text.is_empty() {
            return Err(BroadcastError::EmptyText);
        }

        Ok(Self {
            payload: Payload::Text(text),
            flags,
        })
    }

    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    #[must_use]
    pub const fn flags(&self) -> TargetFlags {
        self.flags
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn text_command(arguments: &str) -> BroadcastCommand {
        BroadcastCommand {
            chat_id: -100,
            reply_to: None,
            arguments: Some(arguments.to_string()),
        }
    }

    #[test]
    fn test_plain_text() {
        let request = DeliveryRequest::from_command(&text_command("hello")).unwrap();
        assert_eq!(request.payload(), &Payload::Text("hello".to_string()));
        assert_eq!(request.flags(), TargetFlags::default());
        assert_eq!(request.flags().pin_mode(), None);
    }

    #[test]
    fn test_pinloud_is_not_read_as_pin() {
        let (flags, text) = TargetFlags::parse("news -pinloud");
        assert!(flags.pin_loud);
        assert!(!flags.pin_silent);
        assert_eq!(flags.pin_mode(), Some(PinMode::Loud));
        assert_eq!(text, "news");
    }

    #[test]
    fn test_silent_pin_wins() {
        let (flags, _) = TargetFlags::parse("-pin -pinloud news");
        assert_eq!(flags.pin_mode(), Some(PinMode::Silent));
    }

    #[test]
    fn test_all_flags() {
        let (flags, text) = TargetFlags::parse("-user -assistant -nobot big update -pin");
        assert_eq!(
            flags,
            TargetFlags {
                pin_silent: true,
                pin_loud: false,
                include_secondary_users: true,
                include_secondary_identities: true,
                exclude_primary_chats: true,
            }
        );
        assert_eq!(text, "big update");
    }

    #[test]
    fn test_reply_forwards_without_flags() {
        let command = BroadcastCommand {
            chat_id: -42,
            reply_to: Some(7),
            arguments: Some("-user -pin".to_string()),
        };
        let request = DeliveryRequest::from_command(&command).unwrap();
        assert_eq!(
            request.payload(),
            &Payload::Forward(MessageRef {
                chat_id: -42,
                message_id: 7
            })
        );
        assert_eq!(request.flags(), TargetFlags::default());
    }

    #[test]
    fn test_missing_payload() {
        let command = BroadcastCommand {
            chat_id: 1,
            reply_to: None,
            arguments: None,
        };
        assert_eq!(
            DeliveryRequest::from_command(&command),
            Err(BroadcastError::MissingPayload)
        );
        assert_eq!(
            DeliveryRequest::from_command(&text_command("   ")),
            Err(BroadcastError::MissingPayload)
        );
    }

    #[test]
    fn test_only_flags_is_empty_text() {
        assert_eq!(
            DeliveryRequest::from_command(&text_command("-pin -user")),
            Err(BroadcastError::EmptyText)
        );
    }
}
