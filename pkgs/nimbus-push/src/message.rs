//! Push payload mapping

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{PushError, Result};

pub const TYPE_KEY: &str = "type";

const CHAT_TYPE: &str = "2";
const CALL_TYPE: &str = "4";
const SCHEDULED_MEETING_TYPE: &str = "7";
const PROMO_TYPE: &str = "8";

/// Inbound push, one variant per kind of notification it leads to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PushMessage {
    Call {
        chat_id: u64,
    },
    Chat {
        chat_id: u64,
        message_id: u64,
        silent: bool,
    },
    ScheduledMeeting {
        chat_id: u64,
        scheduled_meeting_id: u64,
        title: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    Promo {
        id: u64,
        title: String,
        description: String,
        redirect_link: Option<String>,
    },
}

impl PushMessage {
    /// Map the raw key/value payload delivered by the push service
    pub fn from_payload(payload: &HashMap<String, String>) -> Result<Self> {
        let fields = Fields(payload);
        match payload.get(TYPE_KEY).map(String::as_str) {
            Some(CHAT_TYPE) => Ok(PushMessage::Chat {
                chat_id: fields.parse("chatid")?,
                message_id: fields.parse("msgid")?,
                silent: fields.flag("silent"),
            }),
            Some(CALL_TYPE) => Ok(PushMessage::Call {
                chat_id: fields.parse("chatid")?,
            }),
            Some(SCHEDULED_MEETING_TYPE) => Ok(PushMessage::ScheduledMeeting {
                chat_id: fields.parse("chatid")?,
                scheduled_meeting_id: fields.parse("schedid")?,
                title: fields.required("title")?.to_string(),
                start: fields.timestamp("start")?,
                end: fields.timestamp("end")?,
            }),
            Some(PROMO_TYPE) => Ok(PushMessage::Promo {
                id: fields.parse("id")?,
                title: fields.required("title")?.to_string(),
                description: fields.optional("description").unwrap_or_default().to_string(),
                redirect_link: fields.optional("link").map(str::to_string),
            }),
            other => Err(PushError::UnknownPushType(other.map(str::to_string))),
        }
    }

    pub fn chat_id(&self) -> Option<u64> {
        match self {
            PushMessage::Call { chat_id }
            | PushMessage::Chat { chat_id, .. }
            | PushMessage::ScheduledMeeting { chat_id, .. } => Some(*chat_id),
            PushMessage::Promo { .. } => None,
        }
    }
}

struct Fields<'a>(&'a HashMap<String, String>);

impl<'a> Fields<'a> {
    fn optional(&self, field: &'static str) -> Option<&'a str> {
        self.0
            .get(field)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    fn required(&self, field: &'static str) -> Result<&'a str> {
        self.optional(field).ok_or(PushError::MissingField(field))
    }

    fn parse<T: FromStr>(&self, field: &'static str) -> Result<T> {
        let value = self.required(field)?;
        value.parse().map_err(|_| PushError::InvalidField {
            field,
            value: value.to_string(),
        })
    }

    fn flag(&self, field: &'static str) -> bool {
        matches!(self.optional(field), Some("1") | Some("true"))
    }

    /// Seconds since the epoch
    fn timestamp(&self, field: &'static str) -> Result<DateTime<Utc>> {
        let seconds: i64 = self.parse(field)?;
        Utc.timestamp_opt(seconds, 0)
            .single()
            .ok_or(PushError::InvalidField {
                field,
                value: seconds.to_string(),
            })
    }
}
