//! The ordered record of a conversation.
//!
//! A [`Transcript`] only grows.  The system message, if any, is placed at
//! construction and stays first; every later message is appended.  Nothing
//! evicts old messages, so a long conversation eventually exceeds the
//! model's context window and the provider rejects the request.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};

use crate::Error;
use crate::error::Result;
use crate::types::{Message, Role};

const TRANSCRIPT_VERSION: u8 = 1;

/// An append-only, ordered sequence of role-tagged messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transcript whose first message is the given system prompt.
    pub fn with_system(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
        }
    }

    /// Adds a message to the end.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The most recently appended message, or `None` for an empty transcript.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The full ordered sequence, as sent to the provider.
    pub fn as_list(&self) -> &[Message] {
        &self.messages
    }

    /// The system message, if the transcript was built with one.
    pub fn system(&self) -> Option<&Message> {
        self.messages.first().filter(|m| m.role == Role::System)
    }

    /// The number of messages, including the system message.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when nothing has been appended and there is no system message.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterates over the messages in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Saves the transcript to the specified path as pretty-printed JSON.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let transcript = TranscriptFile {
            version: TRANSCRIPT_VERSION,
            messages: self.messages.clone(),
        };
        let file = File::create(path.as_ref())
            .map_err(|err| Error::io("failed to create transcript file", err))?;
        let writer = BufWriter::new(file);
        to_writer_pretty(writer, &transcript).map_err(|err| {
            Error::serialization("failed to serialize transcript", Some(Box::new(err)))
        })
    }

    /// Loads a transcript previously written by [`Transcript::save_to`].
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .map_err(|err| Error::io("failed to open transcript file", err))?;
        let reader = BufReader::new(file);
        let transcript: TranscriptFile = from_reader(reader).map_err(|err| {
            Error::serialization("failed to parse transcript", Some(Box::new(err)))
        })?;
        if transcript.version != TRANSCRIPT_VERSION {
            return Err(Error::validation(
                format!("unsupported transcript version {}", transcript.version),
                Some("version".to_string()),
            ));
        }
        if transcript
            .messages
            .iter()
            .skip(1)
            .any(|m| m.role == Role::System)
        {
            return Err(Error::validation(
                "a system message may only appear first",
                Some("messages".to_string()),
            ));
        }
        Ok(Self {
            messages: transcript.messages,
        })
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Serialize, Deserialize)]
struct TranscriptFile {
    version: u8,
    messages: Vec<Message>,
}
