//! Output message stream.
//!
//! The tap speaks the Singer line protocol: one JSON object per line, tagged
//! `SCHEMA`, `RECORD` or `STATE`. A `STATE` message is the durability point
//! of a run, so sinks flush right after writing one.

use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::report::Record;
use crate::sync::RunState;

/// One line of the output stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Message {
    Schema {
        stream: String,
        schema: Value,
        key_properties: Vec<String>,
    },
    Record {
        stream: String,
        record: Record,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_extracted: Option<String>,
    },
    State {
        value: RunState,
    },
}

/// Destination for the message stream.
pub trait MessageSink {
    /// Writes one message. Implementations must preserve ordering.
    fn write_message(&mut self, message: &Message) -> Result<()>;

    /// Makes everything written so far durable.
    fn flush(&mut self) -> Result<()>;

    fn write_schema(&mut self, stream: &str, schema: &Value, key_properties: &[String]) -> Result<()> {
        self.write_message(&Message::Schema {
            stream: stream.to_string(),
            schema: schema.clone(),
            key_properties: key_properties.to_vec(),
        })
    }

    fn write_record(&mut self, stream: &str, record: Record, time_extracted: &str) -> Result<()> {
        self.write_message(&Message::Record {
            stream: stream.to_string(),
            record,
            time_extracted: Some(time_extracted.to_string()),
        })
    }

    /// Writes the whole run state and flushes.
    fn write_state(&mut self, state: &RunState) -> Result<()> {
        self.write_message(&Message::State {
            value: state.clone(),
        })?;
        self.flush()
    }
}

/// Writes JSON lines to any [`Write`] implementation.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<std::io::Stdout> {
    /// Sink over the process's standard output.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> MessageSink for WriterSink<W> {
    fn write_message(&mut self, message: &Message) -> Result<()> {
        serde_json::to_writer(&mut self.writer, message)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects messages in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    messages: Vec<Message>,
    flushes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of times `flush` was called.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn schemas(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|message| match message {
                Message::Schema { stream, .. } => Some(stream.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn records(&self) -> Vec<&Record> {
        self.messages
            .iter()
            .filter_map(|message| match message {
                Message::Record { record, .. } => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn states(&self) -> Vec<&RunState> {
        self.messages
            .iter()
            .filter_map(|message| match message {
                Message::State { value } => Some(value),
                _ => None,
            })
            .collect()
    }
}

impl MessageSink for MemorySink {
    fn write_message(&mut self, message: &Message) -> Result<()> {
        self.messages.push(message.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
