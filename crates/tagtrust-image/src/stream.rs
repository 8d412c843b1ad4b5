//! Newline-delimited JSON progress stream decoding

use crate::traits::{AuxHandler, StreamDisplay};
use crate::types::{EventStream, JsonMessage};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::io::Write;
use tracing::{debug, trace};

/// Renders progress streams as plain `id: status progress` lines
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonStreamDisplay;

impl JsonStreamDisplay {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamDisplay for JsonStreamDisplay {
    async fn display(
        &self,
        mut stream: EventStream,
        out: &mut (dyn Write + Send),
        mut aux: Option<&mut dyn AuxHandler>,
    ) -> Result<()> {
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read progress stream")?;
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Some(message) = decode_line(&line) {
                    render(message, out, &mut aux)?;
                }
            }
        }

        // Trailing message without a newline
        if let Some(message) = decode_line(&buffer) {
            render(message, out, &mut aux)?;
        }

        out.flush().context("Failed to flush progress output")?;
        Ok(())
    }
}

fn decode_line(line: &[u8]) -> Option<JsonMessage> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<JsonMessage>(text) {
        Ok(message) => {
            trace!("Progress message: {:?}", message);
            Some(message)
        }
        Err(e) => {
            debug!("Skipping undecodable progress line: {}", e);
            None
        }
    }
}

fn render(
    message: JsonMessage,
    out: &mut (dyn Write + Send),
    aux: &mut Option<&mut dyn AuxHandler>,
) -> Result<()> {
    if let Some(error) = message.error_message() {
        return Err(anyhow!(error));
    }

    if message.aux.is_some() {
        if let Some(handler) = aux.as_mut() {
            handler.handle(&message);
        }
        return Ok(());
    }

    if let Some(text) = &message.stream {
        write!(out, "{}", text)?;
        return Ok(());
    }

    let mut line = String::new();
    if let Some(id) = &message.id {
        line.push_str(id);
        line.push_str(": ");
    }
    if let Some(status) = &message.status {
        line.push_str(status);
    }
    if let Some(progress) = message.progress.as_deref().filter(|p| !p.is_empty()) {
        line.push(' ');
        line.push_str(progress);
    }
    if !line.is_empty() {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}
