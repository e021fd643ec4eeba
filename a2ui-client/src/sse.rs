//! Line-oriented, stateful SSE parsing.
//!
//! Bytes accumulate across chunk boundaries until a blank line completes an
//! event. `\r`, `\n` and `\r\n` all terminate lines; a trailing `\r` is held
//! back until the next chunk decides whether it starts a `\r\n` pair.

/// One complete server-sent event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SseEvent {
    /// Last seen event id (sticky across events, per the SSE grammar).
    pub id: Option<String>,
    pub event: Option<String>,
    /// Consecutive `data:` lines joined with `\n`.
    pub data: String,
    /// `retry:` value carried by this event, if any.
    pub retry: Option<u64>,
}

#[derive(Default)]
struct PendingEvent {
    event: Option<String>,
    data_lines: Vec<String>,
    retry: Option<u64>,
}

impl PendingEvent {
    fn is_empty(&self) -> bool {
        self.event.is_none() && self.data_lines.is_empty() && self.retry.is_none()
    }
}

/// Incremental SSE parser.
#[derive(Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    pending: PendingEvent,
    last_id: Option<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some((line, consumed)) = next_line(&self.buffer) {
            self.buffer.drain(..consumed);
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            // comment line
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.pending.data_lines.push(value.to_string()),
            "id" => {
                // NUL in an id is invalid per the SSE grammar.
                if !value.contains('\0') {
                    self.last_id = Some(value.to_string());
                }
            }
            "event" => self.pending.event = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.trim().parse::<u64>() {
                    self.pending.retry = Some(ms);
                }
            }
            _ => {} // unknown fields are ignored
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.pending.is_empty() {
            return None;
        }
        let pending = std::mem::take(&mut self.pending);
        Some(SseEvent {
            id: self.last_id.clone(),
            event: pending.event,
            data: pending.data_lines.join("\n"),
            retry: pending.retry,
        })
    }
}

/// Extract the next complete line. A bare trailing `\r` is not consumed: the
/// next chunk may complete a `\r\n` pair.
fn next_line(buffer: &[u8]) -> Option<(String, usize)> {
    for (i, byte) in buffer.iter().enumerate() {
        match byte {
            b'\n' => {
                return Some((String::from_utf8_lossy(&buffer[..i]).into_owned(), i + 1));
            }
            b'\r' => {
                if i + 1 == buffer.len() {
                    return None;
                }
                let consumed = if buffer[i + 1] == b'\n' { i + 2 } else { i + 1 };
                return Some((String::from_utf8_lossy(&buffer[..i]).into_owned(), consumed));
            }
            _ => {}
        }
    }
    None
}
