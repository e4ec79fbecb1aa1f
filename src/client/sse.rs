//! Incremental parser for text/event-stream framing.

/// A parsed event frame: name plus raw data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Parse the next complete frame out of the buffer, draining what was
/// consumed. Returns `None` when no complete frame (terminated by a blank
/// line) is buffered yet. Comment-only frames — the server's heartbeats —
/// are consumed and skipped.
pub fn parse_sse_frame(buffer: &mut String) -> Option<SseFrame> {
    loop {
        let frame_end = buffer.find("\n\n")?;
        let frame_str = buffer[..frame_end].to_string();
        buffer.drain(..frame_end + 2);

        let mut event = String::new();
        let mut data = String::new();

        for line in frame_str.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                event = rest.trim_start().to_string();
            } else if let Some(rest) = line.strip_prefix("data:") {
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
            }
            // Lines starting with ':' are comments and carry nothing.
        }

        if event.is_empty() && data.is_empty() {
            continue;
        }
        return Some(SseFrame { event, data });
    }
}
