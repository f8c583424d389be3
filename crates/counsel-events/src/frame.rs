//! Wire frames and their SSE rendering (§6).

use crate::event::EventPayload;

/// One frame yielded to a subscriber: either a data frame carrying an
/// [`EventPayload`] with a monotonic identifier, or a heartbeat with no
/// identifier (and therefore never persisted in the replay window).
#[derive(Debug, Clone)]
pub enum Frame {
    Data { id: u64, payload: EventPayload },
    Heartbeat,
}

impl Frame {
    /// The event identifier, if this is a data frame.
    pub fn id(&self) -> Option<u64> {
        match self {
            Frame::Data { id, .. } => Some(*id),
            Frame::Heartbeat => None,
        }
    }

    /// Renders this frame as the three-line-plus-blank SSE wire format:
    /// `id:`, `event:`, `data:` for data frames, or a `:` comment line for
    /// heartbeats.
    pub fn to_sse_lines(&self) -> String {
        match self {
            Frame::Data { id, payload } => {
                let data = serde_json::to_string(payload).unwrap_or_else(|_| "null".to_string());
                format!("id: {id}\nevent: {}\ndata: {data}\n\n", payload.type_tag())
            }
            Frame::Heartbeat => ": heartbeat\n\n".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_frame_renders_three_fields() {
        let frame = Frame::Data { id: 7, payload: EventPayload::ConversationCancelled };
        let rendered = frame.to_sse_lines();
        assert!(rendered.starts_with("id: 7\n"));
        assert!(rendered.contains("event: conversation-cancelled\n"));
        assert!(rendered.contains("data: "));
        assert!(rendered.ends_with("\n\n"));
    }

    #[test]
    fn heartbeat_renders_as_comment_with_no_id() {
        let frame = Frame::Heartbeat;
        assert_eq!(frame.id(), None);
        assert!(frame.to_sse_lines().starts_with(':'));
    }
}
