use serde::Serialize;

use crate::frame::Frame;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NoticeId(pub u64);

/// A dismissible, user-facing notice.
///
/// `source` names the subsystem that raised it (for layers, the layer name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: NoticeId,
    pub frame_index: u64,
    pub severity: Severity,
    pub source: &'static str,
    pub message: String,
}

/// Queue of notices waiting to be shown to the user.
///
/// Notices stay pending until the UI dismisses them.
#[derive(Debug, Default)]
pub struct EventBus {
    next_id: u64,
    frame_index: u64,
    pending: Vec<Notice>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices emitted after this call are stamped with `frame`.
    pub fn set_frame(&mut self, frame: Frame) {
        self.frame_index = frame.index;
    }

    pub fn emit(
        &mut self,
        severity: Severity,
        source: &'static str,
        message: impl Into<String>,
    ) -> NoticeId {
        let id = NoticeId(self.next_id);
        self.next_id += 1;
        let message = message.into();
        tracing::debug!(source, ?severity, "notice {}: {message}", id.0);
        self.pending.push(Notice {
            id,
            frame_index: self.frame_index,
            severity,
            source,
            message,
        });
        id
    }

    pub fn notices(&self) -> &[Notice] {
        &self.pending
    }

    /// Returns false if the notice was already dismissed.
    pub fn dismiss(&mut self, id: NoticeId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|n| n.id != id);
        self.pending.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBus, Severity};
    use crate::frame::Frame;
    use pretty_assertions::assert_eq;

    #[test]
    fn records_notices_with_frame_index() {
        let mut bus = EventBus::new();
        bus.set_frame(Frame::new(2));
        bus.emit(Severity::Warning, "test", "hello");
        assert_eq!(bus.notices().len(), 1);
        assert_eq!(bus.notices()[0].frame_index, 2);
        assert_eq!(bus.notices()[0].message, "hello");
    }

    #[test]
    fn dismiss_removes_only_that_notice() {
        let mut bus = EventBus::new();
        let a = bus.emit(Severity::Error, "earthquakes", "fetch failed");
        let b = bus.emit(Severity::Warning, "volcanoes", "empty");
        assert!(bus.dismiss(a));
        assert!(!bus.dismiss(a));
        assert_eq!(bus.notices().len(), 1);
        assert_eq!(bus.notices()[0].id, b);
    }
}
