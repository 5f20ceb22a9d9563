//! Drag-and-drop affordance
//!
//! Drag enter/leave events arrive once per nested element, so visibility is
//! tracked with a depth counter rather than a flag.

/// MIME type accepted on drop
pub const JSON_MIME: &str = "application/json";

/// What is being dragged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    /// One or more files
    File,
    /// Text, links, anything else
    Other,
}

/// Payload of a completed drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedFile {
    /// Reported MIME type
    pub mime: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl DroppedFile {
    /// Create payload
    #[must_use]
    pub fn new(mime: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Check if the payload is declared as JSON
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mime
            .split(';')
            .next()
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(JSON_MIME))
    }
}

/// Nesting-aware drop target state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropZone {
    depth: usize,
    visible: bool,
}

impl DropZone {
    /// Create hidden drop zone
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the "drop here" affordance is shown
    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Current nesting depth
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Pointer entered an element while dragging
    pub fn drag_enter(&mut self, kind: DragKind) {
        self.depth += 1;
        if kind == DragKind::File {
            self.visible = true;
        }
    }

    /// Pointer left an element while dragging
    pub fn drag_leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.visible = false;
        }
    }

    /// Drop finished; returns the bytes to import, or `None` for non-JSON
    pub fn drop(&mut self, payload: DroppedFile) -> Option<Vec<u8>> {
        self.depth = 0;
        self.visible = false;
        if payload.is_json() {
            Some(payload.bytes)
        } else {
            tracing::debug!("Ignoring drop of type '{}'", payload.mime);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_enter_leave_keeps_visible_until_outermost() {
        let mut zone = DropZone::new();
        zone.drag_enter(DragKind::File);
        zone.drag_enter(DragKind::File);
        zone.drag_leave();
        assert!(zone.is_visible());
        zone.drag_leave();
        assert!(!zone.is_visible());
        assert_eq!(zone.depth(), 0);
    }

    #[test]
    fn non_file_drag_does_not_show() {
        let mut zone = DropZone::new();
        zone.drag_enter(DragKind::Other);
        assert!(!zone.is_visible());
    }

    #[test]
    fn extra_leave_does_not_underflow() {
        let mut zone = DropZone::new();
        zone.drag_leave();
        assert_eq!(zone.depth(), 0);
    }

    #[test]
    fn drop_filters_on_mime_and_resets() {
        let mut zone = DropZone::new();
        zone.drag_enter(DragKind::File);
        zone.drag_enter(DragKind::File);
        assert_eq!(zone.drop(DroppedFile::new("text/plain", b"x".to_vec())), None);
        assert_eq!(zone.depth(), 0);
        assert!(!zone.is_visible());

        let bytes = zone.drop(DroppedFile::new("application/json; charset=utf-8", b"{}".to_vec()));
        assert_eq!(bytes.as_deref(), Some(&b"{}"[..]));
    }
}
