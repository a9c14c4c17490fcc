//! Text-editing surfaces.
//!
//! A surface holds one text value plus the annotations currently attached to it, and notifies
//! subscribers after every content mutation. Annotation changes are derived state: they never
//! bump the content version and never notify subscribers.
//!
//! [`BufferSurface`] is the in-memory implementation used by front-ends and tests. Positions are
//! Unicode scalar values (`char`) throughout.

use crate::diagnostics::{Annotation, SurfaceId};

/// A content change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceChange {
    /// The surface whose content changed.
    pub surface: SurfaceId,
    /// Content version before the change.
    pub old_version: u64,
    /// Content version after the change.
    pub new_version: u64,
}

/// Subscriber invoked once after each content mutation, with the versions on either side of it.
///
/// Annotation updates do not invoke it.
pub type SurfaceChangeCallback = Box<dyn FnMut(&SurfaceChange) + Send>;

/// The capability the workbench needs from a text-editing surface.
pub trait TextSurface {
    /// Which surface this is.
    fn id(&self) -> SurfaceId;

    /// Current text content.
    fn value(&self) -> String;

    /// Replace the whole text content.
    fn set_value(&mut self, text: &str);

    /// Annotations currently attached.
    fn annotations(&self) -> &[Annotation];

    /// Remove every annotation.
    fn clear_annotations(&mut self);

    /// Replace the attached annotations.
    fn set_annotations(&mut self, annotations: Vec<Annotation>);

    /// Subscribe to content change notifications.
    fn subscribe(&mut self, callback: SurfaceChangeCallback);
}

/// An in-memory text surface.
pub struct BufferSurface {
    id: SurfaceId,
    text: String,
    annotations: Vec<Annotation>,
    version: u64,
    callbacks: Vec<SurfaceChangeCallback>,
}

impl std::fmt::Debug for BufferSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferSurface")
            .field("id", &self.id)
            .field("text", &self.text)
            .field("annotations", &self.annotations)
            .field("version", &self.version)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl BufferSurface {
    /// Create a surface holding `text`.
    pub fn new(id: SurfaceId, text: &str) -> Self {
        Self {
            id,
            text: text.to_string(),
            annotations: Vec::new(),
            version: 0,
            callbacks: Vec::new(),
        }
    }

    /// Create an empty surface.
    pub fn empty(id: SurfaceId) -> Self {
        Self::new(id, "")
    }

    /// Borrow the text without copying.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Content version, incremented after each mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Total character count.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Number of lines (an empty document has one line).
    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    /// Text of line `line` (0-based), without its newline.
    pub fn line(&self, line: usize) -> Option<&str> {
        self.text.split('\n').nth(line)
    }

    /// Character length of line `line`.
    pub fn line_len(&self, line: usize) -> usize {
        self.line(line).map_or(0, |text| text.chars().count())
    }

    /// Convert a (line, column) position to a char offset, clamping to the document.
    pub fn position_to_offset(&self, line: usize, column: usize) -> usize {
        let mut offset = 0;
        for (index, text) in self.text.split('\n').enumerate() {
            let len = text.chars().count();
            if index == line {
                return offset + column.min(len);
            }
            offset += len + 1;
        }
        self.char_count()
    }

    /// Convert a char offset to a (line, column) position, clamping to the document.
    pub fn offset_to_position(&self, offset: usize) -> (usize, usize) {
        let mut line = 0;
        let mut column = 0;
        for c in self.text.chars().take(offset) {
            if c == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        (line, column)
    }

    /// Insert `text` at char offset `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let at = self.byte_index(offset);
        self.text.insert_str(at, text);
        self.mark_modified();
    }

    /// Remove the half-open char range `start..end`.
    pub fn remove(&mut self, start: usize, end: usize) {
        let (start, end) = (start.min(end), start.max(end));
        let (from, to) = (self.byte_index(start), self.byte_index(end));
        if from == to {
            return;
        }
        self.text.replace_range(from..to, "");
        self.mark_modified();
    }

    /// Annotations attached to `row`.
    pub fn annotations_on_row(&self, row: usize) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().filter(move |a| a.row == row)
    }

    fn byte_index(&self, offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(offset)
            .map_or(self.text.len(), |(index, _)| index)
    }

    fn mark_modified(&mut self) {
        let change = SurfaceChange {
            surface: self.id,
            old_version: self.version,
            new_version: self.version + 1,
        };
        self.version = change.new_version;
        for callback in &mut self.callbacks {
            callback(&change);
        }
    }
}

impl TextSurface for BufferSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn value(&self) -> String {
        self.text.clone()
    }

    fn set_value(&mut self, text: &str) {
        self.text = text.to_string();
        self.mark_modified();
    }

    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    fn clear_annotations(&mut self) {
        self.annotations.clear();
    }

    fn set_annotations(&mut self, annotations: Vec<Annotation>) {
        self.annotations = annotations;
    }

    fn subscribe(&mut self, callback: SurfaceChangeCallback) {
        self.callbacks.push(callback);
    }
}
