//! Immutable views into a shared source buffer.
//!
//! Every slice derived from a parse shares the buffer it was cut from, so
//! absolute offsets stay stable across sub-slicing. The scanner's bracket and
//! semicolon caches are keyed by `(buffer_id, absolute offset)` and rely on it.

use std::fmt;
use std::rc::Rc;

/// A `start..end` window over a reference-counted source buffer.
///
/// Offsets are byte offsets. All syntax the grammar cares about is ASCII;
/// slicing helpers clamp to the view and never split a UTF-8 sequence, so a
/// malformed cut yields an empty string instead of a panic.
#[derive(Clone)]
pub struct CodeSlice {
    source: Rc<str>,
    start: usize,
    end: usize,
}

impl CodeSlice {
    /// Wrap a whole buffer.
    pub fn new(source: impl Into<Rc<str>>) -> Self {
        let source = source.into();
        let end = source.len();
        CodeSlice {
            source,
            start: 0,
            end,
        }
    }

    /// The text of this view.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.source.get(self.start..self.end).unwrap_or("")
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.as_str().as_bytes()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Absolute offset of the first byte in the backing buffer.
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Absolute offset one past the last byte in the backing buffer.
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Byte at relative index `i`, if inside the view.
    #[inline]
    pub fn byte(&self, i: usize) -> Option<u8> {
        self.as_bytes().get(i).copied()
    }

    /// Identity of the backing buffer; equal for every slice of one parse.
    #[inline]
    pub fn buffer_id(&self) -> usize {
        Rc::as_ptr(&self.source).cast::<u8>() as usize
    }

    /// The full backing buffer.
    pub fn source(&self) -> &Rc<str> {
        &self.source
    }

    /// Sub-view with relative bounds, clamped to this view.
    #[must_use]
    pub fn slice(&self, from: usize, to: usize) -> CodeSlice {
        let len = self.len();
        let to = to.min(len);
        let from = from.min(to);
        CodeSlice {
            source: Rc::clone(&self.source),
            start: self.start + from,
            end: self.start + to,
        }
    }

    /// Everything after the first `n` bytes.
    #[must_use]
    pub fn skip(&self, n: usize) -> CodeSlice {
        self.slice(n, self.len())
    }

    /// The first `n` bytes.
    #[must_use]
    pub fn take(&self, n: usize) -> CodeSlice {
        self.slice(0, n)
    }

    #[must_use]
    pub fn trim_start(&self) -> CodeSlice {
        let text = self.as_str();
        let skipped = text.len() - text.trim_start().len();
        self.skip(skipped)
    }

    #[must_use]
    pub fn trim_end(&self) -> CodeSlice {
        let text = self.as_str();
        self.take(text.trim_end().len())
    }

    #[must_use]
    pub fn trim(&self) -> CodeSlice {
        self.trim_start().trim_end()
    }

    /// Whether both slices view the same buffer.
    pub fn shares_buffer(&self, other: &CodeSlice) -> bool {
        Rc::ptr_eq(&self.source, &other.source)
    }
}

impl Default for CodeSlice {
    fn default() -> Self {
        CodeSlice::new("")
    }
}

impl PartialEq for CodeSlice {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Debug for CodeSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodeSlice({}..{}, {:?})", self.start, self.end, self.as_str())
    }
}

impl fmt::Display for CodeSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests;
