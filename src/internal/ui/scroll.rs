//! Keeps the selected row inside a fixed-height window over a list.

/// Result of moving the selection: the new window offset and selected index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub offset: usize,
    pub selected: usize,
}

/// Moves the selection to `requested` and scrolls just enough to keep it visible.
///
/// `requested` is clamped to the list; an empty list yields `(0, 0)`. The
/// offset never exceeds `len - page_size` (or 0 for short lists).
pub fn reposition(offset: usize, requested: isize, len: usize, page_size: usize) -> Viewport {
    if len == 0 {
        return Viewport {
            offset: 0,
            selected: 0,
        };
    }
    let page_size = page_size.max(1);
    let selected = requested.clamp(0, len as isize - 1) as usize;
    let max_offset = len.saturating_sub(page_size);

    let mut offset = offset.min(max_offset);
    if selected < offset {
        offset = selected;
    } else if selected >= offset + page_size {
        offset = selected + 1 - page_size;
    }

    Viewport {
        offset: offset.min(max_offset),
        selected,
    }
}
