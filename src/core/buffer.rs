use ropey::{Rope, RopeSlice};
use unicode_width::UnicodeWidthChar;

use super::widgets::TextField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub line: usize,
    pub col: usize,
}

/// Window of the buffer visible in the editor body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub top_line: usize,
    pub left_col: usize,
    pub width: u16,
    pub height: u16,
}

/// Editable body of the open note.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    rope: Rope,
    pub cursor: Cursor,
    pub viewport: Viewport,
    /// Column that vertical movement tries to return to.
    sticky_col: usize,
    pub dirty: bool,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::from_text(String::new())
    }
}

pub const TAB_WIDTH: usize = 4;

/// Screen cells taken by `ch` when it starts at display column `col`.
pub fn cell_width(ch: char, col: usize) -> usize {
    if ch == '\t' {
        TAB_WIDTH - col % TAB_WIDTH
    } else {
        UnicodeWidthChar::width(ch).unwrap_or(1).max(1)
    }
}

/// Chars at the end of `line` that form its line break.
fn break_len(line: RopeSlice<'_>) -> usize {
    let len = line.len_chars();
    let last = |back: usize| len.checked_sub(back).map(|i| line.char(i));
    match (last(2), last(1)) {
        (Some('\r'), Some('\n')) => 2,
        (_, Some('\n' | '\r')) => 1,
        _ => 0,
    }
}

/// New start of a scrolled window of `span` cells so that `pos` is inside it.
fn follow(pos: usize, start: usize, span: u16) -> usize {
    let last = span.saturating_sub(1) as usize;
    if pos < start {
        pos
    } else if pos > start + last {
        pos - last
    } else {
        start
    }
}

impl TextBuffer {
    pub fn from_text(text: String) -> Self {
        Self {
            rope: Rope::from_str(&text),
            cursor: Cursor::default(),
            viewport: Viewport {
                top_line: 0,
                left_col: 0,
                width: 80,
                height: 20,
            },
            sticky_col: 0,
            dirty: false,
        }
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines().max(1)
    }

    fn last_line(&self) -> usize {
        self.line_count() - 1
    }

    /// Length of `line` in chars, not counting its line break.
    pub fn line_len_chars(&self, line: usize) -> usize {
        if line >= self.line_count() {
            return 0;
        }
        let slice = self.rope.line(line);
        slice.len_chars() - break_len(slice)
    }

    pub fn line_text(&self, line: usize) -> String {
        if line >= self.line_count() {
            return String::new();
        }
        let slice = self.rope.line(line);
        slice.slice(..slice.len_chars() - break_len(slice)).to_string()
    }

    /// Display column of char `col` on `line`, with tabs expanded.
    pub fn display_col(&self, line: usize, col: usize) -> usize {
        self.line_text(line)
            .chars()
            .take(col)
            .fold(0, |acc, ch| acc + cell_width(ch, acc))
    }

    pub fn as_string(&self) -> String {
        self.rope.to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    pub fn ends_with_whitespace(&self) -> bool {
        let len = self.rope.len_chars();
        len > 0 && self.rope.char(len - 1).is_whitespace()
    }

    fn cursor_char_idx(&self) -> usize {
        let line = self.cursor.line.min(self.last_line());
        self.rope.line_to_char(line) + self.cursor.col.min(self.line_len_chars(line))
    }

    pub fn set_viewport_size(&mut self, width: u16, height: u16) {
        self.viewport.width = width.max(1);
        self.viewport.height = height.max(1);
        self.scroll_to_cursor();
    }

    /// Clamps the cursor into the text and scrolls the viewport onto it.
    pub fn scroll_to_cursor(&mut self) {
        self.cursor.line = self.cursor.line.min(self.last_line());
        self.cursor.col = self.cursor.col.min(self.line_len_chars(self.cursor.line));
        self.viewport.top_line = follow(
            self.cursor.line,
            self.viewport.top_line,
            self.viewport.height,
        );
        self.viewport.left_col = follow(
            self.display_col(self.cursor.line, self.cursor.col),
            self.viewport.left_col,
            self.viewport.width,
        );
    }

    /// Horizontal placement: the new column also becomes the sticky one.
    fn place(&mut self, line: usize, col: usize) {
        self.cursor = Cursor { line, col };
        self.sticky_col = col;
        self.scroll_to_cursor();
    }

    /// Vertical placement: keeps the sticky column where the line allows.
    fn jump_to_line(&mut self, line: usize) {
        let line = line.min(self.last_line());
        self.cursor = Cursor {
            line,
            col: self.sticky_col.min(self.line_len_chars(line)),
        };
        self.scroll_to_cursor();
    }

    fn page(&self) -> usize {
        self.viewport.height.saturating_sub(1) as usize
    }

    pub fn move_left(&mut self) {
        let Cursor { line, col } = self.cursor;
        if col > 0 {
            self.place(line, col - 1);
        } else if line > 0 {
            self.place(line - 1, self.line_len_chars(line - 1));
        }
    }

    pub fn move_right(&mut self) {
        let Cursor { line, col } = self.cursor;
        if col < self.line_len_chars(line) {
            self.place(line, col + 1);
        } else if line < self.last_line() {
            self.place(line + 1, 0);
        }
    }

    pub fn move_up(&mut self) {
        if self.cursor.line > 0 {
            self.jump_to_line(self.cursor.line - 1);
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor.line < self.last_line() {
            self.jump_to_line(self.cursor.line + 1);
        }
    }

    pub fn move_home(&mut self) {
        self.place(self.cursor.line, 0);
    }

    pub fn move_end(&mut self) {
        self.place(self.cursor.line, self.line_len_chars(self.cursor.line));
    }

    pub fn move_to_end(&mut self) {
        let last = self.last_line();
        self.place(last, self.line_len_chars(last));
    }

    pub fn page_up(&mut self) {
        self.jump_to_line(self.cursor.line.saturating_sub(self.page()));
    }

    pub fn page_down(&mut self) {
        self.jump_to_line(self.cursor.line + self.page());
    }

    pub fn insert_char(&mut self, c: char) {
        self.rope.insert_char(self.cursor_char_idx(), c);
        self.dirty = true;
        self.place(self.cursor.line, self.cursor.col + 1);
    }

    pub fn insert_newline(&mut self) {
        self.rope.insert_char(self.cursor_char_idx(), '\n');
        self.dirty = true;
        self.place(self.cursor.line + 1, 0);
    }

    pub fn backspace(&mut self) {
        let Cursor { line, col } = self.cursor;
        let idx = self.cursor_char_idx();
        if idx == 0 {
            return;
        }
        // Joining lines lands the cursor where the previous line used to end.
        let (target, width) = if col > 0 {
            ((line, col - 1), 1)
        } else {
            let prev = line - 1;
            ((prev, self.line_len_chars(prev)), break_len(self.rope.line(prev)))
        };
        self.rope.remove(idx - width..idx);
        self.dirty = true;
        self.place(target.0, target.1);
    }

    pub fn delete(&mut self) {
        let Cursor { line, col } = self.cursor;
        let idx = self.cursor_char_idx();
        let width = if col < self.line_len_chars(line) {
            1
        } else {
            break_len(self.rope.line(line))
        };
        if width > 0 {
            self.rope.remove(idx..idx + width);
            self.dirty = true;
        }
        self.scroll_to_cursor();
    }

    /// Appends `text` at the end of the buffer and leaves the cursor after it.
    pub fn append_str(&mut self, text: &str) {
        self.rope.insert(self.rope.len_chars(), text);
        self.dirty = true;
        self.move_to_end();
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }
}

impl TextField for TextBuffer {
    fn value(&self) -> String {
        self.as_string()
    }

    fn set_value(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.cursor = Cursor::default();
        self.viewport.top_line = 0;
        self.viewport.left_col = 0;
        self.sticky_col = 0;
        self.dirty = false;
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.set_viewport_size(width, height);
    }
}
