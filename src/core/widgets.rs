use crate::io::Note;

pub const NAME_CHAR_LIMIT: usize = 30;

/// What the state machine needs from a text widget.
pub trait TextField {
    fn value(&self) -> String;
    fn set_value(&mut self, text: &str);
    fn resize(&mut self, width: u16, height: u16);
}

/// What the state machine needs from a selection widget.
pub trait Selectable {
    type Item;

    fn set_items(&mut self, items: Vec<Self::Item>);
    fn selected(&self) -> Option<&Self::Item>;
    fn resize(&mut self, width: u16, height: u16);
}

/// Single-line prompt used to name a new note.
#[derive(Debug, Clone, Default)]
pub struct LineInput {
    text: String,
    pub width: u16,
}

impl LineInput {
    pub fn push(&mut self, c: char) {
        if c == '/' || c == '\\' || c.is_control() {
            return;
        }
        if self.text.chars().count() >= NAME_CHAR_LIMIT {
            return;
        }
        self.text.push(c);
    }

    pub fn pop(&mut self) {
        self.text.pop();
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl TextField for LineInput {
    fn value(&self) -> String {
        self.text.clone()
    }

    fn set_value(&mut self, text: &str) {
        self.text.clear();
        for c in text.chars() {
            self.push(c);
        }
    }

    fn resize(&mut self, width: u16, _height: u16) {
        self.width = width;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterState {
    #[default]
    Unfiltered,
    Filtering,
    Applied,
}

/// Notes shown by the list view, with a substring filter on titles.
#[derive(Debug, Clone, Default)]
pub struct NoteList {
    items: Vec<Note>,
    filter: String,
    pub filter_state: FilterState,
    selected: usize,
    pub width: u16,
    pub height: u16,
}

impl NoteList {
    pub fn visible(&self) -> Vec<&Note> {
        if self.filter_state == FilterState::Unfiltered || self.filter.is_empty() {
            return self.items.iter().collect();
        }
        let needle = self.filter.to_lowercase();
        self.items
            .iter()
            .filter(|n| n.title.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn is_filtering(&self) -> bool {
        self.filter_state == FilterState::Filtering
    }

    pub fn move_selection(&mut self, direction: isize) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        self.selected = if direction < 0 {
            (self.selected + len - 1) % len
        } else {
            (self.selected + 1) % len
        };
    }

    pub fn start_filter(&mut self) {
        self.filter.clear();
        self.filter_state = FilterState::Filtering;
        self.selected = 0;
    }

    pub fn push_filter(&mut self, c: char) {
        self.filter.push(c);
        self.selected = 0;
    }

    pub fn pop_filter(&mut self) {
        self.filter.pop();
        self.selected = 0;
    }

    pub fn apply_filter(&mut self) {
        self.filter_state = if self.filter.is_empty() {
            FilterState::Unfiltered
        } else {
            FilterState::Applied
        };
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
        self.filter_state = FilterState::Unfiltered;
        self.selected = 0;
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}

impl Selectable for NoteList {
    type Item = Note;

    fn set_items(&mut self, items: Vec<Note>) {
        let previous = self.selected().map(|n| n.title.clone());
        self.items = items;
        let position =
            previous.and_then(|title| self.visible().iter().position(|n| n.title == title));
        match position {
            Some(idx) => self.selected = idx,
            None => self.clamp_selection(),
        }
    }

    fn selected(&self) -> Option<&Note> {
        self.visible().get(self.selected).copied()
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }
}
