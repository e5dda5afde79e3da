#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Save,
    OpenList,
    NewNote,
    ToggleAutocomplete,
    RefreshSuggestion,
    Tab,
    Confirm,
    Cancel,
    Insert(char),
    Backspace,
    Delete,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    MoveHome,
    MoveEnd,
    PageUp,
    PageDown,
}
