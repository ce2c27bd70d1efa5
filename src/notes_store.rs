use crate::model::Note;

pub(crate) const NOTES_STORAGE_KEY: &str = "vectoria_notes";

/// Storage port for the notes list, so the store logic stays testable
/// without a real persistent backend.
pub(crate) trait NotesStorage {
    fn load(&self) -> Vec<Note>;
    fn save(&self, notes: &[Note]);
}

/// Decode half of the load path. Absent, unreadable, or non-list payloads
/// all fall back to an empty list instead of failing startup.
pub(crate) fn parse_notes(raw: Option<String>) -> Vec<Note> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    serde_json::from_str::<Vec<Note>>(&raw).unwrap_or_default()
}

pub(crate) struct LocalNotesStorage;

impl NotesStorage for LocalNotesStorage {
    fn load(&self) -> Vec<Note> {
        let raw = local_storage().and_then(|storage| storage.get_item(NOTES_STORAGE_KEY).ok().flatten());
        parse_notes(raw)
    }

    fn save(&self, notes: &[Note]) {
        let Ok(raw) = serde_json::to_string(notes) else {
            return;
        };
        let Some(storage) = local_storage() else {
            return;
        };
        if storage.set_item(NOTES_STORAGE_KEY, &raw).is_err() {
            gloo::console::warn!("notes: failed to persist list");
        }
    }
}

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

pub(crate) fn load_notes<S: NotesStorage>(storage: &S) -> Vec<Note> {
    storage.load()
}

/// Prepends a new note (newest first) and persists the full updated list.
/// Empty or whitespace-only text leaves the list untouched and returns None.
pub(crate) fn add_note<S: NotesStorage>(
    storage: &S,
    notes: &[Note],
    text: &str,
    id: u64,
    date: String,
) -> Option<Vec<Note>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut next = Vec::with_capacity(notes.len() + 1);
    next.push(Note::new(id, trimmed, date));
    next.extend_from_slice(notes);
    storage.save(&next);
    Some(next)
}
