use crate::content::{BODY_CLOSE, BODY_OPEN};
use crate::jxa::{
    folder_by_name, limit_clause, note_by_name, note_change_fields, note_detail_fields,
    note_summary_fields, notes_container, script, string_literal,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListNotesOptions {
    pub folder: Option<String>,
    pub limit: Option<usize>,
}

/// A note addressed by name, optionally scoped to a folder. First match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteLookup {
    pub name: String,
    pub folder: Option<String>,
}

impl NoteLookup {
    pub fn new(name: impl Into<String>, folder: Option<String>) -> Self {
        Self {
            name: name.into(),
            folder,
        }
    }

    fn accessor(&self) -> String {
        note_by_name(&self.name, self.folder.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateNote {
    pub name: String,
    pub folder: Option<String>,
    pub html_body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub query: String,
    pub folder: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyUpdate {
    Replace,
    Append,
    Prepend,
}

pub fn list_notes_script(options: &ListNotesOptions) -> String {
    script(&[
        format!(
            "var container = {};",
            notes_container(options.folder.as_deref())
        ),
        "var allNotes = container.notes();".to_string(),
        format!(
            "var result = allNotes{}.map(function(n) {{ return {}; }});",
            limit_clause(options.limit),
            note_summary_fields("n")
        ),
        "JSON.stringify(result);".to_string(),
    ])
}

pub fn read_note_script(lookup: &NoteLookup) -> String {
    script(&[
        format!("var note = {};", lookup.accessor()),
        format!("var result = {};", note_detail_fields("note")),
        "JSON.stringify(result);".to_string(),
    ])
}

/// Create a note in `folder`, or in the default account's default folder.
pub fn create_note_script(request: &CreateNote) -> String {
    let target = match request.folder.as_deref() {
        Some(folder) => folder_by_name(folder),
        None => "Notes.defaultAccount().defaultFolder()".to_string(),
    };
    let body = request.html_body.as_deref().unwrap_or_default();
    script(&[
        format!("var target = {target};"),
        format!(
            "var note = Notes.Note({{ name: {}, body: {} }});",
            string_literal(&request.name),
            string_literal(body)
        ),
        "target.notes.push(note);".to_string(),
        format!(
            "var created = target.notes.byName({});",
            string_literal(&request.name)
        ),
        format!("var result = {};", note_summary_fields("created")),
        "JSON.stringify(result);".to_string(),
    ])
}

/// Replace, append to, or prepend to a note body in a single round trip.
///
/// Append and prepend splice `html` into the stored body exactly like
/// [`crate::content::append_html`] and [`crate::content::prepend_html`].
pub fn update_body_script(lookup: &NoteLookup, update: BodyUpdate, html: &str) -> String {
    let mut statements = vec![
        format!("var note = {};", lookup.accessor()),
        format!("var content = {};", string_literal(html)),
    ];
    match update {
        BodyUpdate::Replace => statements.push("note.body = content;".to_string()),
        BodyUpdate::Append => {
            statements.push("var existing = note.body();".to_string());
            statements.push(format!(
                "var closingIdx = existing.lastIndexOf({});",
                string_literal(BODY_CLOSE)
            ));
            statements.push(
                "if (closingIdx !== -1) { note.body = existing.slice(0, closingIdx) + content + existing.slice(closingIdx); } else { note.body = existing + content; }"
                    .to_string(),
            );
        }
        BodyUpdate::Prepend => {
            statements.push("var existing = note.body();".to_string());
            statements.push(format!("var marker = {};", string_literal(BODY_OPEN)));
            statements.push("var openIdx = existing.indexOf(marker);".to_string());
            statements.push(
                "if (openIdx !== -1) { var insertAt = openIdx + marker.length; note.body = existing.slice(0, insertAt) + content + existing.slice(insertAt); } else { note.body = content + existing; }"
                    .to_string(),
            );
        }
    }
    statements.push(format!("var result = {};", note_change_fields("note")));
    statements.push("JSON.stringify(result);".to_string());
    script(&statements)
}

pub fn delete_note_script(lookup: &NoteLookup) -> String {
    script(&[
        format!("var note = {};", lookup.accessor()),
        "var info = { id: note.id(), name: note.name() };".to_string(),
        "Notes.delete(note);".to_string(),
        "JSON.stringify({ deleted: info });".to_string(),
    ])
}

pub fn move_note_script(lookup: &NoteLookup, to: &str) -> String {
    script(&[
        format!("var note = {};", lookup.accessor()),
        format!("var dest = {};", folder_by_name(to)),
        "Notes.move(note, { to: dest });".to_string(),
        format!("var result = {};", note_change_fields("note")),
        "JSON.stringify(result);".to_string(),
    ])
}

pub fn rename_note_script(lookup: &NoteLookup, new_name: &str) -> String {
    script(&[
        format!("var note = {};", lookup.accessor()),
        format!("note.name = {};", string_literal(new_name)),
        format!("var result = {};", note_change_fields("note")),
        "JSON.stringify(result);".to_string(),
    ])
}

pub fn note_info_script(lookup: &NoteLookup) -> String {
    script(&[
        format!("var note = {};", lookup.accessor()),
        format!("var result = {};", note_summary_fields("note")),
        "JSON.stringify(result);".to_string(),
    ])
}

pub fn count_notes_script(folder: Option<&str>) -> String {
    script(&[
        format!("var container = {};", notes_container(folder)),
        "JSON.stringify({ count: container.notes.length });".to_string(),
    ])
}

/// Case-insensitive substring search over note names and plain-text bodies.
///
/// A note whose body cannot be read is matched on its name alone.
pub fn search_notes_script(options: &SearchOptions) -> String {
    script(&[
        format!(
            "var container = {};",
            notes_container(options.folder.as_deref())
        ),
        "var allNotes = container.notes();".to_string(),
        format!(
            "var query = {};",
            string_literal(&options.query.to_lowercase())
        ),
        "function plaintextOf(n) { try { return n.plaintext() || ''; } catch (e) { return ''; } }"
            .to_string(),
        "var matched = allNotes.filter(function(n) { return n.name().toLowerCase().indexOf(query) !== -1 || plaintextOf(n).toLowerCase().indexOf(query) !== -1; });"
            .to_string(),
        format!(
            "var result = matched{}.map(function(n) {{ return {}; }});",
            limit_clause(options.limit),
            note_summary_fields("n")
        ),
        "JSON.stringify(result);".to_string(),
    ])
}
