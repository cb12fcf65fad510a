//! Shared pieces of the JXA scripts sent to the automation bridge.

pub const APP_BINDING: &str = "var Notes = Application('Notes');";

/// Escape a string for interpolation inside a double- or single-quoted JXA string literal.
///
/// Backslash is escaped first so the escapes added afterwards are not doubled.
pub fn escape_jxa(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Render `value` as a complete, escaped JXA string literal.
pub fn string_literal(value: &str) -> String {
    format!("\"{}\"", escape_jxa(value))
}

pub fn folder_by_name(folder: &str) -> String {
    format!("Notes.folders.byName({})", string_literal(folder))
}

/// First note named `name`, inside `folder` when given, otherwise anywhere in the store.
pub fn note_by_name(name: &str, folder: Option<&str>) -> String {
    match folder {
        Some(folder) => format!(
            "{}.notes.byName({})",
            folder_by_name(folder),
            string_literal(name)
        ),
        None => format!("Notes.notes.byName({})", string_literal(name)),
    }
}

/// Container whose `notes` are listed, counted or searched.
pub fn notes_container(folder: Option<&str>) -> String {
    match folder {
        Some(folder) => folder_by_name(folder),
        None => "Notes".to_string(),
    }
}

/// `.slice(0, n)` for a positive limit; zero or absent keeps every item.
pub fn limit_clause(limit: Option<usize>) -> String {
    match limit {
        Some(limit) if limit > 0 => format!(".slice(0, {limit})"),
        _ => String::new(),
    }
}

pub fn folder_fields(var: &str) -> String {
    format!("{{ id: {var}.id(), name: {var}.name(), noteCount: {var}.notes.length }}")
}

pub fn note_summary_fields(var: &str) -> String {
    format!(
        "{{ id: {var}.id(), name: {var}.name(), folder: {var}.container().name(), \
         creationDate: {var}.creationDate().toISOString(), \
         modificationDate: {var}.modificationDate().toISOString() }}"
    )
}

pub fn note_detail_fields(var: &str) -> String {
    format!(
        "{{ id: {var}.id(), name: {var}.name(), folder: {var}.container().name(), \
         body: {var}.body(), \
         creationDate: {var}.creationDate().toISOString(), \
         modificationDate: {var}.modificationDate().toISOString() }}"
    )
}

pub fn note_change_fields(var: &str) -> String {
    format!(
        "{{ id: {var}.id(), name: {var}.name(), folder: {var}.container().name(), \
         modificationDate: {var}.modificationDate().toISOString() }}"
    )
}

/// Join statements into a script that binds the Notes application first.
pub fn script(statements: &[String]) -> String {
    let mut script = String::from(APP_BINDING);
    for statement in statements {
        script.push('\n');
        script.push_str(statement);
    }
    script.push('\n');
    script
}
