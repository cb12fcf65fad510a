use anyhow::{Result, anyhow};
use serde::de::DeserializeOwned;

use crate::bridge::{ScriptRunner, run_jxa};
use crate::content::{html_to_markdown, markdown_to_html};
use crate::folders::{
    create_folder_script, delete_folder_script, folder_info_script, list_folders_script,
};
use crate::model::{Deleted, Folder, Note, NoteChange, NoteCount, NoteSummary};
use crate::notes::{
    BodyUpdate, CreateNote, ListNotesOptions, NoteLookup, SearchOptions, count_notes_script,
    create_note_script, delete_note_script, list_notes_script, move_note_script,
    note_info_script, read_note_script, rename_note_script, search_notes_script,
    update_body_script,
};

fn request<T: DeserializeOwned>(
    runner: &dyn ScriptRunner,
    operation: &str,
    script: &str,
) -> Result<Option<T>> {
    tracing::debug!(operation, "dispatching request");
    let result = run_jxa(runner, script)?;
    if result.is_none() {
        tracing::debug!(operation, "bridge returned no payload");
    }
    Ok(result)
}

fn truncate<T>(items: Option<Vec<T>>, limit: Option<usize>) -> Option<Vec<T>> {
    items.map(|mut items| {
        if let Some(limit) = limit
            && limit > 0
        {
            items.truncate(limit);
        }
        items
    })
}

fn markdown_body(markdown: Option<&str>) -> Option<String> {
    markdown
        .filter(|markdown| !markdown.is_empty())
        .map(markdown_to_html)
}

pub fn list_folders(runner: &dyn ScriptRunner) -> Result<Option<Vec<Folder>>> {
    request(runner, "folder list", &list_folders_script())
}

pub fn create_folder(runner: &dyn ScriptRunner, name: &str) -> Result<Option<Folder>> {
    request(runner, "folder create", &create_folder_script(name))
}

pub fn delete_folder(runner: &dyn ScriptRunner, name: &str) -> Result<Option<Deleted>> {
    request(runner, "folder delete", &delete_folder_script(name))
}

pub fn folder_info(runner: &dyn ScriptRunner, name: &str) -> Result<Option<Folder>> {
    request(runner, "folder info", &folder_info_script(name))
}

pub fn list_notes(
    runner: &dyn ScriptRunner,
    options: &ListNotesOptions,
) -> Result<Option<Vec<NoteSummary>>> {
    let notes = request(runner, "note list", &list_notes_script(options))?;
    Ok(truncate(notes, options.limit))
}

/// Read a note and return its body as Markdown.
pub fn read_note(runner: &dyn ScriptRunner, lookup: &NoteLookup) -> Result<Note> {
    let mut note: Note = request(runner, "note read", &read_note_script(lookup))?
        .ok_or_else(|| anyhow!("no data returned for note \"{}\"", lookup.name))?;
    note.body = html_to_markdown(&note.body)?;
    Ok(note)
}

pub fn create_note(
    runner: &dyn ScriptRunner,
    name: &str,
    folder: Option<String>,
    markdown: Option<&str>,
) -> Result<Option<NoteSummary>> {
    let request_body = CreateNote {
        name: name.to_string(),
        folder,
        html_body: markdown_body(markdown),
    };
    request(runner, "note create", &create_note_script(&request_body))
}

/// Replace, append to, or prepend to a note body with Markdown content.
pub fn update_note_body(
    runner: &dyn ScriptRunner,
    lookup: &NoteLookup,
    update: BodyUpdate,
    markdown: &str,
) -> Result<Option<NoteChange>> {
    let html = markdown_to_html(markdown);
    let operation = match update {
        BodyUpdate::Replace => "note edit",
        BodyUpdate::Append => "note append",
        BodyUpdate::Prepend => "note prepend",
    };
    request(runner, operation, &update_body_script(lookup, update, &html))
}

pub fn delete_note(runner: &dyn ScriptRunner, lookup: &NoteLookup) -> Result<Option<Deleted>> {
    request(runner, "note delete", &delete_note_script(lookup))
}

pub fn move_note(
    runner: &dyn ScriptRunner,
    lookup: &NoteLookup,
    to: &str,
) -> Result<Option<NoteChange>> {
    request(runner, "note move", &move_note_script(lookup, to))
}

pub fn rename_note(
    runner: &dyn ScriptRunner,
    lookup: &NoteLookup,
    new_name: &str,
) -> Result<Option<NoteChange>> {
    request(runner, "note rename", &rename_note_script(lookup, new_name))
}

pub fn note_info(runner: &dyn ScriptRunner, lookup: &NoteLookup) -> Result<Option<NoteSummary>> {
    request(runner, "note info", &note_info_script(lookup))
}

pub fn count_notes(runner: &dyn ScriptRunner, folder: Option<&str>) -> Result<Option<NoteCount>> {
    request(runner, "note count", &count_notes_script(folder))
}

pub fn search_notes(
    runner: &dyn ScriptRunner,
    options: &SearchOptions,
) -> Result<Option<Vec<NoteSummary>>> {
    let notes = request(runner, "search", &search_notes_script(options))?;
    Ok(truncate(notes, options.limit))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Duration;

    use serde_json::{Value, json};

    use super::*;
    use crate::bridge::{BridgeError, Osascript};

    struct FakeRunner {
        stdout: String,
        scripts: RefCell<Vec<String>>,
    }

    impl FakeRunner {
        fn returning(value: Value) -> Self {
            Self::raw(&value.to_string())
        }

        fn raw(stdout: &str) -> Self {
            Self {
                stdout: stdout.to_string(),
                scripts: RefCell::new(Vec::new()),
            }
        }

        fn only_script(&self) -> String {
            let scripts = self.scripts.borrow();
            assert_eq!(scripts.len(), 1, "expected exactly one bridge call");
            scripts[0].clone()
        }
    }

    impl ScriptRunner for FakeRunner {
        fn run(&self, script: &str) -> Result<String, BridgeError> {
            self.scripts.borrow_mut().push(script.to_string());
            Ok(self.stdout.clone())
        }
    }

    struct FailingRunner(&'static str);

    impl ScriptRunner for FailingRunner {
        fn run(&self, _script: &str) -> Result<String, BridgeError> {
            Err(BridgeError::Failed(self.0.to_string()))
        }
    }

    fn summary(name: &str) -> Value {
        json!({
            "id": format!("x-coredata://{name}"),
            "name": name,
            "folder": "Notes",
            "creationDate": "2026-10-01T09:00:00.000Z",
            "modificationDate": "2026-10-02T09:00:00.000Z"
        })
    }

    #[test]
    fn create_converts_markdown_body_to_html() {
        let runner = FakeRunner::returning(summary("Todo"));
        let created = create_note(&runner, "Todo", None, Some("- a\n- b"))
            .expect("create")
            .expect("payload");

        let script = runner.only_script();
        assert!(script.contains("<li>a</li>"), "{script}");
        assert!(script.contains("<li>b</li>"));
        assert!(script.contains("Notes.defaultAccount().defaultFolder()"));
        assert_eq!(created.name, "Todo");
        assert_eq!(created.folder, "Notes");
        let encoded = serde_json::to_value(&created).expect("encode");
        for key in ["id", "name", "folder", "creationDate", "modificationDate"] {
            assert!(encoded.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn create_without_body_sends_empty_html() {
        let runner = FakeRunner::returning(summary("Blank"));
        create_note(&runner, "Blank", Some("Work".to_string()), Some(""))
            .expect("create");
        assert!(runner.only_script().contains("body: \"\""));
    }

    #[test]
    fn read_rewrites_body_as_markdown() {
        let runner = FakeRunner::returning(json!({
            "id": "x-coredata://Todo",
            "name": "Todo",
            "folder": "Notes",
            "body": "<body><div>Hi</div></body>",
            "creationDate": "2026-10-01T09:00:00.000Z",
            "modificationDate": "2026-10-02T09:00:00.000Z"
        }));
        let note = read_note(&runner, &NoteLookup::new("Todo", None)).expect("read");
        assert_eq!(note.body, "Hi");
    }

    #[test]
    fn read_without_payload_is_an_error() {
        let runner = FakeRunner::raw("");
        let error = read_note(&runner, &NoteLookup::new("Todo", None)).expect_err("must fail");
        assert!(error.to_string().contains("Todo"));
    }

    #[test]
    fn search_never_returns_more_than_limit() {
        let runner = FakeRunner::returning(json!([
            summary("foo one"),
            summary("foo two"),
            summary("foo three")
        ]));
        let results = search_notes(
            &runner,
            &SearchOptions {
                query: "foo".to_string(),
                folder: None,
                limit: Some(2),
            },
        )
        .expect("search")
        .expect("payload");
        assert_eq!(results.len(), 2);
        assert!(runner.only_script().contains("matched.slice(0, 2)"));
    }

    #[test]
    fn zero_limit_keeps_everything() {
        let runner = FakeRunner::returning(json!([summary("a"), summary("b")]));
        let results = list_notes(
            &runner,
            &ListNotesOptions {
                folder: None,
                limit: Some(0),
            },
        )
        .expect("list")
        .expect("payload");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn lookup_failure_surfaces_bridge_message() {
        let runner = FailingRunner("execution error: Can’t get note \"Nonexistent\". (-1728)");
        let error =
            note_info(&runner, &NoteLookup::new("Nonexistent", None)).expect_err("must fail");
        assert_eq!(
            error.to_string(),
            "execution error: Can’t get note \"Nonexistent\". (-1728)"
        );
    }

    #[test]
    fn malformed_output_is_a_parse_error() {
        let runner = FakeRunner::raw("undefined");
        let error = count_notes(&runner, None).expect_err("must fail");
        assert!(
            error
                .to_string()
                .contains("Failed to parse osascript output: undefined")
        );
    }

    #[test]
    fn wrong_result_shape_is_reported_separately() {
        let runner = FakeRunner::returning(json!({ "count": null }));
        let error = count_notes(&runner, None).expect_err("must fail");
        assert!(
            error
                .to_string()
                .starts_with("Unexpected osascript result shape:"),
            "{error}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn missing_bridge_binary_names_the_cause_once() {
        let runner = Osascript::new("/nonexistent/anotes-osascript", Duration::from_millis(500));
        let error = count_notes(&runner, None).expect_err("must fail");
        assert_eq!(
            format!("{error:#}"),
            "failed to execute /nonexistent/anotes-osascript: No such file or directory (os error 2)"
        );
    }

    #[test]
    fn absent_result_is_passed_through() {
        let runner = FakeRunner::raw("\n");
        let result = delete_folder(&runner, "Old").expect("delete");
        assert!(result.is_none());
    }

    #[test]
    fn append_sends_converted_markdown_once() {
        let runner = FakeRunner::returning(json!({
            "id": "x-coredata://Todo",
            "name": "Todo",
            "folder": "Work",
            "modificationDate": "2026-10-02T09:00:00.000Z"
        }));
        let change = update_note_body(
            &runner,
            &NoteLookup::new("Todo", Some("Work".to_string())),
            BodyUpdate::Append,
            "# Later\n\nmore",
        )
        .expect("append")
        .expect("payload");
        assert_eq!(change.folder, "Work");
        let script = runner.only_script();
        assert!(script.contains("</h1><br><p>more</p>"), "{script}");
        assert!(script.contains("lastIndexOf"));
    }

    #[test]
    fn folder_operations_decode_typed_results() {
        let runner = FakeRunner::returning(json!([
            { "id": "f1", "name": "Notes", "noteCount": 12 },
            { "id": "f2", "name": "Work", "noteCount": 0 }
        ]));
        let folders = list_folders(&runner).expect("list").expect("payload");
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0].note_count, 12);

        let runner = FakeRunner::returning(json!({ "deleted": { "id": "n1", "name": "Old" } }));
        let deleted = delete_note(&runner, &NoteLookup::new("Old", None))
            .expect("delete")
            .expect("payload");
        assert_eq!(deleted.deleted.name, "Old");
    }

    #[test]
    fn move_and_rename_target_the_looked_up_note() {
        let change = json!({
            "id": "n1",
            "name": "Renamed",
            "folder": "Archive",
            "modificationDate": "2026-10-02T09:00:00.000Z"
        });
        let runner = FakeRunner::returning(change.clone());
        move_note(&runner, &NoteLookup::new("Todo", None), "Archive").expect("move");
        assert!(runner.only_script().contains("Notes.folders.byName(\"Archive\")"));

        let runner = FakeRunner::returning(change);
        let renamed = rename_note(&runner, &NoteLookup::new("Todo", None), "Renamed")
            .expect("rename")
            .expect("payload");
        assert_eq!(renamed.name, "Renamed");
    }
}
