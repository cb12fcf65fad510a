use crate::jxa::{folder_by_name, folder_fields, script, string_literal};

pub fn list_folders_script() -> String {
    script(&[
        "var folders = Notes.folders();".to_string(),
        format!(
            "var result = folders.map(function(f) {{ return {}; }});",
            folder_fields("f")
        ),
        "JSON.stringify(result);".to_string(),
    ])
}

/// Create a folder, then read it back by name.
pub fn create_folder_script(name: &str) -> String {
    script(&[
        format!("var folder = Notes.Folder({{ name: {} }});", string_literal(name)),
        "Notes.folders.push(folder);".to_string(),
        format!("var created = {};", folder_by_name(name)),
        format!("var result = {};", folder_fields("created")),
        "JSON.stringify(result);".to_string(),
    ])
}

pub fn delete_folder_script(name: &str) -> String {
    script(&[
        format!("var folder = {};", folder_by_name(name)),
        "var info = { id: folder.id(), name: folder.name() };".to_string(),
        "Notes.delete(folder);".to_string(),
        "JSON.stringify({ deleted: info });".to_string(),
    ])
}

pub fn folder_info_script(name: &str) -> String {
    script(&[
        format!("var folder = {};", folder_by_name(name)),
        format!("var result = {};", folder_fields("folder")),
        "JSON.stringify(result);".to_string(),
    ])
}
