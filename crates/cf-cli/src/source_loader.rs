use std::fs;
use std::path::{Path, PathBuf};

use cf_api::CfmlSource;
use cf_core::CfmlError;
use cf_parser::ParserPreferences;
use walkdir::WalkDir;

use crate::{map_cli_prefs_read, map_cli_source_path, map_cli_source_scan, map_cli_walk};

pub(crate) const SOURCE_EXTENSIONS: &[&str] = &["cfm", "cfc"];

pub(crate) fn load_preferences(path: Option<&str>) -> Result<ParserPreferences, CfmlError> {
    let Some(path) = path else {
        return Ok(ParserPreferences::default());
    };
    let raw = fs::read_to_string(path).map_err(map_cli_prefs_read)?;
    ParserPreferences::from_json_str(&raw)
}

pub(crate) fn resolve_path(raw: &str) -> Result<PathBuf, CfmlError> {
    let path = PathBuf::from(raw);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_source_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(CfmlError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("path does not exist: {}", absolute.display()),
        ));
    }
    Ok(absolute)
}

pub(crate) fn load_file(file: &str, prefs: ParserPreferences) -> Result<CfmlSource, CfmlError> {
    let path = resolve_path(file)?;
    if !path.is_file() {
        return Err(CfmlError::new(
            "CLI_SOURCE_NOT_FILE",
            format!("file is not a regular file: {}", path.display()),
        ));
    }
    CfmlSource::from_path(&path, prefs)
}

pub(crate) fn resolve_scan_dir(dir: &str) -> Result<PathBuf, CfmlError> {
    let path = resolve_path(dir)?;
    if !path.is_dir() {
        return Err(CfmlError::new(
            "CLI_SOURCE_NOT_DIR",
            format!("dir is not a directory: {}", path.display()),
        ));
    }
    Ok(path)
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            SOURCE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(extension))
        })
}

/// `(relative path, absolute path)` of every source file under `root`, sorted.
pub(crate) fn collect_sources(root: &Path) -> Result<Vec<(String, PathBuf)>, CfmlError> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(map_cli_walk)?;
        if !entry.file_type().is_file() || !has_source_extension(entry.path()) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(map_cli_source_scan)?
            .to_string_lossy()
            .replace('\\', "/");
        sources.push((relative, entry.path().to_path_buf()));
    }

    if sources.is_empty() {
        return Err(CfmlError::new(
            "CLI_SOURCE_EMPTY",
            format!("No .cfm/.cfc files under {}", root.display()),
        ));
    }
    Ok(sources)
}

#[cfg(test)]
mod source_loader_tests {
    use super::*;
    use crate::cli_test_support::*;

    #[test]
    fn missing_paths_and_wrong_kinds_are_rejected() {
        let missing = temp_path("missing");
        let error = resolve_path(missing.to_string_lossy().as_ref()).expect_err("missing");
        assert_eq!(error.code, "CLI_SOURCE_NOT_FOUND");

        let file = temp_path("plain.cfm");
        write_file(&file, "<cfset a = 1>");
        let error = resolve_scan_dir(file.to_string_lossy().as_ref()).expect_err("not a dir");
        assert_eq!(error.code, "CLI_SOURCE_NOT_DIR");

        let dir = temp_path("dir");
        fs::create_dir_all(&dir).expect("dir");
        let error = load_file(dir.to_string_lossy().as_ref(), ParserPreferences::default())
            .expect_err("not a file");
        assert_eq!(error.code, "CLI_SOURCE_NOT_FILE");
    }

    #[test]
    fn collect_sources_filters_extensions_and_sorts() {
        let root = temp_path("scan-root");
        write_file(&root.join("b.cfm"), "<cfset b = 1>");
        write_file(&root.join("a.CFC"), "<cfcomponent></cfcomponent>");
        write_file(&root.join("nested").join("c.cfm"), "<cfoutput></cfoutput>");
        write_file(&root.join("notes.txt"), "ignored");

        let sources = collect_sources(&root).expect("scan");
        let relative = sources.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();
        assert_eq!(relative, vec!["a.CFC", "b.cfm", "nested/c.cfm"]);
    }

    #[test]
    fn collect_sources_errors_without_source_files() {
        let root = temp_path("empty-scan");
        write_file(&root.join("readme.md"), "nothing");
        let error = collect_sources(&root).expect_err("empty");
        assert_eq!(error.code, "CLI_SOURCE_EMPTY");
    }

    #[test]
    fn preferences_default_or_load_from_json() {
        assert_eq!(load_preferences(None).expect("default"), ParserPreferences::default());

        let path = temp_path("prefs.json");
        write_file(&path, r#"{"caseSensitive": true, "scriptTags": ["cfscript", "cfquery"]}"#);
        let prefs = load_preferences(Some(path.to_string_lossy().as_ref())).expect("prefs");
        assert!(prefs.case_sensitive);
        assert!(prefs.is_script_tag("cfquery"));

        let error = load_preferences(Some(temp_path("absent").to_string_lossy().as_ref()))
            .expect_err("missing prefs");
        assert_eq!(error.code, "CLI_PREFS_READ");
    }
}
