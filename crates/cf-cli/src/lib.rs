use std::ffi::OsString;

use cf_api::CfmlSource;
use cf_core::CfmlError;
use cf_parser::Severity;
use cf_script::Decompile;
use clap::Parser;

mod cli_args;
mod error_map;
mod models;
mod source_loader;

pub(crate) use cli_args::{Cli, FileArgs, Mode, ScanArgs};
pub(crate) use error_map::{
    emit_error, map_cli_output, map_cli_prefs_read, map_cli_source_path, map_cli_source_scan,
    map_cli_walk,
};
pub(crate) use models::{ScanRecord, TagRecord};
pub(crate) use source_loader::{collect_sources, load_file, load_preferences, resolve_scan_dir};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, CfmlError> {
    let lines = match cli.command {
        Mode::Tags(args) => run_tags(args)?,
        Mode::Script(args) => run_script(args)?,
        Mode::Scan(args) => run_scan(args)?,
    };
    println!("RESULT:OK");
    for line in lines {
        println!("{}", line);
    }
    Ok(0)
}

fn run_tags(args: FileArgs) -> Result<Vec<String>, CfmlError> {
    let prefs = load_preferences(args.prefs.as_deref())?;
    let source = load_file(&args.file, prefs)?;
    render_tags(&source)
}

fn run_script(args: FileArgs) -> Result<Vec<String>, CfmlError> {
    let prefs = load_preferences(args.prefs.as_deref())?;
    let source = load_file(&args.file, prefs)?;
    render_script(&source)
}

fn run_scan(args: ScanArgs) -> Result<Vec<String>, CfmlError> {
    let prefs = load_preferences(args.prefs.as_deref())?;
    let root = resolve_scan_dir(&args.dir)?;
    let mut lines = Vec::new();
    let sources = collect_sources(&root)?;
    for (relative, path) in &sources {
        let source = CfmlSource::from_path(path, prefs.clone())?;
        let record = ScanRecord {
            path: relative.clone(),
            tags: source.all_tags().len(),
            cfml_tags: source.all_cfml_tags().len(),
            errors: source.diagnostics().count(Severity::Error),
            warnings: source.diagnostics().count(Severity::Warn),
        };
        lines.push(format!(
            "FILE:{}",
            serde_json::to_string(&record).map_err(map_cli_output)?
        ));
    }
    lines.push(format!("TOTAL_FILES:{}", sources.len()));
    Ok(lines)
}

fn json_string(text: &str) -> Result<String, CfmlError> {
    serde_json::to_string(text).map_err(map_cli_output)
}

fn render_diagnostics(source: &CfmlSource, lines: &mut Vec<String>) -> Result<(), CfmlError> {
    for entry in source.diagnostic_entries() {
        lines.push(format!(
            "DIAGNOSTIC:{}|{}",
            entry.severity.as_str(),
            json_string(&entry.message)?
        ));
    }
    Ok(())
}

pub(crate) fn render_tags(source: &CfmlSource) -> Result<Vec<String>, CfmlError> {
    let mut lines = Vec::new();
    for tag in source.all_tags() {
        let location = source.location(tag.start_tag_begin);
        let record = TagRecord {
            line: location.line,
            column: location.column,
            tag,
        };
        lines.push(format!(
            "TAG:{}",
            serde_json::to_string(&record).map_err(map_cli_output)?
        ));
    }
    render_diagnostics(source, &mut lines)?;
    Ok(lines)
}

fn push_failure(lines: &mut Vec<String>, error: &CfmlError) -> Result<(), CfmlError> {
    lines.push(format!(
        "SCRIPT_ERROR:{}:{}|{}",
        error.line().unwrap_or_default(),
        error.column().unwrap_or_default(),
        json_string(&error.message)?
    ));
    Ok(())
}

/// Script tags first, then expression tags, each in document order.
pub(crate) fn render_script(source: &CfmlSource) -> Result<Vec<String>, CfmlError> {
    let mut lines = Vec::new();
    for unit in source.parse_script_tags() {
        let location = source.location(unit.tag.start_tag_begin);
        lines.push(format!(
            "SCRIPT:<{}> {}:{}",
            unit.tag.name, location.line, location.column
        ));
        match &unit.result {
            Ok(statements) => {
                for statement in statements {
                    lines.push(format!("STATEMENT_JSON:{}", json_string(&statement.decompile(0))?));
                }
            }
            Err(error) => push_failure(&mut lines, error)?,
        }
    }

    let prefs = source.preferences();
    for tag in source.all_tags() {
        if !prefs.is_expression_tag(&tag.name) {
            continue;
        }
        let location = source.location(tag.start_tag_begin);
        lines.push(format!(
            "EXPRESSION:<{}> {}:{}",
            tag.name, location.line, location.column
        ));
        match source.parse_tag_expression(tag) {
            Ok(statement) => {
                lines.push(format!("STATEMENT_JSON:{}", json_string(&statement.decompile(0))?))
            }
            Err(error) => push_failure(&mut lines, &error)?,
        }
    }

    render_diagnostics(source, &mut lines)?;
    Ok(lines)
}

#[cfg(test)]
mod cli_test_support;
