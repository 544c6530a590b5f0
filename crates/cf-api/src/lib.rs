//! Parsing session over one CFML source text.
//!
//! A [`CfmlSource`] owns the text, its [`TagTree`], the diagnostics collected
//! while building it and the [`CallStack`] script binding runs against.

use std::fs;
use std::io::Read;
use std::path::Path;

use cf_core::{ByteRange, CfmlError, LineIndex, SourceLocation};
use cf_parser::{Diagnostic, Diagnostics, ParserPreferences, Severity, Tag, TagTree};
use cf_script::{
    parse_script_at, parse_tag_statement_at, CallFrame, CallStack, Declaration, ScopeBinder,
    Statement,
};
use url::Url;

/// Name of the call frame holding page-level variables.
pub const PAGE_FRAME: &str = "page";

/// Outcome of parsing the body of one script tag.
#[derive(Debug)]
pub struct ScriptUnit<'a> {
    pub tag: &'a Tag,
    pub body: ByteRange,
    pub result: Result<Vec<Statement>, CfmlError>,
}

#[derive(Debug)]
pub struct CfmlSource {
    contents: String,
    prefs: ParserPreferences,
    lines: LineIndex,
    tree: TagTree,
    diagnostics: Diagnostics,
    call_stack: CallStack,
}

impl CfmlSource {
    pub fn new(contents: impl Into<String>) -> Result<Self, CfmlError> {
        Self::with_preferences(contents, ParserPreferences::default())
    }

    pub fn with_preferences(
        contents: impl Into<String>,
        prefs: ParserPreferences,
    ) -> Result<Self, CfmlError> {
        let contents = contents.into();
        let lines = LineIndex::new(&contents);
        let mut diagnostics = Diagnostics::new();
        let tree = TagTree::build(&contents, &prefs, &lines, &mut diagnostics)?;
        log::debug!(
            target: "cfml.tags",
            "indexed {} tags with {} diagnostics",
            tree.len(),
            diagnostics.len()
        );

        let mut call_stack = CallStack::new();
        call_stack.push_frame(CallFrame::new(PAGE_FRAME, None));

        Ok(Self {
            contents,
            prefs,
            lines,
            tree,
            diagnostics,
            call_stack,
        })
    }

    pub fn from_path(path: impl AsRef<Path>, prefs: ParserPreferences) -> Result<Self, CfmlError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|error| {
            CfmlError::new(
                "SOURCE_READ",
                format!("Failed to read {}: {}", path.display(), error),
            )
        })?;
        Self::with_preferences(contents, prefs)
    }

    pub fn from_reader(mut reader: impl Read, prefs: ParserPreferences) -> Result<Self, CfmlError> {
        let mut contents = String::new();
        reader
            .read_to_string(&mut contents)
            .map_err(|error| CfmlError::new("SOURCE_READ", error.to_string()))?;
        Self::with_preferences(contents, prefs)
    }

    /// Loads from a URL. Only `file://` locations are readable.
    pub fn from_location(location: &str, prefs: ParserPreferences) -> Result<Self, CfmlError> {
        let url = Url::parse(location).map_err(|error| {
            CfmlError::new(
                "SOURCE_LOCATION",
                format!("Invalid source location \"{}\": {}", location, error),
            )
        })?;
        if url.scheme() != "file" {
            return Err(CfmlError::new(
                "SOURCE_SCHEME_UNSUPPORTED",
                format!("Unsupported source scheme \"{}\".", url.scheme()),
            ));
        }
        let path = url.to_file_path().map_err(|_| {
            CfmlError::new(
                "SOURCE_LOCATION",
                format!("Source location \"{}\" is not a local path.", location),
            )
        })?;
        Self::from_path(path, prefs)
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn preferences(&self) -> &ParserPreferences {
        &self.prefs
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.lines
    }

    pub fn tag_tree(&self) -> &TagTree {
        &self.tree
    }

    /// Source text of `range`; empty when the range is out of bounds.
    pub fn text(&self, range: ByteRange) -> &str {
        self.contents.get(range.start..range.end).unwrap_or_default()
    }

    pub fn all_tags(&self) -> &[Tag] {
        self.tree.all_tags()
    }

    pub fn all_cfml_tags(&self) -> Vec<&Tag> {
        self.tree.vocabulary_tags()
    }

    pub fn tags_by_name(&self, prefix: &str) -> Vec<&Tag> {
        self.tree.tags_by_name_prefix(prefix)
    }

    pub fn tags_by_name_prefix(&self, prefix: &str) -> Vec<&Tag> {
        self.tree.tags_by_name_prefix(prefix)
    }

    pub fn enclosing_tag(&self, offset: usize) -> Option<&Tag> {
        self.tree.enclosing_tag(offset)
    }

    pub fn next_tag(&self, offset: usize) -> Option<&Tag> {
        self.tree.next_tag(offset)
    }

    pub fn previous_tag(&self, offset: usize) -> Option<&Tag> {
        self.tree.previous_tag(offset)
    }

    pub fn tag_at(&self, offset: usize) -> Option<&Tag> {
        self.tree.tag_at(offset)
    }

    /// 1-based line of `offset`.
    pub fn row(&self, offset: usize) -> usize {
        self.lines.location(offset).line
    }

    pub fn location(&self, offset: usize) -> SourceLocation {
        self.lines.location(offset)
    }

    pub fn debugging_info(&self) -> String {
        self.tree.debug_listing(&self.lines)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics.messages().collect()
    }

    pub fn emit_diagnostic(&mut self, severity: Severity, message: impl Into<String>) {
        self.diagnostics.emit(severity, message);
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    pub fn call_stack_mut(&mut self) -> &mut CallStack {
        &mut self.call_stack
    }

    pub fn script_tags(&self) -> Vec<&Tag> {
        self.tree
            .all_tags()
            .iter()
            .filter(|tag| self.prefs.is_script_tag(&tag.name))
            .collect()
    }

    /// Text between the start tag and the end tag of `tag`.
    pub fn script_body(&self, tag: &Tag) -> &str {
        self.text(tag.body())
    }

    /// Parses every script tag body on its own; one failing body leaves the
    /// others untouched.
    pub fn parse_script_tags(&self) -> Vec<ScriptUnit<'_>> {
        self.script_tags()
            .into_iter()
            .map(|tag| {
                let body = tag.body();
                let result = parse_script_at(self.text(body), body.start, &self.lines);
                if let Err(error) = &result {
                    log::debug!(target: "cfml.script", "<{}> failed: {}", tag.name, error);
                }
                ScriptUnit { tag, body, result }
            })
            .collect()
    }

    /// Parses the expression written inside an expression tag such as `<cfset>`.
    pub fn parse_tag_expression(&self, tag: &Tag) -> Result<Statement, CfmlError> {
        if !self.prefs.is_expression_tag(&tag.name) {
            return Err(CfmlError::with_span(
                "TAG_NOT_SCRIPT",
                format!("<{}> does not hold a script expression.", tag.name),
                self.lines.span(tag.start_tag()),
            ));
        }
        let offset = self.expression_offset(tag);
        parse_tag_statement_at(&tag.raw_attributes, offset, &self.lines)
    }

    fn expression_offset(&self, tag: &Tag) -> usize {
        let after_name = (tag.start_tag_begin + 1 + tag.name.len()).min(tag.start_tag_end);
        self.contents
            .get(after_name..tag.start_tag_end)
            .and_then(|inner| inner.find(tag.raw_attributes.as_str()))
            .map_or(after_name, |relative| after_name + relative)
    }

    /// Parses every script tag and expression tag in document order and binds
    /// the statements against the page call frame. Units that fail to parse
    /// are reported as error diagnostics and skipped.
    pub fn bind_scripts(&mut self) -> Result<Vec<Declaration>, CfmlError> {
        let mut statements = Vec::new();
        let mut failures = Vec::new();
        for tag in self.tree.all_tags() {
            let parsed = if self.prefs.is_script_tag(&tag.name) {
                let body = tag.body();
                parse_script_at(self.text(body), body.start, &self.lines)
            } else if self.prefs.is_expression_tag(&tag.name) {
                self.parse_tag_expression(tag).map(|statement| vec![statement])
            } else {
                continue;
            };
            match parsed {
                Ok(parsed) => statements.extend(parsed),
                Err(error) => failures.push(describe_failure(&tag.name, &error)),
            }
        }
        for failure in failures {
            self.diagnostics.error(failure);
        }

        let mut binder = ScopeBinder::new(&mut self.call_stack, &mut self.diagnostics);
        binder.bind(&statements)?;
        Ok(binder.into_declarations())
    }

    pub fn diagnostic_entries(&self) -> &[Diagnostic] {
        self.diagnostics.entries()
    }
}

fn describe_failure(tag_name: &str, error: &CfmlError) -> String {
    match (error.line(), error.column()) {
        (Some(line), Some(column)) => format!(
            "Script error in <{}> at line {}, column {}: {}",
            tag_name, line, column, error.message
        ),
        _ => format!("Script error in <{}>: {}", tag_name, error.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_script::Decompile;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    const PAGE: &str = concat!(
        "<cfset greeting = \"Hello\">\n",
        "<cfoutput>\n",
        "  <cfif greeting EQ \"Hello\"><b>#greeting#</b></cfif>\n",
        "</cfoutput>\n",
        "<cfscript>\n",
        "  total = len(greeting) > 3 ? 1 : 0;\n",
        "</cfscript>\n",
    );

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!("cfml-inspect-{}-{}", name, nanos))
    }

    fn source() -> CfmlSource {
        CfmlSource::new(PAGE).expect("source should build")
    }

    fn names(tags: &[&Tag]) -> Vec<String> {
        tags.iter().map(|tag| tag.name.clone()).collect()
    }

    #[test]
    fn session_indexes_tags_and_filters_vocabulary() {
        let source = source();
        assert_eq!(source.all_tags().len(), 5);
        assert_eq!(
            names(&source.all_cfml_tags()),
            vec!["cfset", "cfoutput", "cfif", "cfscript"]
        );
        assert_eq!(names(&source.tags_by_name("cfs")), vec!["cfset", "cfscript"]);
        assert!(source.messages().is_empty());
    }

    #[test]
    fn position_queries_delegate_to_tree() {
        let source = source();
        let inside_b = PAGE.find("#greeting#").expect("output") + 1;
        assert_eq!(source.enclosing_tag(inside_b).map(|t| t.name.as_str()), Some("b"));
        assert_eq!(source.row(inside_b), 3);
        assert_eq!(source.location(0), SourceLocation { line: 1, column: 1 });

        let b_start = PAGE.find("<b>").expect("b");
        assert_eq!(source.tag_at(b_start).map(|t| t.name.as_str()), Some("b"));
        assert_eq!(source.previous_tag(b_start + 3).map(|t| t.name.as_str()), Some("cfif"));
        assert_eq!(source.next_tag(b_start + 3).map(|t| t.name.as_str()), Some("b"));
    }

    #[test]
    fn script_tags_parse_with_document_positions() {
        let source = source();
        let units = source.parse_script_tags();
        assert_eq!(units.len(), 1);
        let statements = units[0].result.as_ref().expect("script parses");
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].decompile(0), "total = len(greeting) > 3?1:0");
        assert!(source.script_body(units[0].tag).contains("total ="));
    }

    #[test]
    fn broken_script_unit_reports_absolute_position() {
        let page = "<cfset a = 1>\n<cfscript>\n  ok = 1;\n  bad = ;\n</cfscript>\n<cfscript>fine = 2;</cfscript>";
        let source = CfmlSource::new(page).expect("build");
        let units = source.parse_script_tags();
        assert_eq!(units.len(), 2);
        let error = units[0].result.as_ref().expect_err("second statement is broken");
        assert_eq!(error.code, "SCRIPT_PARSE_ERROR");
        assert_eq!(error.line(), Some(4));
        assert_eq!(error.column(), Some(9));
        assert!(units[1].result.is_ok());
    }

    #[test]
    fn expression_tags_round_trip_through_decompile() {
        let source = CfmlSource::new(
            "<cfset someVariable = someExpression ? someExpression2 : someExpression3>",
        )
        .expect("build");
        let tag = &source.all_tags()[0];
        let statement = source.parse_tag_expression(tag).expect("expression parses");
        assert_eq!(
            statement.decompile(0),
            "someVariable = someExpression?someExpression2:someExpression3"
        );

        let broken = CfmlSource::new("<cfset a = >").expect("build");
        let error = broken
            .parse_tag_expression(&broken.all_tags()[0])
            .expect_err("incomplete");
        assert_eq!(error.code, "SCRIPT_PARSE_ERROR");
        assert_eq!(error.column(), Some(11));
    }

    #[test]
    fn non_expression_tag_is_rejected() {
        let source = source();
        let output = source.tags_by_name("cfoutput")[0];
        let error = source.parse_tag_expression(output).expect_err("not a script tag");
        assert_eq!(error.code, "TAG_NOT_SCRIPT");
        assert_eq!(error.line(), Some(2));
    }

    #[test]
    fn bind_scripts_declares_page_variables() {
        let mut source = source();
        source.diagnostics_mut().set_enabled(Severity::Info, true);
        let declarations = source.bind_scripts().expect("bind");
        let declared = declarations
            .iter()
            .map(|decl| decl.symbol.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(declared, vec!["greeting", "total"]);
        assert!(declarations.iter().all(|decl| decl.frame == PAGE_FRAME));
        assert!(source.call_stack().resolve("GREETING").is_some());
        assert_eq!(
            source.messages(),
            vec!["Unresolved identifier 'len' at line 6, column 11"]
        );
    }

    #[test]
    fn bind_scripts_reports_broken_units_as_errors() {
        let mut source = CfmlSource::new("<cfscript>x = ;</cfscript><cfset y = 1>").expect("build");
        let declarations = source.bind_scripts().expect("bind");
        assert_eq!(declarations.len(), 1);
        assert_eq!(source.diagnostics().count(Severity::Error), 1);
        assert!(source.messages()[0].starts_with("Script error in <cfscript> at line 1, column 15"));
    }

    #[test]
    fn emitted_diagnostics_follow_enabled_channels() {
        let mut source = source();
        source.emit_diagnostic(Severity::Warn, "custom warning");
        source.emit_diagnostic(Severity::Debug, "hidden");
        assert_eq!(source.messages(), vec!["custom warning"]);
        assert_eq!(source.diagnostic_entries()[0].severity, Severity::Warn);
    }

    #[test]
    fn unmatched_end_tag_is_collected_not_raised() {
        let source = CfmlSource::new("<cfoutput>x</cfif></cfoutput>").expect("build");
        assert_eq!(source.all_tags().len(), 1);
        assert_eq!(source.messages().len(), 1);
        assert!(source.messages()[0].starts_with("Unmatched end tag </cfif>"));
    }

    #[test]
    fn debugging_info_lists_every_tag() {
        let source = source();
        let info = source.debugging_info();
        assert_eq!(info.lines().count(), 5);
        assert!(info.starts_with("<cfset> 1:1 "));
    }

    #[test]
    fn loads_from_path_reader_and_file_url() {
        let path = temp_path("page.cfm");
        fs::write(&path, PAGE).expect("write page");

        let from_path = CfmlSource::from_path(&path, ParserPreferences::default()).expect("path");
        assert_eq!(from_path.contents(), PAGE);

        let from_reader =
            CfmlSource::from_reader(PAGE.as_bytes(), ParserPreferences::default()).expect("reader");
        assert_eq!(from_reader.all_tags().len(), 5);

        let url = Url::from_file_path(&path).expect("absolute path");
        let from_url =
            CfmlSource::from_location(url.as_str(), ParserPreferences::default()).expect("url");
        assert_eq!(from_url.all_tags().len(), 5);
    }

    #[test]
    fn loading_failures_have_codes() {
        let missing = CfmlSource::from_path(temp_path("missing"), ParserPreferences::default())
            .expect_err("missing file");
        assert_eq!(missing.code, "SOURCE_READ");

        let remote = CfmlSource::from_location(
            "http://example.com/index.cfm",
            ParserPreferences::default(),
        )
        .expect_err("remote url");
        assert_eq!(remote.code, "SOURCE_SCHEME_UNSUPPORTED");

        let invalid = CfmlSource::from_location("not a url", ParserPreferences::default())
            .expect_err("invalid url");
        assert_eq!(invalid.code, "SOURCE_LOCATION");
    }

    #[test]
    fn invalid_vocabulary_fails_session_construction() {
        let prefs = ParserPreferences {
            tag_vocabulary: vec!["(".to_string()],
            ..ParserPreferences::default()
        };
        let error = CfmlSource::with_preferences("<cfset a = 1>", prefs).expect_err("bad regex");
        assert_eq!(error.code, "PREFS_PATTERN_INVALID");
    }

    #[test]
    fn page_frame_exists_from_the_start() {
        let source = CfmlSource::new("").expect("build");
        assert!(source.all_tags().is_empty());
        assert_eq!(source.call_stack().depth(), 1);
        assert!(source.call_stack().local_scope().expect("page scope").is_empty());
        assert!(source.enclosing_tag(0).is_none());
        assert!(source.previous_tag(0).is_none());
    }
}
