use cf_core::LineIndex;

use crate::diagnostics::Diagnostics;
use crate::prefs::{ParserPreferences, TagVocabulary};
use crate::tag::{Element, MarkupOccurrence, Tag};
use crate::tokenizer::{describe, MarkupToken};

/// Pairs start and end tags with a stack of open elements.
///
/// An end tag closes the nearest open element with the same name; anything
/// opened after it is left unclosed. The result is sorted by start tag begin.
pub(crate) struct TreeBuilder<'a> {
    prefs: &'a ParserPreferences,
    vocabulary: &'a TagVocabulary,
    lines: &'a LineIndex,
    open: Vec<Element>,
    tags: Vec<Tag>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(
        prefs: &'a ParserPreferences,
        vocabulary: &'a TagVocabulary,
        lines: &'a LineIndex,
    ) -> Self {
        Self {
            prefs,
            vocabulary,
            lines,
            open: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub(crate) fn observe(&mut self, token: MarkupToken, diagnostics: &mut Diagnostics) {
        match token {
            MarkupToken::StartTag(start) => {
                let element = Element {
                    name: start.name,
                    start_tag: start.range,
                    end_tag: None,
                    attributes: start.attributes,
                    raw_attributes: start.raw_attributes,
                };
                if start.self_closing || self.prefs.is_void(&element.name) {
                    self.tags
                        .push(Tag::from_occurrence(MarkupOccurrence::StartTag(&element)));
                } else {
                    self.open.push(element);
                }
            }
            MarkupToken::EndTag { name, range } => {
                let matching = self
                    .open
                    .iter()
                    .rposition(|element| self.prefs.names_equal(&element.name, &name));
                let Some(index) = matching else {
                    diagnostics.error(format!(
                        "Unmatched end tag </{}> at {}",
                        name,
                        describe(self.lines, range.start)
                    ));
                    return;
                };
                while self.open.len() > index + 1 {
                    if let Some(unclosed) = self.open.pop() {
                        self.close_unterminated(unclosed, diagnostics);
                    }
                }
                if let Some(mut element) = self.open.pop() {
                    element.end_tag = Some(range);
                    self.tags
                        .push(Tag::from_occurrence(MarkupOccurrence::EndTag(&element)));
                }
            }
        }
    }

    pub(crate) fn finish(mut self, diagnostics: &mut Diagnostics) -> Vec<Tag> {
        while let Some(unclosed) = self.open.pop() {
            self.close_unterminated(unclosed, diagnostics);
        }
        self.tags.sort_by_key(|tag| tag.start_tag_begin);
        log::debug!(target: "cfml.tags", "built {} tags", self.tags.len());
        self.tags
    }

    fn close_unterminated(&mut self, element: Element, diagnostics: &mut Diagnostics) {
        if self.vocabulary.is_match(&element.name) {
            diagnostics.warn(format!(
                "Missing end tag for <{}> at {}",
                element.name,
                describe(self.lines, element.begin())
            ));
        }
        self.tags
            .push(Tag::from_occurrence(MarkupOccurrence::StartTag(&element)));
    }
}

#[cfg(test)]
mod tree_builder_tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn build(source: &str) -> (Vec<Tag>, Diagnostics) {
        let prefs = ParserPreferences::default();
        let vocabulary = prefs.vocabulary().expect("vocabulary");
        let lines = LineIndex::new(source);
        let mut diagnostics = Diagnostics::new();
        let tokens = tokenize(source, &prefs, &lines, &mut diagnostics);
        let mut builder = TreeBuilder::new(&prefs, &vocabulary, &lines);
        for token in tokens {
            builder.observe(token, &mut diagnostics);
        }
        let tags = builder.finish(&mut diagnostics);
        (tags, diagnostics)
    }

    #[test]
    fn nested_elements_pair_with_their_end_tags() {
        let source = "<cfoutput><cfif x><b>y</b></cfif></cfoutput>";
        let (tags, diagnostics) = build(source);
        assert!(diagnostics.is_empty());
        let names = tags.iter().map(|tag| tag.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["cfoutput", "cfif", "b"]);
        assert_eq!(tags[0].whole_element().end, source.len());
        assert_eq!(&source[tags[1].end_tag_begin..tags[1].end_tag_end], "</cfif>");
    }

    #[test]
    fn void_and_self_closing_tags_need_no_end_tag() {
        let (tags, diagnostics) = build("<cfset a = 1><cfinclude template=\"x.cfm\"/><br>");
        assert!(diagnostics.is_empty());
        assert_eq!(tags.len(), 3);
        assert!(tags.iter().all(|tag| !tag.has_end_tag));
    }

    #[test]
    fn unmatched_end_tag_is_an_error_diagnostic() {
        let (tags, diagnostics) = build("<p>a</cfloop></p>");
        assert_eq!(tags.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.entries()[0].message,
            "Unmatched end tag </cfloop> at line 1, column 5"
        );
    }

    #[test]
    fn unclosed_vocabulary_tags_warn_and_collapse_to_start_tag() {
        let source = "<div><cfoutput><p>text</div>";
        let (tags, diagnostics) = build(source);
        assert_eq!(diagnostics.messages().collect::<Vec<_>>(), vec![
            "Missing end tag for <cfoutput> at line 1, column 6"
        ]);
        let cfoutput = tags.iter().find(|tag| tag.name == "cfoutput").expect("cfoutput");
        assert!(!cfoutput.has_end_tag);
        assert_eq!(cfoutput.whole_element(), cfoutput.start_tag());
        let div = tags.iter().find(|tag| tag.name == "div").expect("div");
        assert_eq!(div.whole_element().end, source.len());
    }

    #[test]
    fn end_tags_match_case_insensitively_by_default() {
        let (tags, diagnostics) = build("<CFLOOP from=1 to=2></cfLoop>");
        assert!(diagnostics.is_empty());
        assert_eq!(tags.len(), 1);
        assert!(tags[0].has_end_tag);
        assert_eq!(tags[0].attribute("FROM"), Some("1"));
    }
}
