use cf_core::{ByteRange, CaseMap};
use serde::Serialize;

/// A start tag paired with its end tag, as produced by the tree builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub start_tag: ByteRange,
    pub end_tag: Option<ByteRange>,
    pub attributes: CaseMap<String>,
    pub raw_attributes: String,
}

impl Element {
    pub fn begin(&self) -> usize {
        self.start_tag.start
    }

    pub fn end(&self) -> usize {
        self.end_tag.unwrap_or(self.start_tag).end
    }
}

/// How the tree builder reached an element: through its start tag (the element
/// never got an end tag) or through the end tag that closed it.
#[derive(Debug, Clone, Copy)]
pub enum MarkupOccurrence<'a> {
    StartTag(&'a Element),
    EndTag(&'a Element),
}

/// One tag occurrence with its recorded positions.
///
/// `content_begin`/`content_end` hold the element's end and begin offsets, in
/// that order, for tags derived from markup. Tags built with [`Tag::new`] hold
/// `start_tag_begin`/`end_tag_end` instead. The four start/end tag offsets are
/// always in natural order. A tag without an end tag reuses its start tag span
/// as end tag span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    pub content_begin: usize,
    pub content_end: usize,
    pub start_tag_begin: usize,
    pub start_tag_end: usize,
    pub end_tag_begin: usize,
    pub end_tag_end: usize,
    pub has_end_tag: bool,
    pub attributes: CaseMap<String>,
    pub raw_attributes: String,
}

impl Tag {
    pub fn new(
        name: impl Into<String>,
        start_tag_begin: usize,
        start_tag_end: usize,
        end_tag_begin: usize,
        end_tag_end: usize,
        attributes: CaseMap<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content_begin: start_tag_begin,
            content_end: end_tag_end,
            start_tag_begin,
            start_tag_end,
            end_tag_begin,
            end_tag_end,
            has_end_tag: (end_tag_begin, end_tag_end) != (start_tag_begin, start_tag_end),
            attributes,
            raw_attributes: String::new(),
        }
    }

    pub fn from_occurrence(occurrence: MarkupOccurrence<'_>) -> Self {
        let element = match occurrence {
            MarkupOccurrence::StartTag(element) | MarkupOccurrence::EndTag(element) => element,
        };
        let end_tag = element.end_tag.unwrap_or(element.start_tag);
        Self {
            name: element.name.clone(),
            content_begin: element.end(),
            content_end: element.begin(),
            start_tag_begin: element.start_tag.start,
            start_tag_end: element.start_tag.end,
            end_tag_begin: end_tag.start,
            end_tag_end: end_tag.end,
            has_end_tag: element.end_tag.is_some(),
            attributes: element.attributes.clone(),
            raw_attributes: element.raw_attributes.clone(),
        }
    }

    pub fn start_tag(&self) -> ByteRange {
        ByteRange::new(self.start_tag_begin, self.start_tag_end)
    }

    pub fn end_tag(&self) -> ByteRange {
        ByteRange::new(self.end_tag_begin, self.end_tag_end)
    }

    /// From start tag begin to end tag end (start tag end without an end tag).
    pub fn whole_element(&self) -> ByteRange {
        ByteRange::new(self.start_tag_begin, self.end_tag_end.max(self.start_tag_end))
    }

    /// Text strictly between the start tag and the end tag; empty without an end tag.
    pub fn body(&self) -> ByteRange {
        if self.has_end_tag {
            ByteRange::new(self.start_tag_end, self.end_tag_begin)
        } else {
            ByteRange::new(self.start_tag_end, self.start_tag_end)
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}
