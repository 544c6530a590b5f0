//! Position index over every tag of one source text.

use std::fmt::Write as _;

use cf_core::{CfmlError, LineIndex};

use crate::diagnostics::Diagnostics;
use crate::prefs::{ParserPreferences, TagVocabulary};
use crate::tag::Tag;
use crate::tokenizer::tokenize;
use crate::tree_builder::TreeBuilder;

#[derive(Debug, Clone)]
pub struct TagTree {
    tags: Vec<Tag>,
    /// `(offset, tag index)` for every start tag and explicit end tag, by offset.
    boundaries: Vec<(usize, usize)>,
    case_sensitive: bool,
    vocabulary: TagVocabulary,
}

impl TagTree {
    /// Builds the index. Malformed markup only produces diagnostics; the error
    /// path is reserved for invalid preferences.
    pub fn build(
        text: &str,
        prefs: &ParserPreferences,
        lines: &LineIndex,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, CfmlError> {
        let vocabulary = prefs.vocabulary()?;
        let tokens = tokenize(text, prefs, lines, diagnostics);
        let mut builder = TreeBuilder::new(prefs, &vocabulary, lines);
        for token in tokens {
            builder.observe(token, diagnostics);
        }
        let tags = builder.finish(diagnostics);

        let mut boundaries = Vec::with_capacity(tags.len() * 2);
        for (index, tag) in tags.iter().enumerate() {
            boundaries.push((tag.start_tag_begin, index));
            if tag.has_end_tag {
                boundaries.push((tag.end_tag_begin, index));
            }
        }
        boundaries.sort_unstable();

        Ok(Self {
            tags,
            boundaries,
            case_sensitive: prefs.case_sensitive,
            vocabulary,
        })
    }

    pub fn all_tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags_by_name_prefix(&self, prefix: &str) -> Vec<&Tag> {
        self.tags
            .iter()
            .filter(|tag| self.name_has_prefix(&tag.name, prefix))
            .collect()
    }

    /// Tags whose name matches the configured vocabulary.
    pub fn vocabulary_tags(&self) -> Vec<&Tag> {
        self.tags
            .iter()
            .filter(|tag| self.vocabulary.is_match(&tag.name))
            .collect()
    }

    fn name_has_prefix(&self, name: &str, prefix: &str) -> bool {
        if self.case_sensitive {
            return name.starts_with(prefix);
        }
        name.len() >= prefix.len()
            && name.is_char_boundary(prefix.len())
            && name[..prefix.len()].eq_ignore_ascii_case(prefix)
    }

    /// Innermost tag whose whole-element range strictly contains `offset`.
    pub fn enclosing_tag(&self, offset: usize) -> Option<&Tag> {
        let upper = self.tags.partition_point(|tag| tag.start_tag_begin < offset);
        self.tags[..upper]
            .iter()
            .rev()
            .find(|tag| tag.whole_element().strictly_contains(offset))
    }

    /// First tag with a start or end tag beginning at or after `offset`.
    pub fn next_tag(&self, offset: usize) -> Option<&Tag> {
        let index = self
            .boundaries
            .partition_point(|(boundary, _)| *boundary < offset);
        self.boundaries
            .get(index)
            .map(|(_, tag_index)| &self.tags[*tag_index])
    }

    /// Nearest tag before `offset` that is not the tag enclosing `offset`.
    ///
    /// Inside the enclosing tag's own end tag the search starts in front of that
    /// end tag. When the nearest tag is the enclosing tag itself there is no
    /// earlier sibling, so the search restarts in front of its start tag.
    pub fn previous_tag(&self, offset: usize) -> Option<&Tag> {
        let Some(enclosing) = self.enclosing_tag(offset) else {
            return self.tag_at_or_before(offset);
        };
        let limit = if enclosing.has_end_tag && offset >= enclosing.end_tag_begin {
            enclosing.end_tag_begin.checked_sub(1)?
        } else {
            offset
        };
        let candidate = self.tag_at_or_before(limit)?;
        if candidate.start_tag_begin == enclosing.start_tag_begin {
            let before = enclosing.start_tag_begin.checked_sub(1)?;
            return self.tag_at_or_before(before);
        }
        Some(candidate)
    }

    fn tag_at_or_before(&self, offset: usize) -> Option<&Tag> {
        let index = self
            .boundaries
            .partition_point(|(boundary, _)| *boundary <= offset);
        let (_, tag_index) = *self.boundaries.get(index.checked_sub(1)?)?;
        Some(&self.tags[tag_index])
    }

    /// Tag whose start tag span contains `offset`.
    pub fn tag_at(&self, offset: usize) -> Option<&Tag> {
        let index = self
            .tags
            .partition_point(|tag| tag.start_tag_begin <= offset);
        let tag = self.tags.get(index.checked_sub(1)?)?;
        tag.start_tag().contains(offset).then_some(tag)
    }

    /// One line per tag with its name and spans, in document order.
    pub fn debug_listing(&self, lines: &LineIndex) -> String {
        let mut out = String::new();
        for tag in &self.tags {
            let location = lines.location(tag.start_tag_begin);
            let _ = writeln!(
                out,
                "<{}> {}:{} start=[{},{}) end=[{},{}) content=({},{})",
                tag.name,
                location.line,
                location.column,
                tag.start_tag_begin,
                tag.start_tag_end,
                tag.end_tag_begin,
                tag.end_tag_end,
                tag.content_begin,
                tag.content_end
            );
        }
        out
    }
}
