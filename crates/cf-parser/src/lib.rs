pub mod diagnostics;
pub mod prefs;
pub mod tag;
pub mod tag_tree;
mod tokenizer;
mod tree_builder;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use prefs::{ParserPreferences, TagVocabulary};
pub use tag::{Element, MarkupOccurrence, Tag};
pub use tag_tree::TagTree;
