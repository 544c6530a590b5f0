use std::collections::BTreeSet;

use cf_core::CfmlError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

const DEFAULT_VOID_TAGS: &[&str] = &[
    "cfabort",
    "cfargument",
    "cfbreak",
    "cfcontinue",
    "cfelse",
    "cfelseif",
    "cfinclude",
    "cfparam",
    "cfproperty",
    "cfqueryparam",
    "cfreturn",
    "cfset",
    "cfthrow",
    "area",
    "base",
    "br",
    "col",
    "embed",
    "hr",
    "img",
    "input",
    "link",
    "meta",
    "param",
    "source",
    "track",
    "wbr",
];

const DEFAULT_RAW_BODY_TAGS: &[&str] = &["cfscript", "script", "style"];
const DEFAULT_EXPRESSION_TAGS: &[&str] = &["cfif", "cfelseif", "cfset", "cfreturn"];
const DEFAULT_SCRIPT_TAGS: &[&str] = &["cfscript"];

/// Tag vocabulary and parsing switches for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserPreferences {
    pub case_sensitive: bool,
    /// Regex patterns recognising the embedded-script tag family.
    pub tag_vocabulary: Vec<String>,
    pub void_tags: BTreeSet<String>,
    pub raw_body_tags: BTreeSet<String>,
    pub expression_tags: BTreeSet<String>,
    pub script_tags: BTreeSet<String>,
}

impl Default for ParserPreferences {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            tag_vocabulary: vec!["^cf".to_string()],
            void_tags: name_set(DEFAULT_VOID_TAGS),
            raw_body_tags: name_set(DEFAULT_RAW_BODY_TAGS),
            expression_tags: name_set(DEFAULT_EXPRESSION_TAGS),
            script_tags: name_set(DEFAULT_SCRIPT_TAGS),
        }
    }
}

fn name_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

impl ParserPreferences {
    pub fn from_json_str(raw: &str) -> Result<Self, CfmlError> {
        let prefs = serde_json::from_str::<Self>(raw).map_err(|error| {
            CfmlError::new(
                "PREFS_PARSE_ERROR",
                format!("Failed to parse parser preferences: {}", error),
            )
        })?;
        prefs.vocabulary()?;
        Ok(prefs)
    }

    pub fn vocabulary(&self) -> Result<TagVocabulary, CfmlError> {
        TagVocabulary::compile(&self.tag_vocabulary, self.case_sensitive)
    }

    /// Canonical form a tag name is stored under.
    pub fn normalize_name(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_ascii_lowercase()
        }
    }

    pub fn names_equal(&self, left: &str, right: &str) -> bool {
        if self.case_sensitive {
            left == right
        } else {
            left.eq_ignore_ascii_case(right)
        }
    }

    pub fn is_void(&self, name: &str) -> bool {
        self.set_contains(&self.void_tags, name)
    }

    pub fn is_raw_body(&self, name: &str) -> bool {
        self.set_contains(&self.raw_body_tags, name)
    }

    pub fn is_expression_tag(&self, name: &str) -> bool {
        self.set_contains(&self.expression_tags, name)
    }

    pub fn is_script_tag(&self, name: &str) -> bool {
        self.set_contains(&self.script_tags, name)
    }

    fn set_contains(&self, set: &BTreeSet<String>, name: &str) -> bool {
        if self.case_sensitive {
            set.contains(name)
        } else {
            set.iter().any(|entry| entry.eq_ignore_ascii_case(name))
        }
    }
}

/// Compiled form of [`ParserPreferences::tag_vocabulary`].
#[derive(Debug, Clone)]
pub struct TagVocabulary {
    patterns: Vec<Regex>,
}

impl TagVocabulary {
    pub fn compile(patterns: &[String], case_sensitive: bool) -> Result<Self, CfmlError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(!case_sensitive)
                    .build()
                    .map_err(|error| {
                        CfmlError::new(
                            "PREFS_PATTERN_INVALID",
                            format!("Invalid tag vocabulary pattern \"{}\": {}", pattern, error),
                        )
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(name))
    }
}
