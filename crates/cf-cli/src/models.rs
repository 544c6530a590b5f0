use cf_parser::Tag;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TagRecord<'a> {
    pub(crate) line: usize,
    pub(crate) column: usize,
    #[serde(flatten)]
    pub(crate) tag: &'a Tag,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScanRecord {
    pub(crate) path: String,
    pub(crate) tags: usize,
    pub(crate) cfml_tags: usize,
    pub(crate) errors: usize,
    pub(crate) warnings: usize,
}
