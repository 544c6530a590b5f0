//! Insertion-ordered string-keyed map with an optional case-insensitive key mode.
//!
//! In case-insensitive mode keys are stored in their lowercase form, so
//! `put("Foo", ..)` followed by `put("FOO", ..)` overwrites a single entry whose
//! stored key is `"foo"`. Iteration follows the first insertion of each
//! normalized key; removing a key and inserting it again moves it to the end.

use std::borrow::Cow;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

pub const CASE_SENSITIVE: bool = true;
pub const CASE_INSENSITIVE: bool = false;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseMap<V> {
    case_sensitive: bool,
    entries: IndexMap<String, V>,
}

/// Stored entries are re-inserted through [`CaseMap::put`], so keys read from
/// JSON are normalized like any other insertion.
impl<'de, V: Deserialize<'de>> Deserialize<'de> for CaseMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Stored<T> {
            case_sensitive: bool,
            entries: IndexMap<String, T>,
        }

        let stored = Stored::<V>::deserialize(deserializer)?;
        let mut map = Self::new(stored.case_sensitive);
        for (key, value) in stored.entries {
            map.put(&key, value);
        }
        Ok(map)
    }
}

impl<V> Default for CaseMap<V> {
    fn default() -> Self {
        Self::new(CASE_SENSITIVE)
    }
}

impl<V> CaseMap<V> {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            entries: IndexMap::new(),
        }
    }

    pub fn case_sensitive() -> Self {
        Self::new(CASE_SENSITIVE)
    }

    pub fn case_insensitive() -> Self {
        Self::new(CASE_INSENSITIVE)
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn normalize<'a>(&self, key: &'a str) -> Cow<'a, str> {
        if self.case_sensitive {
            Cow::Borrowed(key)
        } else {
            Cow::Owned(key.to_lowercase())
        }
    }

    /// Inserts `value`, returning the value previously stored under an equivalent key.
    pub fn put(&mut self, key: &str, value: V) -> Option<V> {
        let key = self.normalize(key).into_owned();
        self.entries.insert(key, value)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(&*self.normalize(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let key = self.normalize(key).into_owned();
        self.entries.get_mut(&key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&*self.normalize(key))
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let key = self.normalize(key).into_owned();
        self.entries.shift_remove(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Copies every entry of `other` into `self`, normalizing keys with this map's mode.
    pub fn put_all(&mut self, other: &CaseMap<V>)
    where
        V: Clone,
    {
        for (key, value) in other.iter() {
            self.put(key, value.clone());
        }
    }
}

impl<V, K: AsRef<str>> Extend<(K, V)> for CaseMap<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key.as_ref(), value);
        }
    }
}

/// Collects into a case-sensitive map.
impl<V, K: AsRef<str>> FromIterator<(K, V)> for CaseMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::case_sensitive();
        map.extend(iter);
        map
    }
}
