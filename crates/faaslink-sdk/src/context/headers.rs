// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Ordered multi-value maps for headers and query parameters.

use percent_encoding::percent_decode_str;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct MultiMap {
    entries: Vec<(String, Vec<String>)>,
}

impl MultiMap {
    fn position(&self, name: &str, fold_case: bool) -> Option<usize> {
        self.entries.iter().position(|(key, _)| {
            if fold_case {
                key.eq_ignore_ascii_case(name)
            } else {
                key == name
            }
        })
    }

    fn get_all(&self, name: &str, fold_case: bool) -> &[String] {
        match self.position(name, fold_case) {
            Some(idx) => &self.entries[idx].1,
            None => &[],
        }
    }

    fn add(&mut self, name: String, value: String, fold_case: bool) {
        match self.position(&name, fold_case) {
            Some(idx) => self.entries[idx].1.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    fn set(&mut self, name: String, values: Vec<String>, fold_case: bool) {
        match self.position(&name, fold_case) {
            Some(idx) => self.entries[idx].1 = values,
            None => self.entries.push((name, values)),
        }
    }

    fn remove(&mut self, name: &str, fold_case: bool) -> Option<Vec<String>> {
        self.position(name, fold_case)
            .map(|idx| self.entries.remove(idx).1)
    }
}

/// HTTP headers: insertion ordered, multi-valued, case-insensitive names.
///
/// The first spelling of a name is kept; later additions under a different
/// case are appended to the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(MultiMap);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.0.get_all(name, true)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.position(name, true).is_some()
    }

    /// Append a value, keeping any existing ones.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.add(name.into(), value.into(), true);
    }

    /// Replace all values for `name` with a single value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.set(name.into(), vec![value.into()], true);
    }

    pub fn set_all(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.0.set(name.into(), values, true);
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.0.remove(name, true)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.add(k, v);
        }
        headers
    }
}

/// Query parameters: insertion ordered, multi-valued, case-sensitive names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(MultiMap);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// A leading `?` is ignored; `+` decodes to a space.
    pub fn parse(query: &str) -> Self {
        let mut params = QueryParams::new();
        params.extend_from_query(query);
        params
    }

    pub fn extend_from_query(&mut self, query: &str) {
        let query = query.strip_prefix('?').unwrap_or(query);
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            self.add(decode_component(key), decode_component(value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.0.get_all(name, false)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.position(name, false).is_some()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.add(name.into(), value.into(), false);
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.set(name.into(), vec![value.into()], false);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.entries.is_empty()
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
