// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/parameters.rs - Ordered key/value parameter lists used by Altium records.
 *  Copyright (C) 2026  Forest Crossman <cyrozap@gmail.com>
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

/*!
 * # `parameters` Module
 *
 * Every Altium record is stored as a `|KEY=VALUE|KEY=VALUE...` list
 * terminated by a NUL byte. [ParameterCollection] keeps the pairs in file
 * order, looks keys up case-insensitively and hands out [Parameter]
 * accessors whose typed coercions fall back to a default instead of failing.
 *
 * ## Usage Example
 *
 * ```
 * use altiumlib::parameters::ParameterCollection;
 *
 * let p = ParameterCollection::from_bytes(b"|RECORD=29|LOCKED=T|SIZE=x\0").unwrap();
 * assert_eq!(p.get("record").as_int_or_default(), 29);
 * assert!(p.get("Locked").as_bool());
 * assert_eq!(p.get("SIZE").as_int_or(2), 2);
 * assert_eq!(p.get("MISSING").as_str_or("*"), "*");
 * ```
 */

use std::borrow::Cow;
use std::fmt;

use tracing::trace;

use crate::binary::{decode_text, encode_text};
use crate::error::{Error, Result};

const UTF8_PREFIX: &str = "%UTF8%";

/// Integer-backed enumerations stored in parameter values.
pub trait ParameterEnum: Sized + Copy + Default + PartialEq {
    fn from_i32(value: i32) -> Option<Self>;

    fn to_i32(self) -> i32;

    /// Some writers spell enumerations out by name.
    fn from_name(_name: &str) -> Option<Self> {
        None
    }
}

/// Values that can be written into a [ParameterCollection].
pub trait ParameterValue {
    fn to_parameter_string(&self) -> String;

    /// Whether the canonical writer leaves this value out.
    fn is_default_value(&self) -> bool;
}

impl ParameterValue for i32 {
    fn to_parameter_string(&self) -> String {
        self.to_string()
    }

    fn is_default_value(&self) -> bool {
        *self == 0
    }
}

impl ParameterValue for bool {
    fn to_parameter_string(&self) -> String {
        (if *self { "T" } else { "F" }).to_string()
    }

    fn is_default_value(&self) -> bool {
        !*self
    }
}

impl ParameterValue for &str {
    fn to_parameter_string(&self) -> String {
        self.to_string()
    }

    fn is_default_value(&self) -> bool {
        self.is_empty()
    }
}

impl ParameterValue for String {
    fn to_parameter_string(&self) -> String {
        self.clone()
    }

    fn is_default_value(&self) -> bool {
        self.is_empty()
    }
}

impl ParameterValue for &String {
    fn to_parameter_string(&self) -> String {
        (*self).clone()
    }

    fn is_default_value(&self) -> bool {
        self.is_empty()
    }
}

/// Outcome of a typed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The key was present and its value parsed.
    Parsed(T),
    /// The key was present but its value did not parse.
    Malformed(String),
    /// The key was not present.
    Absent,
}

impl<T> Lookup<T> {
    /// The parsed value, or `default` when absent or malformed.
    pub fn or(self, default: T) -> T {
        match self {
            Lookup::Parsed(value) => value,
            Lookup::Malformed(_) | Lookup::Absent => default,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Lookup::Parsed(_))
    }

    /// Turns the lookup into an error for callers that cannot continue
    /// without the value.
    pub fn required(self, key: &str) -> Result<T> {
        match self {
            Lookup::Parsed(value) => Ok(value),
            Lookup::Malformed(value) => Err(Error::MalformedParameter {
                key: key.to_string(),
                value,
            }),
            Lookup::Absent => Err(Error::InvalidRecord(format!("missing {}", key))),
        }
    }
}

/// Accessor for one key of a [ParameterCollection]. Absent keys still yield
/// an accessor; the typed coercions decide what "missing" means.
#[derive(Debug, Clone)]
pub struct Parameter<'a> {
    key: &'a str,
    value: Option<Cow<'a, str>>,
}

impl<'a> Parameter<'a> {
    pub fn key(&self) -> &str {
        self.key
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    pub fn raw(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn parse<T>(&self, parse: impl FnOnce(&str) -> Option<T>) -> Lookup<T> {
        match self.value.as_deref() {
            None => Lookup::Absent,
            Some(raw) => match parse(raw) {
                Some(value) => Lookup::Parsed(value),
                None => {
                    trace!(key = self.key, value = raw, "Malformed parameter, using default");
                    Lookup::Malformed(raw.to_string())
                }
            },
        }
    }

    pub fn as_int(&self) -> Lookup<i32> {
        self.parse(|raw| raw.trim().parse::<i32>().ok())
    }

    pub fn as_int_or(&self, default: i32) -> i32 {
        self.as_int().or(default)
    }

    pub fn as_int_or_default(&self) -> i32 {
        self.as_int_or(0)
    }

    pub fn as_str_or(&self, default: &str) -> String {
        self.value.as_deref().unwrap_or(default).to_string()
    }

    pub fn as_str_or_default(&self) -> String {
        self.as_str_or("")
    }

    /// True for `T`, `TRUE`, `Y`, `YES` and `1` in any case; false otherwise.
    pub fn as_bool(&self) -> bool {
        self.value.as_deref().is_some_and(|raw| {
            let raw = raw.trim();
            ["T", "TRUE", "Y", "YES", "1"]
                .iter()
                .any(|truthy| raw.eq_ignore_ascii_case(truthy))
        })
    }

    pub fn as_enum<T: ParameterEnum>(&self) -> Lookup<T> {
        self.parse(|raw| {
            let raw = raw.trim();
            match raw.parse::<i32>() {
                Ok(value) => T::from_i32(value),
                Err(_) => T::from_name(raw),
            }
        })
    }

    pub fn as_enum_or<T: ParameterEnum>(&self, default: T) -> T {
        self.as_enum().or(default)
    }

    pub fn as_enum_or_default<T: ParameterEnum>(&self) -> T {
        self.as_enum_or(T::default())
    }
}

/// An ordered, case-insensitive list of `KEY=VALUE` pairs.
///
/// New pairs are written at the bookmark when one is set, otherwise at the
/// end. [ParameterCollection::move_key] relocates already-written pairs to the
/// bookmark so exports can match the canonical writer's key order.
#[derive(Debug, Clone, Default)]
pub struct ParameterCollection {
    entries: Vec<(String, String)>,
    bookmark: Option<usize>,
}

impl PartialEq for ParameterCollection {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for ParameterCollection {}

impl ParameterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the body of a parameter block. Anything after the first NUL is
    /// padding and is ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'|')
            .quoting(false)
            .flexible(true)
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\0'))
            .from_reader(&bytes[..end]);

        let mut parameters = Self::new();
        for result in reader.byte_records() {
            let record = result.map_err(|e| Error::InvalidRecord(e.to_string()))?;
            for field in record.iter().filter(|field| !field.is_empty()) {
                let (key, value) = match field.iter().position(|&b| b == b'=') {
                    Some(split) => (&field[..split], &field[split + 1..]),
                    None => (field, &b""[..]),
                };
                parameters
                    .entries
                    .push((decode_text(key), decode_text(value)));
            }
        }

        Ok(parameters)
    }

    /// The block body as the canonical writer lays it out, NUL included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = encode_text(&self.to_string());
        bytes.push(0);
        bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Looks up `key`. A `%UTF8%` twin of the key wins over the plain one.
    pub fn get<'a>(&'a self, key: &'a str) -> Parameter<'a> {
        let utf8 = self
            .entries
            .iter()
            .find(|(k, _)| {
                k.get(..UTF8_PREFIX.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(UTF8_PREFIX))
                    && k.get(UTF8_PREFIX.len()..)
                        .is_some_and(|rest| rest.eq_ignore_ascii_case(key))
            })
            .map(|(_, v)| Cow::Owned(String::from_utf8_lossy(&encode_text(v)).into_owned()));

        let value =
            utf8.or_else(|| self.position(key).map(|i| Cow::Borrowed(self.entries[i].1.as_str())));

        Parameter { key, value }
    }

    fn insert_at_cursor(&mut self, key: &str, value: String) {
        match self.bookmark {
            Some(index) if index <= self.entries.len() => {
                self.entries.insert(index, (key.to_string(), value));
                self.bookmark = Some(index + 1);
            }
            _ => self.entries.push((key.to_string(), value)),
        }
    }

    /// Writes `value` unless it is the type's default, which the canonical
    /// writer leaves out.
    pub fn add(&mut self, key: &str, value: impl ParameterValue) {
        if !value.is_default_value() {
            self.insert_at_cursor(key, value.to_parameter_string());
        }
    }

    /// Writes `value` even when it is the type's default.
    pub fn add_always(&mut self, key: &str, value: impl ParameterValue) {
        self.insert_at_cursor(key, value.to_parameter_string());
    }

    pub fn add_enum<T: ParameterEnum>(&mut self, key: &str, value: T) {
        self.add(key, value.to_i32());
    }

    /// Replaces the value of an existing key in place, or adds it.
    pub fn set(&mut self, key: &str, value: impl ParameterValue) {
        match self.position(key) {
            Some(index) => self.entries[index].1 = value.to_parameter_string(),
            None => self.add_always(key, value),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.position(key)?;
        if let Some(bookmark) = self.bookmark.as_mut() {
            if index < *bookmark {
                *bookmark -= 1;
            }
        }
        Some(self.entries.remove(index).1)
    }

    /// Marks the current end of the list as the write cursor.
    pub fn set_bookmark(&mut self) {
        self.bookmark = Some(self.entries.len());
    }

    pub fn clear_bookmark(&mut self) {
        self.bookmark = None;
    }

    /// Moves an existing pair to the bookmark and advances the bookmark past
    /// it. Returns false, changing nothing, when the key is absent.
    pub fn move_key(&mut self, key: &str) -> bool {
        let Some(index) = self.position(key) else {
            return false;
        };
        let entry = self.entries.remove(index);

        let mut target = self.bookmark.unwrap_or(self.entries.len());
        if index < target {
            target -= 1;
        }
        let target = target.min(self.entries.len());
        self.entries.insert(target, entry);
        self.bookmark = Some(target + 1);
        true
    }

    /// [ParameterCollection::move_key] for each key, in order.
    pub fn move_keys(&mut self, keys: &[&str]) {
        for key in keys {
            self.move_key(key);
        }
    }
}

impl fmt::Display for ParameterCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            write!(f, "|{}={}", key, value)?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterCollection {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            bookmark: None,
        }
    }
}
