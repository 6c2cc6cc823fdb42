// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/container.rs - Hierarchical stream containers.
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
 * # `container` Module
 *
 * Altium library files are OLE2 compound files: a tree of storages holding
 * named byte streams. The readers in this crate only need to read a stream
 * and list the children of a storage, which is what [Container] offers.
 * Compound files implement it through the `cfb` crate; [MemoryContainer]
 * holds the same tree in memory and can serialize itself to a compound file.
 *
 * Paths use `/` as separator and are compared case-insensitively.
 */

use std::collections::BTreeMap;
use std::io::prelude::*;
use std::io::{Cursor, ErrorKind, SeekFrom};

use cfb::CompoundFile;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Stream,
    Storage,
}

/// One child of a storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// Read access to a tree of named streams.
pub trait Container {
    /// Reads a whole stream. The stream is released before returning.
    fn read_stream(&mut self, path: &str) -> Result<Vec<u8>>;

    /// Lists the direct children of a storage; `""` is the root.
    fn children(&mut self, storage: &str) -> Result<Vec<ContainerEntry>>;

    /// Names of the streams directly inside `storage`.
    fn stream_names(&mut self, storage: &str) -> Result<Vec<String>> {
        Ok(self
            .children(storage)?
            .into_iter()
            .filter(|entry| entry.kind == EntryKind::Stream)
            .map(|entry| entry.name)
            .collect())
    }

    /// Names of the storages directly inside `storage`.
    fn storage_names(&mut self, storage: &str) -> Result<Vec<String>> {
        Ok(self
            .children(storage)?
            .into_iter()
            .filter(|entry| entry.kind == EntryKind::Storage)
            .map(|entry| entry.name)
            .collect())
    }
}

/// Longest name a compound-file entry may have.
pub const MAX_ENTRY_NAME: usize = 31;

/// The storage name Altium uses for a library item: `/` is not allowed in
/// entry names and long names are cut short.
pub fn section_key(name: &str) -> String {
    name.replace('/', "_").chars().take(MAX_ENTRY_NAME).collect()
}

fn absolute(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

fn missing_or_io(error: std::io::Error, path: &str) -> Error {
    match error.kind() {
        ErrorKind::NotFound | ErrorKind::InvalidInput => Error::MissingStream(path.to_string()),
        _ => Error::Io(error),
    }
}

impl<F: Read + Seek> Container for CompoundFile<F> {
    fn read_stream(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut stream = self
            .open_stream(absolute(path))
            .map_err(|e| missing_or_io(e, path))?;
        let mut buffer = Vec::new();
        stream.seek(SeekFrom::Start(0))?;
        stream.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn children(&mut self, storage: &str) -> Result<Vec<ContainerEntry>> {
        let entries = self
            .read_storage(absolute(storage))
            .map_err(|e| missing_or_io(e, storage))?;
        Ok(entries
            .map(|entry| ContainerEntry {
                name: entry.name().to_string(),
                kind: if entry.is_stream() {
                    EntryKind::Stream
                } else {
                    EntryKind::Storage
                },
            })
            .collect())
    }
}

/// Opens a compound file held in memory.
pub fn open_compound_bytes(bytes: &[u8]) -> Result<CompoundFile<Cursor<&[u8]>>> {
    CompoundFile::open(Cursor::new(bytes)).map_err(Error::Io)
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_ascii_lowercase()
}

/// An in-memory stream tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    /// Keyed by lowercased path; the value keeps the original spelling.
    streams: BTreeMap<String, (String, Vec<u8>)>,
    /// Storages created explicitly, so they exist even when empty.
    storages: BTreeMap<String, String>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a stream. Parent storages are implied by the path.
    pub fn insert(&mut self, path: &str, data: impl Into<Vec<u8>>) {
        let path = path.trim_matches('/');
        self.streams
            .insert(normalize(path), (path.to_string(), data.into()));
    }

    /// Adds a storage that exists even without streams below it.
    pub fn insert_storage(&mut self, path: &str) {
        let path = path.trim_matches('/');
        if !path.is_empty() {
            self.storages.insert(normalize(path), path.to_string());
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.streams.contains_key(&normalize(path))
    }

    /// Original spellings of every stream and explicit storage path.
    fn paths(&self) -> impl Iterator<Item = (&str, &str, EntryKind)> {
        let streams = self
            .streams
            .iter()
            .map(|(key, (path, _))| (key.as_str(), path.as_str(), EntryKind::Stream));
        let storages = self
            .storages
            .iter()
            .map(|(key, path)| (key.as_str(), path.as_str(), EntryKind::Storage));
        streams.chain(storages)
    }

    /// Loads every stream and storage of a compound file.
    pub fn from_compound_bytes(bytes: &[u8]) -> Result<Self> {
        let mut compound = open_compound_bytes(bytes)?;
        let entries: Vec<(String, bool)> = compound
            .walk()
            .map(|entry| {
                let path = entry.path().to_string_lossy().replace('\\', "/");
                (path, entry.is_stream())
            })
            .collect();

        let mut container = Self::new();
        for (path, is_stream) in entries {
            if is_stream {
                let data = Container::read_stream(&mut compound, &path)?;
                container.insert(&path, data);
            } else {
                container.insert_storage(&path);
            }
        }
        Ok(container)
    }

    /// Serializes the tree as a compound file.
    pub fn to_compound_bytes(&self) -> Result<Vec<u8>> {
        let mut compound = CompoundFile::create(Cursor::new(Vec::new()))?;

        for (_, path, kind) in self.paths() {
            let components: Vec<&str> = path.split('/').collect();
            let depth = match kind {
                EntryKind::Stream => components.len() - 1,
                EntryKind::Storage => components.len(),
            };
            for depth in 1..=depth {
                let storage = absolute(&components[..depth].join("/"));
                if !compound.exists(&storage) {
                    compound.create_storage(&storage)?;
                }
            }
        }

        for (path, data) in self.streams.values() {
            let mut stream = compound.create_stream(absolute(path))?;
            stream.write_all(data)?;
        }

        compound.flush()?;
        Ok(compound.into_inner().into_inner())
    }
}

impl Container for MemoryContainer {
    fn read_stream(&mut self, path: &str) -> Result<Vec<u8>> {
        self.streams
            .get(&normalize(path))
            .map(|(_, data)| data.clone())
            .ok_or_else(|| Error::MissingStream(path.to_string()))
    }

    fn children(&mut self, storage: &str) -> Result<Vec<ContainerEntry>> {
        let prefix = match normalize(storage) {
            root if root.is_empty() => root,
            storage => format!("{}/", storage),
        };

        let mut exists = prefix.is_empty();
        let mut children: Vec<ContainerEntry> = Vec::new();
        for (key, path, entry_kind) in self.paths() {
            if format!("{}/", key) == prefix {
                exists = true;
                continue;
            }
            if !key.starts_with(&prefix) {
                continue;
            }
            exists = true;
            let original = &path[prefix.len()..];
            let (name, kind) = match original.split_once('/') {
                Some((name, _)) => (name, EntryKind::Storage),
                None => (original, entry_kind),
            };
            if !children
                .iter()
                .any(|child| child.name.eq_ignore_ascii_case(name) && child.kind == kind)
            {
                children.push(ContainerEntry {
                    name: name.to_string(),
                    kind,
                });
            }
        }

        if !exists {
            return Err(Error::MissingStream(storage.to_string()));
        }
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryContainer {
        let mut container = MemoryContainer::new();
        container.insert("Version.txt", b"PCB6\0".to_vec());
        container.insert("SchLib/RES", b"res".to_vec());
        container.insert("SchLib/CAP", b"cap".to_vec());
        container.insert("SchLib/Nested/Data", b"data".to_vec());
        container
    }

    #[test]
    fn section_keys() {
        assert_eq!(section_key("RES/0603"), "RES_0603");
        assert_eq!(
            section_key("A_VERY_LONG_LIBRARY_REFERENCE_NAME_X"),
            "A_VERY_LONG_LIBRARY_REFERENCE_N"
        );
    }

    #[test]
    fn memory_paths_are_case_insensitive() {
        let mut container = sample();
        assert_eq!(container.read_stream("/version.TXT").unwrap(), b"PCB6\0");
        assert!(matches!(
            container.read_stream("Missing"),
            Err(Error::MissingStream(_))
        ));
    }

    #[test]
    fn memory_children() {
        let mut container = sample();
        let mut streams = container.stream_names("schlib").unwrap();
        streams.sort();
        assert_eq!(streams, vec!["CAP", "RES"]);
        assert_eq!(container.storage_names("SchLib").unwrap(), vec!["Nested"]);
        assert_eq!(container.storage_names("").unwrap(), vec!["SchLib"]);
        assert!(matches!(
            container.children("PCBLib"),
            Err(Error::MissingStream(_))
        ));
    }

    #[test]
    fn empty_storages_exist() {
        let mut container = sample();
        container.insert_storage("PCBLib");
        container.insert_storage("/SchLib/Nested/");
        assert!(container.stream_names("pcblib").unwrap().is_empty());
        assert_eq!(container.storage_names("SchLib").unwrap(), vec!["Nested"]);

        let mut root = container.storage_names("").unwrap();
        root.sort();
        assert_eq!(root, vec!["PCBLib", "SchLib"]);

        let bytes = container.to_compound_bytes().unwrap();
        let mut compound = open_compound_bytes(&bytes).unwrap();
        assert!(compound.children("PCBLib").unwrap().is_empty());

        let mut reloaded = MemoryContainer::from_compound_bytes(&bytes).unwrap();
        assert!(reloaded.stream_names("PCBLib").unwrap().is_empty());
        assert!(matches!(
            reloaded.children("Missing"),
            Err(Error::MissingStream(_))
        ));
    }

    #[test]
    fn compound_file_round_trip() {
        let bytes = sample().to_compound_bytes().unwrap();

        let mut compound = open_compound_bytes(&bytes).unwrap();
        assert_eq!(compound.read_stream("SchLib/Nested/Data").unwrap(), b"data");
        let mut streams = compound.stream_names("SchLib").unwrap();
        streams.sort();
        assert_eq!(streams, vec!["CAP", "RES"]);
        assert!(matches!(
            compound.read_stream("SchLib/Missing"),
            Err(Error::MissingStream(_))
        ));

        let mut reloaded = MemoryContainer::from_compound_bytes(&bytes).unwrap();
        assert_eq!(reloaded.read_stream("schlib/res").unwrap(), b"res");
    }
}
