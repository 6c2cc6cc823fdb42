// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/schlib.rs - Schematic library codec.
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
 * # `schlib` Module
 *
 * A schematic library is a compound file of its own:
 *
 * - `FileHeader`: a parameter block listing the components (`COMPCOUNT`,
 *   `LIBREF<i>`, `COMPDESCR<i>`, `PARTCOUNT<i>`),
 * - `SectionKeys` (optional): maps library references whose names do not fit
 *   an entry name to the storage that holds them,
 * - `<section>/Data`: a run of blocks. The first is the component record, the
 *   rest are its primitives.
 *
 * Blocks with a nonzero flag byte hold binary records, which are skipped.
 */

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::binary::{BinaryReader, BinaryWriter};
use crate::container::{open_compound_bytes, section_key, Container, MemoryContainer};
use crate::error::{Error, Result};
use crate::intlib::SubDocumentCodec;
use crate::parameters::ParameterCollection;
use crate::records::{RecordRegistry, SchComponent, SchRecord};

pub const SCHLIB_HEADER: &str =
    "Protel for Windows - Schematic Library Editor Binary File Version 5.0";

const FILE_HEADER: &str = "FileHeader";
const SECTION_KEYS: &str = "SectionKeys";
const DATA: &str = "Data";

/// A decoded schematic library.
#[derive(Debug, Default)]
pub struct SchLib {
    /// The `FileHeader` parameters as read. Rebuilt from the components on
    /// encode.
    pub header: ParameterCollection,
    pub components: Vec<SchComponent>,
}

impl SchLib {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a component by library reference, ignoring case.
    pub fn component(&self, lib_reference: &str) -> Option<&SchComponent> {
        self.components
            .iter()
            .find(|c| c.lib_reference.eq_ignore_ascii_case(lib_reference))
    }

    fn build_header(&self) -> ParameterCollection {
        let weight: usize = self.components.iter().map(|c| 1 + c.primitives.len()).sum();

        let mut header = ParameterCollection::new();
        header.add_always("HEADER", SCHLIB_HEADER);
        header.add_always("WEIGHT", weight as i32);
        header.add_always("COMPCOUNT", self.components.len() as i32);
        for (i, component) in self.components.iter().enumerate() {
            header.add_always(&format!("LIBREF{}", i), &component.lib_reference);
            header.add(&format!("COMPDESCR{}", i), &component.component_description);
            header.add_always(&format!("PARTCOUNT{}", i), component.part_count.saturating_add(1));
        }
        header
    }
}

/// Reads and writes [SchLib] documents.
#[derive(Debug, Clone, Default)]
pub struct SchLibCodec {
    registry: RecordRegistry,
}

impl SchLibCodec {
    pub fn new(registry: RecordRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RecordRegistry {
        &self.registry
    }

    /// Decodes a library from an already opened container.
    pub fn read_container<C: Container>(&self, container: &mut C) -> Result<SchLib> {
        let header = BinaryReader::new(&container.read_stream(FILE_HEADER)?)
            .read_parameters_block()?;
        let sections = read_section_keys(container)?;

        let count = header.get("COMPCOUNT").as_int_or_default().max(0);
        let mut components = Vec::new();
        for i in 0..count {
            let key = format!("LIBREF{}", i);
            let lib_ref = header
                .get(&key)
                .raw()
                .map(String::from)
                .ok_or_else(|| Error::InvalidRecord(format!("{} lacks {}", FILE_HEADER, key)))?;

            let section = sections
                .get(&lib_ref.to_ascii_lowercase())
                .cloned()
                .unwrap_or_else(|| section_key(&lib_ref));

            let mut component = self.read_component(container, &section)?;
            if component.lib_reference.is_empty() {
                component.lib_reference = lib_ref;
            }
            components.push(component);
        }

        debug!("Read {} schematic components", components.len());
        Ok(SchLib { header, components })
    }

    fn read_component<C: Container>(
        &self,
        container: &mut C,
        section: &str,
    ) -> Result<SchComponent> {
        let data = container.read_stream(&format!("{}/{}", section, DATA))?;
        let mut reader = BinaryReader::new(&data);

        let mut component: Option<SchComponent> = None;
        while !reader.is_empty() {
            let block = reader.read_block(|inner, header| {
                if header.flags != 0 {
                    trace!("Skipping binary record with flags {:#04x}", header.flags);
                    return Ok(None);
                }
                ParameterCollection::from_bytes(inner.read_to_end()).map(Some)
            })?;
            let Some(p) = block else {
                continue;
            };

            match component.as_mut() {
                Some(component) => component.add_primitive(self.registry.decode(&p)?),
                None => {
                    let record = p.get("RECORD").as_int().required("RECORD")?;
                    if record != SchComponent::RECORD {
                        return Err(Error::InvalidRecord(format!(
                            "{} starts with record {} instead of a component",
                            section, record
                        )));
                    }
                    let mut first = SchComponent::default();
                    first.import_from_parameters(&p);
                    component = Some(first);
                }
            }
        }

        component.ok_or_else(|| Error::InvalidRecord(format!("{} holds no component", section)))
    }

    /// Lays a library out in a container.
    pub fn write_container(
        &self,
        library: &SchLib,
        container: &mut MemoryContainer,
    ) -> Result<()> {
        let mut writer = BinaryWriter::new();
        writer.write_parameters_block(&library.build_header())?;
        container.insert(FILE_HEADER, writer.into_inner());

        let mut used: HashMap<String, &str> = HashMap::new();
        let mut section_keys = ParameterCollection::new();
        let mut remapped: i32 = 0;

        for component in &library.components {
            let section = section_key(&component.lib_reference);
            let previous = used.insert(section.to_ascii_lowercase(), &component.lib_reference);
            if let Some(previous) = previous {
                return Err(Error::DuplicateKey(format!(
                    "{} and {} share storage {}",
                    previous, component.lib_reference, section
                )));
            }
            if section != component.lib_reference {
                section_keys.add_always(&format!("LIBREF{}", remapped), &component.lib_reference);
                section_keys.add_always(&format!("SECTIONKEY{}", remapped), &section);
                remapped += 1;
            }

            let mut data = BinaryWriter::new();
            data.write_parameters_block(&component.to_parameters())?;
            for primitive in &component.primitives {
                data.write_parameters_block(&primitive.to_parameters())?;
            }
            container.insert(&format!("{}/{}", section, DATA), data.into_inner());
        }

        if remapped > 0 {
            let mut keys = ParameterCollection::new();
            keys.add_always("KEYCOUNT", remapped);
            for (key, value) in section_keys.iter() {
                keys.add_always(key, value);
            }
            let mut writer = BinaryWriter::new();
            writer.write_parameters_block(&keys)?;
            container.insert(SECTION_KEYS, writer.into_inner());
        }

        Ok(())
    }

    /// Encodes a library as compound-file bytes.
    pub fn encode(&self, library: &SchLib) -> Result<Vec<u8>> {
        let mut container = MemoryContainer::new();
        self.write_container(library, &mut container)?;
        container.to_compound_bytes()
    }
}

impl SubDocumentCodec for SchLibCodec {
    type Library = SchLib;

    fn decode(&self, bytes: &[u8]) -> Result<SchLib> {
        let mut compound = open_compound_bytes(bytes)?;
        self.read_container(&mut compound)
    }
}

/// Lowercased library reference to storage name.
fn read_section_keys<C: Container>(container: &mut C) -> Result<HashMap<String, String>> {
    let bytes = match container.read_stream(SECTION_KEYS) {
        Ok(bytes) => bytes,
        Err(Error::MissingStream(_)) => return Ok(HashMap::new()),
        Err(e) => return Err(e),
    };
    let p = BinaryReader::new(&bytes).read_parameters_block()?;

    let mut sections = HashMap::new();
    for i in 0..p.get("KEYCOUNT").as_int_or_default() {
        let lib_ref = p.get(&format!("LIBREF{}", i)).as_str_or_default();
        let section = p.get(&format!("SECTIONKEY{}", i)).as_str_or_default();
        if !lib_ref.is_empty() && !section.is_empty() {
            sections.insert(lib_ref.to_ascii_lowercase(), section);
        }
    }
    Ok(sections)
}
