// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/pcblib.rs - PCB library codec.
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
 * # `pcblib` Module
 *
 * The footprint catalogue of a PCB library. Layout of the compound file:
 *
 * - `FileHeader`: a string block naming the format,
 * - `Library/Data`: a parameter block, a `u32` footprint count and one string
 *   block per footprint name,
 * - `<section>/Parameters`: a parameter block with `PATTERN`, `HEIGHT` and
 *   `DESCRIPTION` for one footprint.
 *
 * Footprint geometry (pads, tracks and so on) is stored in binary records and
 * is not decoded here.
 */

use std::collections::HashSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::binary::{BinaryReader, BinaryWriter};
use crate::container::{open_compound_bytes, section_key, Container, MemoryContainer};
use crate::error::{Error, Result};
use crate::intlib::SubDocumentCodec;
use crate::parameters::ParameterCollection;
use crate::units::Coord;

pub const PCBLIB_HEADER: &str = "PCB 6.0 Binary Library File";

const FILE_HEADER: &str = "FileHeader";
const LIBRARY: &str = "Library";
const LIBRARY_DATA: &str = "Library/Data";
const PARAMETERS: &str = "Parameters";

const KNOWN_KEYS: [&str; 3] = ["PATTERN", "HEIGHT", "DESCRIPTION"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Footprint {
    pub name: String,
    pub height: Coord,
    pub description: String,
    /// Every parameter of the footprint, including the ones decoded above.
    pub parameters: ParameterCollection,
}

impl Footprint {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn from_parameters(p: &ParameterCollection) -> Self {
        Self {
            name: p.get("PATTERN").as_str_or_default(),
            height: parse_height(p.get("HEIGHT").raw()),
            description: p.get("DESCRIPTION").as_str_or_default(),
            parameters: p.clone(),
        }
    }

    pub fn to_parameters(&self) -> ParameterCollection {
        let mut p = ParameterCollection::new();
        p.add_always("PATTERN", &self.name);
        if self.height != Coord::default() {
            p.add("HEIGHT", format!("{}mil", self.height.to_mils().normalize()));
        }
        p.add("DESCRIPTION", &self.description);
        for (key, value) in self.parameters.iter() {
            if !KNOWN_KEYS.iter().any(|known| known.eq_ignore_ascii_case(key)) {
                p.add_always(key, value);
            }
        }
        p
    }
}

/// Parses a `HEIGHT` value such as `25mil`. Bad values read as zero.
fn parse_height(raw: Option<&str>) -> Coord {
    let Some(raw) = raw else {
        return Coord::default();
    };
    let trimmed = raw.trim();
    let number = match trimmed.len().checked_sub(3) {
        Some(split) if trimmed.get(split..).is_some_and(|u| u.eq_ignore_ascii_case("mil")) => {
            &trimmed[..split]
        }
        _ => trimmed,
    };
    match Decimal::from_str(number.trim()).ok().and_then(Coord::from_mils) {
        Some(height) => height,
        None => {
            trace!("HEIGHT={:?} is not a length, using 0", raw);
            Coord::default()
        }
    }
}

/// A decoded PCB library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcbLib {
    pub header: String,
    pub library: ParameterCollection,
    pub footprints: Vec<Footprint>,
}

impl PcbLib {
    pub fn new() -> Self {
        Self {
            header: PCBLIB_HEADER.to_string(),
            ..Self::default()
        }
    }

    pub fn footprint(&self, name: &str) -> Option<&Footprint> {
        self.footprints
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

/// Reads and writes [PcbLib] documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcbLibCodec;

impl PcbLibCodec {
    pub fn read_container<C: Container>(&self, container: &mut C) -> Result<PcbLib> {
        let header = BinaryReader::new(&container.read_stream(FILE_HEADER)?).read_string_block()?;

        let (library, names) = match container.read_stream(LIBRARY_DATA) {
            Ok(bytes) => read_library_data(&bytes)?,
            Err(Error::MissingStream(_)) => (ParameterCollection::new(), None),
            Err(e) => return Err(e),
        };

        let sections: Vec<String> = match names {
            Some(names) => names.iter().map(|name| section_key(name)).collect(),
            None => container
                .storage_names("")?
                .into_iter()
                .filter(|name| !name.eq_ignore_ascii_case(LIBRARY))
                .collect(),
        };

        let mut footprints = Vec::with_capacity(sections.len());
        for section in sections {
            let bytes = match container.read_stream(&format!("{}/{}", section, PARAMETERS)) {
                Ok(bytes) => bytes,
                Err(Error::MissingStream(_)) => {
                    trace!("Storage {} holds no footprint parameters", section);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let p = BinaryReader::new(&bytes).read_parameters_block()?;
            let mut footprint = Footprint::from_parameters(&p);
            if footprint.name.is_empty() {
                footprint.name = section;
            }
            footprints.push(footprint);
        }

        debug!("Read {} footprints", footprints.len());
        Ok(PcbLib {
            header,
            library,
            footprints,
        })
    }

    pub fn write_container(
        &self,
        library: &PcbLib,
        container: &mut MemoryContainer,
    ) -> Result<()> {
        let header = if library.header.is_empty() {
            PCBLIB_HEADER
        } else {
            library.header.as_str()
        };
        let mut writer = BinaryWriter::new();
        writer.write_string_block(header)?;
        container.insert(FILE_HEADER, writer.into_inner());

        let mut data = BinaryWriter::new();
        data.write_parameters_block(&library.library)?;
        data.write_u32(library.footprints.len() as u32);
        for footprint in &library.footprints {
            data.write_string_block(&footprint.name)?;
        }
        container.insert(LIBRARY_DATA, data.into_inner());

        let mut used = HashSet::new();
        for footprint in &library.footprints {
            let section = section_key(&footprint.name);
            let fresh = used.insert(section.to_ascii_lowercase());
            if !fresh || section.eq_ignore_ascii_case(LIBRARY) {
                return Err(Error::DuplicateKey(footprint.name.clone()));
            }
            let mut writer = BinaryWriter::new();
            writer.write_parameters_block(&footprint.to_parameters())?;
            container.insert(&format!("{}/{}", section, PARAMETERS), writer.into_inner());
        }

        Ok(())
    }

    pub fn encode(&self, library: &PcbLib) -> Result<Vec<u8>> {
        let mut container = MemoryContainer::new();
        self.write_container(library, &mut container)?;
        container.to_compound_bytes()
    }
}

impl SubDocumentCodec for PcbLibCodec {
    type Library = PcbLib;

    fn decode(&self, bytes: &[u8]) -> Result<PcbLib> {
        let mut compound = open_compound_bytes(bytes)?;
        self.read_container(&mut compound)
    }
}

/// The library parameters and, when present, the footprint name list.
fn read_library_data(bytes: &[u8]) -> Result<(ParameterCollection, Option<Vec<String>>)> {
    let mut reader = BinaryReader::new(bytes);
    let library = reader.read_parameters_block()?;
    if reader.is_empty() {
        return Ok((library, None));
    }

    let count = reader.read_u32()?;
    let names = (0..count)
        .map(|_| reader.read_string_block())
        .collect::<Result<Vec<_>>>()?;
    Ok((library, Some(names)))
}
