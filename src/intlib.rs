// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/intlib.rs - Integrated library reader and writer.
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
 * # `intlib` Module
 *
 * An integrated library (`.IntLib`) bundles compiled schematic and PCB
 * libraries in one compound file:
 *
 * | Entry               | Contents                                          |
 * |---------------------|---------------------------------------------------|
 * | `Version.txt`       | 5 opaque bytes                                    |
 * | `Parameters   .bin` | marker byte, parameter block                      |
 * | `LibCrossRef.txt`   | marker byte, `u32` count, cross-reference records |
 * | `SchLib/<name>`     | marker byte, zlib-compressed schematic library    |
 * | `PCBLib/<name>`     | marker byte, zlib-compressed PCB library          |
 *
 * [IntLibReader] walks these in order. Every cross reference whose schematic
 * stream is found becomes an [IntLibComponent]; its footprint library is
 * attached when it loads, and recorded as a [Diagnostic] when it does not.
 *
 * ## Usage Example
 *
 * ```no_run
 * use altiumlib::intlib::{DuplicatePolicy, IntLibReader, ReaderOptions};
 *
 * fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     let options = ReaderOptions::default().duplicate_lib_refs(DuplicatePolicy::LastWins);
 *     let library = IntLibReader::new(options).open("Resistors.IntLib")?;
 *
 *     for (lib_ref, component) in &library.components {
 *         let footprints = component.pcb_lib.as_ref().map_or(0, |pcb| pcb.footprints.len());
 *         println!("{}: {} footprint(s)", lib_ref, footprints);
 *     }
 *     for diagnostic in &library.diagnostics {
 *         eprintln!("{}", diagnostic);
 *     }
 *
 *     Ok(())
 * }
 * ```
 */

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::debug;

use crate::binary::{
    unwrap_compressed_payload, wrap_compressed_payload, BinaryReader, BinaryWriter,
    PAYLOAD_MARKER,
};
use crate::container::{open_compound_bytes, Container, MemoryContainer};
use crate::context::{ContextStack, Diagnostic};
use crate::error::{Error, Result};
use crate::parameters::ParameterCollection;
use crate::pcblib::{PcbLib, PcbLibCodec};
use crate::records::RecordRegistry;
use crate::schlib::{SchLib, SchLibCodec};

pub const VERSION_STREAM: &str = "Version.txt";
pub const PARAMETERS_STREAM: &str = "Parameters   .bin";
pub const CROSS_REFERENCE_STREAM: &str = "LibCrossRef.txt";
pub const SCHLIB_STORAGE: &str = "SchLib";
pub const PCBLIB_STORAGE: &str = "PCBLib";

pub const VERSION_LENGTH: usize = 5;

/// Turns the decompressed bytes of an embedded library into a typed value.
pub trait SubDocumentCodec {
    type Library;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Library>;
}

/// Where the footprint library of a cross reference lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcbLibReference {
    pub pcb_lib: String,
    pub pcb_lib_source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FootprintReference {
    pub footprint: String,
    pub footprint_format: String,
    /// Present when `HasPCBLib` is set.
    pub pcb_lib: Option<PcbLibReference>,
}

/// One entry of `LibCrossRef.txt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossReference {
    pub lib_ref: String,
    /// Locator of the schematic stream, e.g. `C:\SchLib\Resistors.SchLib`.
    pub sch_lib: String,
    /// Number of parts. Stored on disk as one more than this.
    pub parts_count: i32,
    pub description: String,
    pub sch_lib_source: String,
    /// Present when `HasFootprint` is set.
    pub footprint: Option<FootprintReference>,
}

impl CrossReference {
    pub fn new(lib_ref: &str, sch_lib: &str) -> Self {
        Self {
            lib_ref: lib_ref.to_string(),
            sch_lib: sch_lib.to_string(),
            ..Self::default()
        }
    }

    pub fn has_footprint(&self) -> bool {
        self.footprint.is_some()
    }

    pub fn pcb_lib(&self) -> Option<&PcbLibReference> {
        self.footprint.as_ref()?.pcb_lib.as_ref()
    }

    /// Reads one record. Gated fields are only read when their flag is set.
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        let lib_ref = reader.read_string_block()?;
        let sch_lib = reader.read_string_block()?;
        let parts_count = reader.read_i32()?.saturating_sub(1);
        let description = reader.read_string_block()?;
        let sch_lib_source = reader.read_string_block()?;

        let footprint = if reader.read_bool32()? {
            let footprint = reader.read_string_block()?;
            let footprint_format = reader.read_string_block()?;
            let pcb_lib = if reader.read_bool32()? {
                Some(PcbLibReference {
                    pcb_lib: reader.read_string_block()?,
                    pcb_lib_source: reader.read_string_block()?,
                })
            } else {
                None
            };
            Some(FootprintReference {
                footprint,
                footprint_format,
                pcb_lib,
            })
        } else {
            None
        };

        Ok(Self {
            lib_ref,
            sch_lib,
            parts_count,
            description,
            sch_lib_source,
            footprint,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_string_block(&self.lib_ref)?;
        writer.write_string_block(&self.sch_lib)?;
        writer.write_i32(self.parts_count.saturating_add(1));
        writer.write_string_block(&self.description)?;
        writer.write_string_block(&self.sch_lib_source)?;

        writer.write_bool32(self.footprint.is_some());
        if let Some(footprint) = &self.footprint {
            writer.write_string_block(&footprint.footprint)?;
            writer.write_string_block(&footprint.footprint_format)?;
            writer.write_bool32(footprint.pcb_lib.is_some());
            if let Some(pcb_lib) = &footprint.pcb_lib {
                writer.write_string_block(&pcb_lib.pcb_lib)?;
                writer.write_string_block(&pcb_lib.pcb_lib_source)?;
            }
        }
        Ok(())
    }
}

/// Decodes the body of `LibCrossRef.txt`.
pub fn read_cross_references(bytes: &[u8]) -> Result<Vec<CrossReference>> {
    let mut reader = BinaryReader::new(bytes);
    reader.skip(1)?;
    let count = reader.read_u32()?;
    (0..count).map(|_| CrossReference::read(&mut reader)).collect()
}

/// The inverse of [read_cross_references].
pub fn write_cross_references(cross_references: &[CrossReference]) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter::new();
    writer.write_u8(PAYLOAD_MARKER);
    writer.write_u32(cross_references.len() as u32);
    for cross_reference in cross_references {
        cross_reference.write(&mut writer)?;
    }
    Ok(writer.into_inner())
}

/// The part of a locator after its last `\<storage>\` marker, or the whole
/// locator when it has none.
pub fn strip_locator<'a>(locator: &'a str, storage: &str) -> &'a str {
    let marker = format!("\\{}\\", storage.to_ascii_lowercase());
    match locator.to_ascii_lowercase().rfind(&marker) {
        Some(index) => &locator[index + marker.len()..],
        None => locator,
    }
}

/// A schematic library and, when it loaded, its footprint library.
#[derive(Debug)]
pub struct IntLibComponent {
    pub sch_lib: SchLib,
    pub pcb_lib: Option<PcbLib>,
}

/// The result of reading one integrated library.
#[derive(Debug, Default)]
pub struct IntLib {
    pub version: [u8; VERSION_LENGTH],
    pub parameters: ParameterCollection,
    pub cross_references: Vec<CrossReference>,
    /// Keyed by [CrossReference::lib_ref].
    pub components: HashMap<String, IntLibComponent>,
    /// Problems that did not stop the read.
    pub diagnostics: Vec<Diagnostic>,
}

impl IntLib {
    /// Reads a file with the default [ReaderOptions].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        IntLibReader::default().open(path)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        IntLibReader::default().read_bytes(bytes)
    }

    pub fn component(&self, lib_ref: &str) -> Option<&IntLibComponent> {
        self.components.get(lib_ref)
    }

    /// Lays the library out as [IntLibReader] expects to find it.
    ///
    /// Embedded streams are named after the cross-reference locators. Cross
    /// references without a component are written to the table only.
    pub fn to_container(&self) -> Result<MemoryContainer> {
        let mut container = MemoryContainer::new();
        container.insert(VERSION_STREAM, self.version.to_vec());

        let mut writer = BinaryWriter::new();
        writer.write_u8(PAYLOAD_MARKER);
        writer.write_parameters_block(&self.parameters)?;
        container.insert(PARAMETERS_STREAM, writer.into_inner());

        container.insert(
            CROSS_REFERENCE_STREAM,
            write_cross_references(&self.cross_references)?,
        );

        container.insert_storage(SCHLIB_STORAGE);
        container.insert_storage(PCBLIB_STORAGE);

        let sch_codec = SchLibCodec::default();
        for cross_reference in &self.cross_references {
            let Some(component) = self.components.get(&cross_reference.lib_ref) else {
                continue;
            };
            let name = strip_locator(&cross_reference.sch_lib, SCHLIB_STORAGE);
            container.insert(
                &format!("{}/{}", SCHLIB_STORAGE, name),
                wrap_compressed_payload(&sch_codec.encode(&component.sch_lib)?)?,
            );

            if let (Some(pcb_lib), Some(reference)) = (&component.pcb_lib, cross_reference.pcb_lib())
            {
                let name = strip_locator(&reference.pcb_lib, PCBLIB_STORAGE);
                container.insert(
                    &format!("{}/{}", PCBLIB_STORAGE, name),
                    wrap_compressed_payload(&PcbLibCodec.encode(pcb_lib)?)?,
                );
            }
        }

        Ok(container)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_container()?.to_compound_bytes()
    }
}

/// What to do when two cross references share a library reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail with [Error::DuplicateKey].
    #[default]
    Reject,
    /// Keep the later entry and record a diagnostic.
    LastWins,
}

#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub duplicate_lib_refs: DuplicatePolicy,
    /// When false, footprint libraries are not decoded at all.
    pub load_footprints: bool,
    /// Record kinds known to the schematic decoder.
    pub registry: RecordRegistry,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            duplicate_lib_refs: DuplicatePolicy::default(),
            load_footprints: true,
            registry: RecordRegistry::default(),
        }
    }
}

impl ReaderOptions {
    pub fn duplicate_lib_refs(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_lib_refs = policy;
        self
    }

    pub fn load_footprints(mut self, load: bool) -> Self {
        self.load_footprints = load;
        self
    }

    pub fn registry(mut self, registry: RecordRegistry) -> Self {
        self.registry = registry;
        self
    }
}

/// Reads integrated libraries.
#[derive(Debug, Clone, Default)]
pub struct IntLibReader {
    options: ReaderOptions,
}

impl IntLibReader {
    pub fn new(options: ReaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<IntLib> {
        let mut compound = cfb::open(path)?;
        self.read(&mut compound)
    }

    pub fn read_bytes(&self, bytes: &[u8]) -> Result<IntLib> {
        let mut compound = open_compound_bytes(bytes)?;
        self.read(&mut compound)
    }

    /// Reads a library from any [Container].
    ///
    /// Fatal errors carry the trail of the phase that failed, e.g.
    /// `Reading integrated library > Reading cross references`.
    pub fn read<C: Container>(&self, container: &mut C) -> Result<IntLib> {
        let context = ContextStack::new();
        context.scope("Reading integrated library", || {
            self.read_phases(container, &context)
        })
    }

    fn read_phases<C: Container>(
        &self,
        container: &mut C,
        context: &ContextStack,
    ) -> Result<IntLib> {
        let mut diagnostics = Vec::new();

        let version = context.scope("Reading version information", || {
            let bytes = container.read_stream(VERSION_STREAM)?;
            let mut version = [0u8; VERSION_LENGTH];
            version.copy_from_slice(BinaryReader::new(&bytes).read_bytes(VERSION_LENGTH)?);
            debug!("Version {:02x?}", version);
            Ok(version)
        })?;

        let parameters = context.scope("Reading parameters", || {
            let bytes = container.read_stream(PARAMETERS_STREAM)?;
            let mut reader = BinaryReader::new(&bytes);
            reader.skip(1)?;
            reader.read_parameters_block()
        })?;

        let cross_references = context.scope("Reading cross references", || {
            let cross_references =
                read_cross_references(&container.read_stream(CROSS_REFERENCE_STREAM)?)?;
            debug!("Read {} cross references", cross_references.len());
            self.check_duplicates(context, &cross_references, &mut diagnostics)?;
            Ok(cross_references)
        })?;

        let components = context.scope("Reading parts", || {
            self.read_parts(container, context, &cross_references, &mut diagnostics)
        })?;

        Ok(IntLib {
            version,
            parameters,
            cross_references,
            components,
            diagnostics,
        })
    }

    fn check_duplicates(
        &self,
        context: &ContextStack,
        cross_references: &[CrossReference],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<()> {
        let mut seen = HashSet::new();
        for cross_reference in cross_references {
            if seen.insert(cross_reference.lib_ref.as_str()) {
                continue;
            }
            match self.options.duplicate_lib_refs {
                DuplicatePolicy::Reject => {
                    return Err(Error::DuplicateKey(cross_reference.lib_ref.clone()));
                }
                DuplicatePolicy::LastWins => diagnostics.push(context.diagnostic(
                    Some(&cross_reference.lib_ref),
                    "duplicate library reference, the later entry wins",
                )),
            }
        }
        Ok(())
    }

    fn read_parts<C: Container>(
        &self,
        container: &mut C,
        context: &ContextStack,
        cross_references: &[CrossReference],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<HashMap<String, IntLibComponent>> {
        let sch_streams = container.stream_names(SCHLIB_STORAGE)?;
        let pcb_streams = match container.stream_names(PCBLIB_STORAGE) {
            Ok(names) => names,
            Err(Error::MissingStream(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        let sch_codec = SchLibCodec::new(self.options.registry.clone());

        let mut components = HashMap::new();
        for cross_reference in cross_references {
            if cross_reference.sch_lib.is_empty() {
                continue;
            }

            let wanted = strip_locator(&cross_reference.sch_lib, SCHLIB_STORAGE);
            let Some(name) = find_stream(&sch_streams, wanted) else {
                diagnostics.push(context.diagnostic(
                    Some(&cross_reference.lib_ref),
                    format!("no schematic stream matches {}", cross_reference.sch_lib),
                ));
                continue;
            };

            let sch_lib = context.scope(format!("Reading schematic library {}", name), || {
                read_embedded(container, SCHLIB_STORAGE, name, &sch_codec)
            })?;
            debug!(
                "{}: {} schematic component(s)",
                cross_reference.lib_ref,
                sch_lib.components.len()
            );

            let pcb_lib = if cross_reference.has_footprint() && self.options.load_footprints {
                let _phase =
                    context.enter(format!("Reading footprints of {}", cross_reference.lib_ref));
                match read_footprints(container, cross_reference, &pcb_streams) {
                    Ok(pcb_lib) => Some(pcb_lib),
                    Err(err) => {
                        diagnostics.push(context.diagnostic(
                            Some(&cross_reference.lib_ref),
                            format!("footprints not loaded: {}", err),
                        ));
                        None
                    }
                }
            } else {
                None
            };

            components.insert(
                cross_reference.lib_ref.clone(),
                IntLibComponent { sch_lib, pcb_lib },
            );
        }

        debug!("Assembled {} components", components.len());
        Ok(components)
    }
}

/// Finds and decodes the PCB library a cross reference points at.
fn read_footprints<C: Container>(
    container: &mut C,
    cross_reference: &CrossReference,
    pcb_streams: &[String],
) -> Result<PcbLib> {
    let reference = cross_reference.pcb_lib().ok_or_else(|| {
        Error::MissingStream(format!("{} names no PCB library", cross_reference.lib_ref))
    })?;
    let wanted = strip_locator(&reference.pcb_lib, PCBLIB_STORAGE);
    let name = find_stream(pcb_streams, wanted)
        .ok_or_else(|| Error::MissingStream(format!("{}/{}", PCBLIB_STORAGE, wanted)))?;
    read_embedded(container, PCBLIB_STORAGE, name, &PcbLibCodec)
}

fn find_stream<'a>(names: &'a [String], wanted: &str) -> Option<&'a str> {
    names
        .iter()
        .find(|name| name.eq_ignore_ascii_case(wanted))
        .map(String::as_str)
}

/// Reads `<storage>/<name>`, inflates it and decodes the result.
fn read_embedded<C: Container, D: SubDocumentCodec>(
    container: &mut C,
    storage: &str,
    name: &str,
    codec: &D,
) -> Result<D::Library> {
    let stored = container.read_stream(&format!("{}/{}", storage, name))?;
    unwrap_compressed_payload(&stored, |bytes| codec.decode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resistor_reference() -> CrossReference {
        CrossReference {
            parts_count: 1,
            description: "Resistor".to_string(),
            sch_lib_source: "D:\\Sources\\Resistors.SchLib".to_string(),
            ..CrossReference::new("RES", "C:\\SchLib\\Resistors.SchLib")
        }
    }

    #[test]
    fn no_footprint_stops_after_the_gate() {
        let mut writer = BinaryWriter::new();
        resistor_reference().write(&mut writer).unwrap();
        let record_length = writer.len();
        writer.write_u32(0xFFFF_FFFF);
        let bytes = writer.into_inner();

        let mut reader = BinaryReader::new(&bytes);
        let decoded = CrossReference::read(&mut reader).unwrap();
        assert_eq!(reader.position(), record_length);
        assert_eq!(decoded, resistor_reference());
        assert!(!decoded.has_footprint());
    }

    #[test]
    fn nested_gates() {
        let footprint_only = CrossReference {
            footprint: Some(FootprintReference {
                footprint: "0603".to_string(),
                footprint_format: "PCBLib".to_string(),
                pcb_lib: None,
            }),
            ..resistor_reference()
        };
        let with_pcb_lib = CrossReference {
            footprint: Some(FootprintReference {
                pcb_lib: Some(PcbLibReference {
                    pcb_lib: "C:\\PCBLib\\Chips.PcbLib".to_string(),
                    pcb_lib_source: "D:\\Sources\\Chips.PcbLib".to_string(),
                }),
                ..footprint_only.footprint.clone().unwrap()
            }),
            ..resistor_reference()
        };

        let table = vec![resistor_reference(), footprint_only, with_pcb_lib];
        let bytes = write_cross_references(&table).unwrap();
        let decoded = read_cross_references(&bytes).unwrap();
        assert_eq!(decoded, table);
        assert!(decoded[1].pcb_lib().is_none());
        assert_eq!(decoded[2].pcb_lib().unwrap().pcb_lib, "C:\\PCBLib\\Chips.PcbLib");
    }

    #[test]
    fn parts_count_is_stored_plus_one() {
        let mut writer = BinaryWriter::new();
        CrossReference::new("", "").write(&mut writer).unwrap();
        let bytes = writer.into_inner();

        // Two empty string blocks precede the count.
        let mut reader = BinaryReader::new(&bytes);
        reader.skip(10).unwrap();
        assert_eq!(reader.read_i32().unwrap(), 1);
    }

    #[test]
    fn truncated_table() {
        let mut bytes = write_cross_references(&[resistor_reference()]).unwrap();
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            read_cross_references(&bytes),
            Err(Error::TruncatedStream { .. })
        ));
    }

    #[test]
    fn locators() {
        assert_eq!(strip_locator("C:\\SchLib\\Res.SchLib", SCHLIB_STORAGE), "Res.SchLib");
        assert_eq!(strip_locator("c:\\schlib\\Res.SchLib", SCHLIB_STORAGE), "Res.SchLib");
        assert_eq!(strip_locator("X:\\PCBLib\\a\\PCBLib\\b.PcbLib", PCBLIB_STORAGE), "b.PcbLib");
        assert_eq!(strip_locator("Res.SchLib", SCHLIB_STORAGE), "Res.SchLib");
        assert_eq!(
            find_stream(&["RES.SCHLIB".to_string()], "res.schlib"),
            Some("RES.SCHLIB")
        );
    }

    #[test]
    fn options_builder() {
        let options = ReaderOptions::default()
            .duplicate_lib_refs(DuplicatePolicy::LastWins)
            .load_footprints(false)
            .registry(RecordRegistry::empty());
        assert_eq!(options.duplicate_lib_refs, DuplicatePolicy::LastWins);
        assert!(!options.load_footprints);
        assert!(!options.registry.contains(1));
        assert!(ReaderOptions::default().load_footprints);
    }
}
