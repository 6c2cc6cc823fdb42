// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  tests/intlib.rs - End-to-end tests for integrated library reading.
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

use std::collections::HashMap;

use altiumlib::Error;
use altiumlib::binary::{PAYLOAD_MARKER, wrap_compressed_payload};
use altiumlib::container::MemoryContainer;
use altiumlib::intlib::{
    CrossReference, DuplicatePolicy, FootprintReference, IntLib, IntLibComponent, IntLibReader,
    PcbLibReference, ReaderOptions,
};
use altiumlib::parameters::ParameterCollection;
use altiumlib::pcblib::{Footprint, PcbLib};
use altiumlib::records::{SchComponent, SchRectangle};
use altiumlib::schlib::{SchLib, SchLibCodec};
use altiumlib::units::{Coord, CoordPoint};

const VERSION: [u8; 5] = *b"PCB50";

fn symbol(lib_ref: &str, description: &str, corner: CoordPoint) -> SchLib {
    let mut component = SchComponent {
        component_description: description.to_string(),
        ..SchComponent::new(lib_ref)
    };
    let mut rectangle = SchRectangle::default();
    rectangle.corner = corner;
    component.add_primitive(Box::new(rectangle));

    SchLib {
        components: vec![component],
        ..SchLib::default()
    }
}

fn footprints() -> PcbLib {
    let mut pcb_lib = PcbLib::new();
    pcb_lib.footprints.push(Footprint {
        height: Coord(125_000),
        ..Footprint::new("0603")
    });
    pcb_lib
}

fn resistor_reference() -> CrossReference {
    CrossReference {
        parts_count: 1,
        description: "Resistor".to_string(),
        ..CrossReference::new("RES", "C:\\SchLib\\Resistors.SchLib")
    }
}

fn with_pcb_lib(reference: CrossReference) -> CrossReference {
    CrossReference {
        footprint: Some(FootprintReference {
            footprint: "0603".to_string(),
            footprint_format: "PCBLib".to_string(),
            pcb_lib: Some(PcbLibReference {
                pcb_lib: "C:\\PCBLib\\Chips.PcbLib".to_string(),
                pcb_lib_source: "D:\\Sources\\Chips.PcbLib".to_string(),
            }),
        }),
        ..reference
    }
}

fn library(
    cross_references: Vec<CrossReference>,
    components: Vec<(&str, IntLibComponent)>,
) -> IntLib {
    let mut parameters = ParameterCollection::new();
    parameters.add_always("COMPONENTCOUNT", cross_references.len() as i32);

    IntLib {
        version: VERSION,
        parameters,
        cross_references,
        components: components
            .into_iter()
            .map(|(lib_ref, component)| (lib_ref.to_string(), component))
            .collect::<HashMap<_, _>>(),
        diagnostics: Vec::new(),
    }
}

fn resistor_component(pcb_lib: Option<PcbLib>) -> IntLibComponent {
    IntLibComponent {
        sch_lib: symbol("RES", "Chip resistor", CoordPoint::new(100, 250)),
        pcb_lib,
    }
}

#[test]
fn entry_without_footprint() {
    let source = library(
        vec![resistor_reference()],
        vec![("RES", resistor_component(None))],
    );

    let decoded = IntLib::from_bytes(&source.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.version, VERSION);
    assert_eq!(decoded.parameters.get("COMPONENTCOUNT").as_int_or_default(), 1);
    assert_eq!(decoded.cross_references, vec![resistor_reference()]);
    assert_eq!(decoded.components.len(), 1);

    let component = decoded.component("RES").unwrap();
    assert_eq!(component.sch_lib.components.len(), 1);
    assert_eq!(component.sch_lib.components[0].description(), "Chip resistor");
    assert!(component.pcb_lib.is_none());
    assert!(decoded.diagnostics.is_empty());
}

#[test]
fn corrupt_footprint_stream_is_not_fatal() {
    let source = library(
        vec![with_pcb_lib(resistor_reference())],
        vec![("RES", resistor_component(None))],
    );
    let mut container = source.to_container().unwrap();
    container.insert("PCBLib/Chips.PcbLib", vec![PAYLOAD_MARKER, 0x12, 0x34, 0x56]);

    let decoded = IntLibReader::default().read(&mut container).unwrap();
    let component = decoded.component("RES").unwrap();
    assert_eq!(component.sch_lib.components[0].name(), "RES");
    assert!(component.pcb_lib.is_none());

    assert_eq!(decoded.diagnostics.len(), 1);
    let diagnostic = &decoded.diagnostics[0];
    assert_eq!(diagnostic.lib_ref.as_deref(), Some("RES"));
    assert_eq!(
        diagnostic.trail,
        "Reading integrated library > Reading parts > Reading footprints of RES"
    );
    assert!(diagnostic.message.contains("Decompression failed"));
}

#[test]
fn missing_footprint_stream_is_not_fatal() {
    let source = library(
        vec![with_pcb_lib(resistor_reference())],
        vec![("RES", resistor_component(None))],
    );
    let mut container = source.to_container().unwrap();

    let decoded = IntLibReader::default().read(&mut container).unwrap();
    assert!(decoded.component("RES").unwrap().pcb_lib.is_none());
    assert_eq!(decoded.diagnostics.len(), 1);
}

#[test]
fn footprints_attach_to_their_component() {
    let source = library(
        vec![with_pcb_lib(resistor_reference())],
        vec![("RES", resistor_component(Some(footprints())))],
    );
    let bytes = source.to_bytes().unwrap();

    let decoded = IntLib::from_bytes(&bytes).unwrap();
    let pcb_lib = decoded.component("RES").unwrap().pcb_lib.as_ref().unwrap();
    assert_eq!(pcb_lib.footprint("0603").unwrap().height, Coord(125_000));
    assert!(decoded.diagnostics.is_empty());

    let options = ReaderOptions::default().load_footprints(false);
    let skipped = IntLibReader::new(options).read_bytes(&bytes).unwrap();
    assert!(skipped.component("RES").unwrap().pcb_lib.is_none());
    assert!(skipped.diagnostics.is_empty());
}

#[test]
fn unmatched_schematic_locator_is_skipped() {
    let ghost = CrossReference::new("GHOST", "C:\\SchLib\\Missing.SchLib");
    let source = library(
        vec![resistor_reference(), ghost],
        vec![("RES", resistor_component(None))],
    );

    let decoded = IntLib::from_bytes(&source.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.cross_references.len(), 2);
    assert!(decoded.component("RES").is_some());
    assert!(decoded.component("GHOST").is_none());
    assert_eq!(decoded.components.len(), 1);
    assert_eq!(decoded.diagnostics[0].lib_ref.as_deref(), Some("GHOST"));
}

#[test]
fn rectangle_corner_survives_the_full_pipeline() {
    for corner in [
        CoordPoint::new(100, 250),
        CoordPoint {
            x: Coord::from_dxp(100),
            y: Coord::from_dxp(250),
        },
    ] {
        let component = IntLibComponent {
            sch_lib: symbol("RES", "", corner),
            pcb_lib: None,
        };
        let source = library(vec![resistor_reference()], vec![("RES", component)]);

        let decoded = IntLib::from_bytes(&source.to_bytes().unwrap()).unwrap();
        let symbol = &decoded.component("RES").unwrap().sch_lib.components[0];
        let rectangle = symbol.primitives_of::<SchRectangle>().next().unwrap();
        assert_eq!(rectangle.corner, corner);
    }
}

#[test]
fn duplicate_lib_refs_are_rejected_by_default() {
    let source = library(
        vec![resistor_reference(), resistor_reference()],
        vec![("RES", resistor_component(None))],
    );
    let mut container = source.to_container().unwrap();

    let err = IntLibReader::default().read(&mut container).unwrap_err();
    assert!(matches!(err.root(), Error::DuplicateKey(lib_ref) if lib_ref == "RES"));
    assert_eq!(
        err.trail(),
        Some("Reading integrated library > Reading cross references")
    );
}

#[test]
fn duplicate_lib_refs_last_wins() {
    let second = CrossReference::new("RES", "C:\\SchLib\\Other.SchLib");
    let source = library(
        vec![resistor_reference(), second],
        vec![("RES", resistor_component(None))],
    );
    let mut container = source.to_container().unwrap();
    let other = symbol("RES", "Thick film resistor", CoordPoint::default());
    container.insert(
        "SchLib/Other.SchLib",
        wrap_compressed_payload(&SchLibCodec::default().encode(&other).unwrap()).unwrap(),
    );

    let options = ReaderOptions::default().duplicate_lib_refs(DuplicatePolicy::LastWins);
    let decoded = IntLibReader::new(options).read(&mut container).unwrap();
    assert_eq!(decoded.components.len(), 1);
    let component = decoded.component("RES").unwrap();
    assert_eq!(
        component.sch_lib.components[0].description(),
        "Thick film resistor"
    );
    assert_eq!(decoded.diagnostics.len(), 1);
    assert!(decoded.diagnostics[0].message.contains("duplicate"));
}

#[test]
fn missing_version_carries_a_trail() {
    let mut container = MemoryContainer::new();
    container.insert("Parameters   .bin", vec![PAYLOAD_MARKER, 0, 0, 0, 0]);

    let err = IntLibReader::default().read(&mut container).unwrap_err();
    assert!(matches!(err.root(), Error::MissingStream(name) if name == "Version.txt"));
    assert_eq!(
        err.trail(),
        Some("Reading integrated library > Reading version information")
    );
    assert!(err.to_string().starts_with("Reading integrated library > "));
}

#[test]
fn corrupt_schematic_stream_is_fatal() {
    let source = library(
        vec![resistor_reference()],
        vec![("RES", resistor_component(None))],
    );
    let mut container = source.to_container().unwrap();
    container.insert("SchLib/Resistors.SchLib", vec![PAYLOAD_MARKER, 0xFF, 0xFF]);

    let err = IntLibReader::default().read(&mut container).unwrap_err();
    assert!(matches!(err.root(), Error::DecompressionFailure(_)));
    assert_eq!(
        err.trail(),
        Some(
            "Reading integrated library > Reading parts > \
             Reading schematic library Resistors.SchLib"
        )
    );
}

#[test]
fn empty_library_round_trips() {
    let decoded = IntLib::from_bytes(&IntLib::default().to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.version, [0; 5]);
    assert!(decoded.parameters.is_empty());
    assert!(decoded.cross_references.is_empty());
    assert!(decoded.components.is_empty());
    assert!(decoded.diagnostics.is_empty());
}

#[test]
fn footprint_without_pcb_library_keeps_the_component() {
    let reference = CrossReference {
        footprint: Some(FootprintReference {
            footprint: "0603".to_string(),
            footprint_format: "PCBLib".to_string(),
            pcb_lib: None,
        }),
        ..resistor_reference()
    };
    let source = library(
        vec![reference.clone()],
        vec![("RES", resistor_component(None))],
    );

    let decoded = IntLib::from_bytes(&source.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.cross_references, vec![reference]);
    let component = decoded.component("RES").unwrap();
    assert_eq!(component.sch_lib.components[0].name(), "RES");
    assert!(component.pcb_lib.is_none());

    assert_eq!(decoded.diagnostics.len(), 1);
    assert_eq!(decoded.diagnostics[0].lib_ref.as_deref(), Some("RES"));
    assert!(decoded.diagnostics[0].message.contains("names no PCB library"));
}
