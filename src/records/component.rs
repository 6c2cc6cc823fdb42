// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/records/component.rs - Schematic component record.
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

use std::any::Any;

use rand::Rng;

use crate::parameters::ParameterCollection;
use crate::records::{GraphicalBase, SchRecord};
use crate::units::CoordRect;

const DEFAULT_PATH: &str = "*";
const DEFAULT_COLOR: i32 = 128;
const DEFAULT_AREA_COLOR: i32 = 11_599_871;
const UNIQUE_ID_LENGTH: usize = 8;

/// A random `UNIQUEID` of eight capital letters.
pub fn generate_unique_id() -> String {
    let mut rng = rand::rng();
    (0..UNIQUE_ID_LENGTH)
        .map(|_| char::from(rng.random_range(b'A'..=b'Z')))
        .collect()
}

/// A library component: identity, part bookkeeping and the primitives that
/// draw it.
#[derive(Debug)]
pub struct SchComponent {
    pub base: GraphicalBase,
    pub unique_id: String,
    pub current_part_id: i32,
    pub lib_reference: String,
    pub component_description: String,
    /// Number of parts. Stored on disk as one more than this.
    pub part_count: i32,
    pub display_mode_count: i32,
    pub display_mode: i32,
    pub show_hidden_pins: bool,
    pub library_path: String,
    pub source_library_name: String,
    pub sheet_part_filename: String,
    pub target_filename: String,
    pub override_colors: bool,
    pub designator_locked: bool,
    pub part_id_locked: bool,
    pub design_item_id: String,
    pub component_kind: i32,
    pub alias_list: String,
    pub all_pin_count: i32,
    pub primitives: Vec<Box<dyn SchRecord>>,
}

impl Default for SchComponent {
    fn default() -> Self {
        Self {
            base: GraphicalBase {
                index_in_sheet: -1,
                owner_part_id: -1,
                color: DEFAULT_COLOR,
                area_color: DEFAULT_AREA_COLOR,
                ..GraphicalBase::default()
            },
            unique_id: String::new(),
            current_part_id: 1,
            lib_reference: String::new(),
            component_description: String::new(),
            part_count: 0,
            display_mode_count: 1,
            display_mode: 0,
            show_hidden_pins: false,
            library_path: DEFAULT_PATH.to_string(),
            source_library_name: DEFAULT_PATH.to_string(),
            sheet_part_filename: DEFAULT_PATH.to_string(),
            target_filename: DEFAULT_PATH.to_string(),
            override_colors: false,
            designator_locked: false,
            part_id_locked: true,
            design_item_id: String::new(),
            component_kind: 0,
            alias_list: String::new(),
            all_pin_count: 0,
            primitives: Vec::new(),
        }
    }
}

impl SchComponent {
    pub const RECORD: i32 = 1;

    /// A fresh component with a newly generated unique id.
    pub fn new(lib_reference: &str) -> Self {
        Self {
            unique_id: generate_unique_id(),
            lib_reference: lib_reference.to_string(),
            design_item_id: lib_reference.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.lib_reference
    }

    pub fn description(&self) -> &str {
        &self.component_description
    }

    pub fn add_primitive(&mut self, primitive: Box<dyn SchRecord>) {
        self.primitives.push(primitive);
    }

    /// Primitives of one concrete kind.
    pub fn primitives_of<T: SchRecord>(&self) -> impl Iterator<Item = &T> {
        self.primitives.iter().filter_map(|p| p.downcast_ref::<T>())
    }
}

impl SchRecord for SchComponent {
    fn record(&self) -> i32 {
        Self::RECORD
    }

    fn base(&self) -> &GraphicalBase {
        &self.base
    }

    fn import_from_parameters(&mut self, p: &ParameterCollection) {
        self.base.import_from_parameters(p);
        self.unique_id = p.get("UNIQUEID").as_str_or_default();
        self.current_part_id = p.get("CURRENTPARTID").as_int_or_default();
        self.lib_reference = p.get("LIBREFERENCE").as_str_or_default();
        self.component_description = p.get("COMPONENTDESCRIPTION").as_str_or_default();
        self.part_count = p.get("PARTCOUNT").as_int_or_default().saturating_sub(1);
        self.display_mode_count = p.get("DISPLAYMODECOUNT").as_int_or_default();
        self.display_mode = p.get("DISPLAYMODE").as_int_or_default();
        self.show_hidden_pins = p.get("SHOWHIDDENPINS").as_bool();
        self.library_path = p.get("LIBRARYPATH").as_str_or(DEFAULT_PATH);
        self.source_library_name = p.get("SOURCELIBRARYNAME").as_str_or(DEFAULT_PATH);
        self.sheet_part_filename = p.get("SHEETPARTFILENAME").as_str_or(DEFAULT_PATH);
        self.target_filename = p.get("TARGETFILENAME").as_str_or(DEFAULT_PATH);
        self.override_colors = p.get("OVERIDECOLORS").as_bool();
        self.designator_locked = p.get("DESIGNATORLOCKED").as_bool();
        self.part_id_locked = p.get("PARTIDLOCKED").as_bool();
        self.design_item_id = p.get("DESIGNITEMID").as_str_or_default();
        self.component_kind = p.get("COMPONENTKIND").as_int_or_default();
        self.alias_list = p.get("ALIASLIST").as_str_or_default();
        self.all_pin_count = p.get("ALLPINCOUNT").as_int_or_default();
    }

    fn export_to_parameters(&self, p: &mut ParameterCollection) {
        self.base.export_to_parameters(Self::RECORD, p);
        p.set_bookmark();
        p.add("LIBREFERENCE", &self.lib_reference);
        p.add("COMPONENTDESCRIPTION", &self.component_description);
        p.add("PARTCOUNT", self.part_count.saturating_add(1));
        p.add("DISPLAYMODECOUNT", self.display_mode_count);
        p.move_keys(&[
            "INDEXINSHEET",
            "OWNERPARTID",
            "LOCATION.X",
            "LOCATION.X_FRAC",
            "LOCATION.Y",
            "LOCATION.Y_FRAC",
        ]);
        p.add("CURRENTPARTID", self.current_part_id);
        p.add("SHOWHIDDENPINS", self.show_hidden_pins);
        p.add("LIBRARYPATH", &self.library_path);
        p.add("SOURCELIBRARYNAME", &self.source_library_name);
        p.add("SHEETPARTFILENAME", &self.sheet_part_filename);
        p.add("TARGETFILENAME", &self.target_filename);
        p.add("UNIQUEID", &self.unique_id);
        p.move_keys(&["AREACOLOR", "COLOR"]);
        p.add("DISPLAYMODE", self.display_mode);
        p.add("OVERIDECOLORS", self.override_colors);
        p.add("DESIGNATORLOCKED", self.designator_locked);
        p.add_always("PARTIDLOCKED", self.part_id_locked);
        p.add("ALIASLIST", &self.alias_list);
        p.add("DESIGNITEMID", &self.design_item_id);
        p.add("COMPONENTKIND", self.component_kind);
        p.add("ALLPINCOUNT", self.all_pin_count);
    }

    fn calculate_bounds(&self) -> CoordRect {
        CoordRect::union_all(self.primitives.iter().map(|p| p.calculate_bounds()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{SchJunction, SchRectangle};
    use crate::units::{Coord, CoordPoint};

    #[test]
    fn part_count_is_stored_plus_one() {
        for part_count in [0, 1, 2, 7] {
            let component = SchComponent {
                part_count,
                ..SchComponent::new("U")
            };
            let p = component.to_parameters();
            assert_eq!(p.get("PARTCOUNT").as_int_or_default(), part_count + 1);

            let mut decoded = SchComponent::default();
            decoded.import_from_parameters(&p);
            assert_eq!(decoded.part_count, part_count);
        }
    }

    #[test]
    fn canonical_key_order() {
        let component = SchComponent {
            unique_id: "ABCDEFGH".to_string(),
            part_count: 1,
            ..SchComponent::new("RES")
        };
        let keys: Vec<String> = component
            .to_parameters()
            .keys()
            .map(String::from)
            .collect();
        assert_eq!(
            keys,
            vec![
                "RECORD",
                "LIBREFERENCE",
                "PARTCOUNT",
                "DISPLAYMODECOUNT",
                "INDEXINSHEET",
                "OWNERPARTID",
                "CURRENTPARTID",
                "LIBRARYPATH",
                "SOURCELIBRARYNAME",
                "SHEETPARTFILENAME",
                "TARGETFILENAME",
                "UNIQUEID",
                "AREACOLOR",
                "COLOR",
                "PARTIDLOCKED",
                "DESIGNITEMID",
            ]
        );
    }

    #[test]
    fn semantic_round_trip() {
        let component = SchComponent {
            unique_id: "QWERTYUI".to_string(),
            component_description: "Resistor".to_string(),
            part_count: 2,
            display_mode: 1,
            show_hidden_pins: true,
            library_path: "C:\\Libs".to_string(),
            override_colors: true,
            designator_locked: true,
            part_id_locked: false,
            component_kind: 3,
            alias_list: "R,RES".to_string(),
            all_pin_count: 2,
            ..SchComponent::new("RES")
        };

        let mut p = component.to_parameters();
        // Import must not depend on key order.
        p.move_keys(&["RECORD"]);

        let mut decoded = SchComponent::default();
        decoded.import_from_parameters(&p);

        assert_eq!(decoded.base, component.base);
        assert_eq!(decoded.unique_id, component.unique_id);
        assert_eq!(decoded.lib_reference, component.lib_reference);
        assert_eq!(decoded.component_description, component.component_description);
        assert_eq!(decoded.part_count, component.part_count);
        assert_eq!(decoded.display_mode, component.display_mode);
        assert_eq!(decoded.show_hidden_pins, component.show_hidden_pins);
        assert_eq!(decoded.library_path, component.library_path);
        assert_eq!(decoded.source_library_name, "*");
        assert_eq!(decoded.override_colors, component.override_colors);
        assert_eq!(decoded.designator_locked, component.designator_locked);
        assert_eq!(decoded.part_id_locked, component.part_id_locked);
        assert_eq!(decoded.design_item_id, component.design_item_id);
        assert_eq!(decoded.component_kind, component.component_kind);
        assert_eq!(decoded.alias_list, component.alias_list);
        assert_eq!(decoded.all_pin_count, component.all_pin_count);
    }

    #[test]
    fn path_fields_default_to_star() {
        let p = ParameterCollection::from_bytes(b"|RECORD=1|LIBREFERENCE=C\0").unwrap();
        let mut decoded = SchComponent::default();
        decoded.import_from_parameters(&p);
        assert_eq!(decoded.library_path, "*");
        assert_eq!(decoded.source_library_name, "*");
        assert_eq!(decoded.sheet_part_filename, "*");
        assert_eq!(decoded.target_filename, "*");
        assert_eq!(decoded.part_count, -1);
    }

    #[test]
    fn new_components_get_a_unique_id() {
        let first = SchComponent::new("U");
        let second = SchComponent::new("U");
        assert_eq!(first.unique_id.len(), 8);
        assert!(first.unique_id.chars().all(|c| c.is_ascii_uppercase()));
        assert_ne!(first.unique_id, second.unique_id);
        assert_eq!(
            first.to_parameters().get("UNIQUEID").as_str_or_default(),
            first.unique_id
        );

        let mut decoded = SchComponent::default();
        decoded.import_from_parameters(&ParameterCollection::from_bytes(b"|RECORD=1\0").unwrap());
        assert!(decoded.unique_id.is_empty());
    }

    #[test]
    fn bounds_cover_all_primitives() {
        let mut component = SchComponent::new("U");
        assert_eq!(component.calculate_bounds(), CoordRect::default());

        let mut rectangle = SchRectangle::default();
        rectangle.base.location = CoordPoint::new(0, 0);
        rectangle.corner = CoordPoint::new(1_000_000, 500_000);
        component.add_primitive(Box::new(rectangle));

        let mut junction = SchJunction::default();
        junction.base.location = CoordPoint::new(1_000_000, 500_000);
        component.add_primitive(Box::new(junction));

        let bounds = component.calculate_bounds();
        assert_eq!(bounds.min, CoordPoint::new(0, 0));
        assert_eq!(bounds.max.x, Coord(1_000_000 + Coord::from_dxp(2).0));
        assert_eq!(component.primitives_of::<SchJunction>().count(), 1);
    }
}
