// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/records/primitives.rs - Graphical schematic primitives.
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

use crate::parameters::ParameterCollection;
use crate::records::{
    GraphicalBase, LineWidth, SchRecord, TextOrientation, read_point, write_point,
};
use crate::units::{Coord, CoordPoint, CoordRect};

/// Parameter name that is never shown, whatever its hidden flag says.
const HIDDEN_NET_NAME: &str = "HiddenNetName";

/// A wire junction dot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchJunction {
    pub base: GraphicalBase,
    pub size: LineWidth,
    pub locked: bool,
}

impl SchJunction {
    pub const RECORD: i32 = 29;

    /// Junctions placed by hand have a sheet index; automatic ones use -1.
    pub fn is_manual(&self) -> bool {
        self.base.index_in_sheet != -1
    }
}

impl SchRecord for SchJunction {
    fn record(&self) -> i32 {
        Self::RECORD
    }

    fn base(&self) -> &GraphicalBase {
        &self.base
    }

    fn import_from_parameters(&mut self, p: &ParameterCollection) {
        self.base.import_from_parameters(p);
        self.size = p.get("SIZE").as_enum_or_default();
        self.locked = p.get("LOCKED").as_bool();
    }

    fn export_to_parameters(&self, p: &mut ParameterCollection) {
        self.base.export_to_parameters(Self::RECORD, p);
        p.add_enum("SIZE", self.size);
        p.add("LOCKED", self.locked);
    }

    /// A fixed 4x4 DXP handle around the location; `SIZE` does not matter.
    fn calculate_bounds(&self) -> CoordRect {
        let location = self.base.location;
        let half = Coord::from_dxp(2).0;
        CoordRect::from_location_size(
            CoordPoint::new(
                location.x.0.saturating_sub(half),
                location.y.0.saturating_sub(half),
            ),
            Coord::from_dxp(4),
            Coord::from_dxp(4),
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A named parameter label attached to a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchParameter {
    pub base: GraphicalBase,
    pub name: String,
    pub text: String,
    pub font_id: i32,
    pub orientation: TextOrientation,
    pub is_hidden: bool,
    pub param_type: i32,
    pub description: String,
}

impl Default for SchParameter {
    fn default() -> Self {
        Self {
            base: GraphicalBase {
                location: CoordPoint::new(-5, -15),
                ..GraphicalBase::default()
            },
            name: String::new(),
            text: String::new(),
            font_id: 0,
            orientation: TextOrientation::default(),
            is_hidden: false,
            param_type: 0,
            description: String::new(),
        }
    }
}

impl SchParameter {
    pub const RECORD: i32 = 41;

    /// The description when there is one, otherwise the value text.
    pub fn display_text(&self) -> &str {
        if self.description.is_empty() {
            &self.text
        } else {
            &self.description
        }
    }

    pub fn is_visible(&self) -> bool {
        !self.is_hidden && !self.name.eq_ignore_ascii_case(HIDDEN_NET_NAME)
    }
}

impl SchRecord for SchParameter {
    fn record(&self) -> i32 {
        Self::RECORD
    }

    fn base(&self) -> &GraphicalBase {
        &self.base
    }

    fn import_from_parameters(&mut self, p: &ParameterCollection) {
        self.base.import_from_parameters(p);
        self.orientation = p.get("ORIENTATION").as_enum_or_default();
        self.font_id = p.get("FONTID").as_int_or_default();
        self.text = p.get("TEXT").as_str_or_default();
        self.name = p.get("NAME").as_str_or_default();
        self.is_hidden = p.get("ISHIDDEN").as_bool();
        self.param_type = p.get("PARAMTYPE").as_int_or_default();
        self.description = p.get("DESCRIPTION").as_str_or_default();
    }

    fn export_to_parameters(&self, p: &mut ParameterCollection) {
        self.base.export_to_parameters(Self::RECORD, p);
        p.add_enum("ORIENTATION", self.orientation);
        p.add("FONTID", self.font_id);
        p.add("TEXT", &self.text);
        p.add("NAME", &self.name);
        p.add("ISHIDDEN", self.is_hidden);
        p.set_bookmark();
        p.add("PARAMTYPE", self.param_type);
        p.move_keys(&["NAME"]);
        p.add("DESCRIPTION", &self.description);
    }

    fn calculate_bounds(&self) -> CoordRect {
        CoordRect::from_location_size(self.base.location, Coord(1), Coord(1))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An axis-aligned rectangle between the location and an opposite corner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchRectangle {
    pub base: GraphicalBase,
    pub corner: CoordPoint,
    pub line_width: LineWidth,
    pub is_solid: bool,
    pub transparent: bool,
}

impl SchRectangle {
    pub const RECORD: i32 = 14;
}

impl SchRecord for SchRectangle {
    fn record(&self) -> i32 {
        Self::RECORD
    }

    fn base(&self) -> &GraphicalBase {
        &self.base
    }

    fn import_from_parameters(&mut self, p: &ParameterCollection) {
        self.base.import_from_parameters(p);
        self.corner = read_point(p, "CORNER");
        self.line_width = p.get("LINEWIDTH").as_enum_or_default();
        self.is_solid = p.get("ISSOLID").as_bool();
        self.transparent = p.get("TRANSPARENT").as_bool();
    }

    fn export_to_parameters(&self, p: &mut ParameterCollection) {
        self.base.export_to_parameters(Self::RECORD, p);
        p.set_bookmark();
        write_point(p, "CORNER", self.corner);
        p.add_enum("LINEWIDTH", self.line_width);
        p.move_keys(&["COLOR", "AREACOLOR"]);
        p.add("ISSOLID", self.is_solid);
        p.add("TRANSPARENT", self.transparent);
    }

    fn calculate_bounds(&self) -> CoordRect {
        CoordRect::from_points(self.base.location, self.corner)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A record kind with no registered decoder. The parameters are kept as read
/// and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownRecord {
    pub record: i32,
    pub base: GraphicalBase,
    pub parameters: ParameterCollection,
}

impl UnknownRecord {
    pub fn new(record: i32) -> Self {
        Self {
            record,
            ..Self::default()
        }
    }
}

impl SchRecord for UnknownRecord {
    fn record(&self) -> i32 {
        self.record
    }

    fn base(&self) -> &GraphicalBase {
        &self.base
    }

    fn import_from_parameters(&mut self, p: &ParameterCollection) {
        self.base.import_from_parameters(p);
        self.parameters = p.clone();
    }

    fn export_to_parameters(&self, p: &mut ParameterCollection) {
        for (key, value) in self.parameters.iter() {
            p.add_always(key, value);
        }
    }

    fn calculate_bounds(&self) -> CoordRect {
        CoordRect::from_points(self.base.location, self.base.location)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
