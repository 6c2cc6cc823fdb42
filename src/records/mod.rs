// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/records/mod.rs - Typed schematic records.
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
 * # `records` Module
 *
 * Each schematic record kind is identified by the integer in its `RECORD`
 * parameter. A [RecordRegistry] maps that integer to a constructor, the
 * constructed [SchRecord] then fills itself from the parameter list. Kinds
 * without a registered constructor decode to [UnknownRecord], which keeps its
 * parameters so it can be written back out unchanged.
 *
 * ## Usage Example
 *
 * ```
 * use altiumlib::parameters::ParameterCollection;
 * use altiumlib::records::{RecordRegistry, SchJunction};
 *
 * let p = ParameterCollection::from_bytes(b"|RECORD=29|INDEXINSHEET=-1|LOCKED=T\0").unwrap();
 * let record = RecordRegistry::default().decode(&p).unwrap();
 * let junction = record.downcast_ref::<SchJunction>().unwrap();
 * assert!(junction.locked);
 * assert!(!junction.is_manual());
 * ```
 */

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::parameters::{ParameterCollection, ParameterEnum};
use crate::units::{Coord, CoordPoint, CoordRect};

mod component;
mod primitives;

pub use component::SchComponent;
pub use primitives::{SchJunction, SchParameter, SchRectangle, UnknownRecord};

/// Behaviour shared by every schematic record kind.
pub trait SchRecord: fmt::Debug + Any {
    /// The `RECORD` discriminator of this kind.
    fn record(&self) -> i32;

    fn base(&self) -> &GraphicalBase;

    fn import_from_parameters(&mut self, p: &ParameterCollection);

    fn export_to_parameters(&self, p: &mut ParameterCollection);

    fn calculate_bounds(&self) -> CoordRect;

    fn as_any(&self) -> &dyn Any;

    /// Exports into a fresh collection.
    fn to_parameters(&self) -> ParameterCollection {
        let mut p = ParameterCollection::new();
        self.export_to_parameters(&mut p);
        p.clear_bookmark();
        p
    }
}

impl dyn SchRecord {
    pub fn downcast_ref<T: SchRecord>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: SchRecord>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Line thickness used by graphical records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineWidth {
    #[default]
    Smallest = 0,
    Small = 1,
    Medium = 2,
    Large = 3,
}

impl ParameterEnum for LineWidth {
    fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(LineWidth::Smallest),
            1 => Some(LineWidth::Small),
            2 => Some(LineWidth::Medium),
            3 => Some(LineWidth::Large),
            _ => None,
        }
    }

    fn to_i32(self) -> i32 {
        self as i32
    }

    fn from_name(name: &str) -> Option<Self> {
        [
            LineWidth::Smallest,
            LineWidth::Small,
            LineWidth::Medium,
            LineWidth::Large,
        ]
        .into_iter()
        .find(|width| format!("{:?}", width).eq_ignore_ascii_case(name))
    }
}

/// Text rotation in quarter turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextOrientation {
    #[default]
    Degrees0 = 0,
    Degrees90 = 1,
    Degrees180 = 2,
    Degrees270 = 3,
}

impl ParameterEnum for TextOrientation {
    fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(TextOrientation::Degrees0),
            1 => Some(TextOrientation::Degrees90),
            2 => Some(TextOrientation::Degrees180),
            3 => Some(TextOrientation::Degrees270),
            _ => None,
        }
    }

    fn to_i32(self) -> i32 {
        self as i32
    }
}

/// Reads a `<PREFIX>.X`, `<PREFIX>.X_FRAC`, `<PREFIX>.Y`, `<PREFIX>.Y_FRAC`
/// quadruple.
pub fn read_point(p: &ParameterCollection, prefix: &str) -> CoordPoint {
    let axis = |name: &str| {
        Coord::from_dxp_frac(
            p.get(&format!("{}.{}", prefix, name)).as_int_or_default(),
            p.get(&format!("{}.{}_FRAC", prefix, name)).as_int_or_default(),
        )
    };
    CoordPoint {
        x: axis("X"),
        y: axis("Y"),
    }
}

/// The inverse of [read_point].
pub fn write_point(p: &mut ParameterCollection, prefix: &str, point: CoordPoint) {
    for (name, coord) in [("X", point.x), ("Y", point.y)] {
        let (whole, frac) = coord.to_dxp_frac();
        p.add(&format!("{}.{}", prefix, name), whole);
        p.add(&format!("{}.{}_FRAC", prefix, name), frac);
    }
}

/// Fields every schematic record carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphicalBase {
    pub owner_index: i32,
    pub is_not_accessible: bool,
    pub index_in_sheet: i32,
    pub owner_part_id: i32,
    pub owner_part_display_mode: i32,
    pub graphically_locked: bool,
    pub location: CoordPoint,
    /// Win32 `COLORREF` value.
    pub color: i32,
    pub area_color: i32,
}

impl GraphicalBase {
    pub fn import_from_parameters(&mut self, p: &ParameterCollection) {
        self.owner_index = p.get("OWNERINDEX").as_int_or_default();
        self.is_not_accessible = p.get("ISNOTACCESIBLE").as_bool();
        self.index_in_sheet = p.get("INDEXINSHEET").as_int_or_default();
        self.owner_part_id = p.get("OWNERPARTID").as_int_or_default();
        self.owner_part_display_mode = p.get("OWNERPARTDISPLAYMODE").as_int_or_default();
        self.graphically_locked = p.get("GRAPHICALLYLOCKED").as_bool();
        self.location = read_point(p, "LOCATION");
        self.color = p.get("COLOR").as_int_or_default();
        self.area_color = p.get("AREACOLOR").as_int_or_default();
    }

    pub fn export_to_parameters(&self, record: i32, p: &mut ParameterCollection) {
        p.add_always("RECORD", record);
        p.add("OWNERINDEX", self.owner_index);
        p.add("ISNOTACCESIBLE", self.is_not_accessible);
        p.add("INDEXINSHEET", self.index_in_sheet);
        p.add("OWNERPARTID", self.owner_part_id);
        p.add("OWNERPARTDISPLAYMODE", self.owner_part_display_mode);
        p.add("GRAPHICALLYLOCKED", self.graphically_locked);
        write_point(p, "LOCATION", self.location);
        p.add("COLOR", self.color);
        p.add("AREACOLOR", self.area_color);
    }
}

pub type RecordFactory = fn() -> Box<dyn SchRecord>;

/// A [RecordFactory] for any default-constructible kind.
pub fn create<T: SchRecord + Default>() -> Box<dyn SchRecord> {
    Box::new(T::default())
}

/// Maps `RECORD` discriminators to record constructors.
#[derive(Debug, Clone)]
pub struct RecordRegistry {
    factories: HashMap<i32, RecordFactory>,
}

impl Default for RecordRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(SchComponent::RECORD, create::<SchComponent>);
        registry.register(SchRectangle::RECORD, create::<SchRectangle>);
        registry.register(SchJunction::RECORD, create::<SchJunction>);
        registry.register(SchParameter::RECORD, create::<SchParameter>);
        registry
    }
}

impl RecordRegistry {
    /// A registry with no kinds; everything decodes to [UnknownRecord].
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers a constructor, returning the one it replaced.
    pub fn register(&mut self, record: i32, factory: RecordFactory) -> Option<RecordFactory> {
        self.factories.insert(record, factory)
    }

    pub fn contains(&self, record: i32) -> bool {
        self.factories.contains_key(&record)
    }

    /// Builds the typed record described by `p`.
    pub fn decode(&self, p: &ParameterCollection) -> Result<Box<dyn SchRecord>> {
        let record = p.get("RECORD").as_int().required("RECORD")?;
        let mut decoded: Box<dyn SchRecord> = match self.factories.get(&record) {
            Some(factory) => factory(),
            None => Box::new(UnknownRecord::new(record)),
        };
        decoded.import_from_parameters(p);
        Ok(decoded)
    }
}
