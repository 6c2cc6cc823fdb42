// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/units.rs - Coordinate units used by Altium records.
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
 * # `units` Module
 *
 * Geometry is held in [Coord] internal units, 10000 per mil. Schematic
 * records store each axis as a pair of fields: a whole number of DXP units
 * (10 mils each) plus a `_FRAC` remainder counted in internal units.
 */

use std::cmp::{max, min};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Internal units per mil.
pub const COORDS_PER_MIL: i32 = 10_000;

/// Internal units per DXP unit (10 mils).
pub const COORDS_PER_DXP: i32 = 10 * COORDS_PER_MIL;

/// A length or position along one axis, in internal units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coord(pub i32);

impl Coord {
    pub fn from_dxp(dxp: i32) -> Self {
        Self(dxp.saturating_mul(COORDS_PER_DXP))
    }

    /// Combines a whole-DXP field and its `_FRAC` companion.
    pub fn from_dxp_frac(whole: i32, frac: i32) -> Self {
        Self(whole.saturating_mul(COORDS_PER_DXP).saturating_add(frac))
    }

    /// Splits into the whole-DXP and `_FRAC` field values.
    pub fn to_dxp_frac(self) -> (i32, i32) {
        (self.0 / COORDS_PER_DXP, self.0 % COORDS_PER_DXP)
    }

    /// Rounds a length in mils to the nearest internal unit.
    pub fn from_mils(mils: Decimal) -> Option<Self> {
        let units = mils.checked_mul(Decimal::from(COORDS_PER_MIL))?.round();
        units.to_i32().map(Self)
    }

    pub fn to_mils(self) -> Decimal {
        Decimal::new(i64::from(self.0), 4)
    }

    pub fn to_mm(self) -> Decimal {
        let mm_per_mil: Decimal = Decimal::new(254, 4);
        self.to_mils() * mm_per_mil
    }
}

/// A point in internal units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CoordPoint {
    pub x: Coord,
    pub y: Coord,
}

impl CoordPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x: Coord(x),
            y: Coord(y),
        }
    }
}

/// An axis-aligned rectangle, stored with its corners normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CoordRect {
    pub min: CoordPoint,
    pub max: CoordPoint,
}

impl CoordRect {
    /// The rectangle spanned by two opposite corners, in any order.
    pub fn from_points(a: CoordPoint, b: CoordPoint) -> Self {
        Self {
            min: CoordPoint {
                x: min(a.x, b.x),
                y: min(a.y, b.y),
            },
            max: CoordPoint {
                x: max(a.x, b.x),
                y: max(a.y, b.y),
            },
        }
    }

    pub fn from_location_size(location: CoordPoint, width: Coord, height: Coord) -> Self {
        Self::from_points(
            location,
            CoordPoint {
                x: Coord(location.x.0.saturating_add(width.0)),
                y: Coord(location.y.0.saturating_add(height.0)),
            },
        )
    }

    pub fn width(&self) -> Coord {
        Coord(self.max.x.0.saturating_sub(self.min.x.0))
    }

    pub fn height(&self) -> Coord {
        Coord(self.max.y.0.saturating_sub(self.min.y.0))
    }

    pub fn center(&self) -> CoordPoint {
        CoordPoint {
            x: Coord(self.min.x.0.saturating_add(self.width().0 / 2)),
            y: Coord(self.min.y.0.saturating_add(self.height().0 / 2)),
        }
    }

    pub fn contains(&self, point: CoordPoint) -> bool {
        (self.min.x..=self.max.x).contains(&point.x) && (self.min.y..=self.max.y).contains(&point.y)
    }

    pub fn union(&self, other: &CoordRect) -> CoordRect {
        Self::from_points(
            CoordPoint {
                x: min(self.min.x, other.min.x),
                y: min(self.min.y, other.min.y),
            },
            CoordPoint {
                x: max(self.max.x, other.max.x),
                y: max(self.max.y, other.max.y),
            },
        )
    }

    /// The smallest rectangle holding every input, or the empty rectangle at
    /// the origin when there are none.
    pub fn union_all(rects: impl IntoIterator<Item = CoordRect>) -> CoordRect {
        rects
            .into_iter()
            .reduce(|acc, rect| acc.union(&rect))
            .unwrap_or_default()
    }
}
