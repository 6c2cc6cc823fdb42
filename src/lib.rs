// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/lib.rs - Reader and writer library for Altium Designer library files.
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
 * # `altiumlib` Crate
 *
 * A library for reading and writing Altium Designer integrated libraries
 * (`.IntLib`) and the schematic and PCB libraries embedded in them.
 *
 * The crate is layered, leaves first:
 *
 * 1. [binary]: Block framing, length-prefixed strings and zlib payloads.
 * 2. [parameters]: The ordered `|KEY=VALUE` lists every record is stored as.
 * 3. [records]: Typed schematic records built from parameter lists.
 * 4. [schlib] and [pcblib]: The embedded library documents.
 * 5. [intlib]: The integrated library itself.
 *
 * ## Usage Example
 *
 * ```no_run
 * use altiumlib::IntLib;
 * use altiumlib::records::SchRectangle;
 *
 * fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     // Read the library
 *     let library = IntLib::open("Resistors.IntLib")?;
 *
 *     // Walk the components
 *     for (lib_ref, component) in &library.components {
 *         println!("Component: {}", lib_ref);
 *         for symbol in &component.sch_lib.components {
 *             for rectangle in symbol.primitives_of::<SchRectangle>() {
 *                 println!("  Rectangle to ({:?}, {:?})", rectangle.corner.x, rectangle.corner.y);
 *             }
 *         }
 *     }
 *
 *     // Problems that did not stop the read
 *     for diagnostic in &library.diagnostics {
 *         println!("Warning: {}", diagnostic);
 *     }
 *
 *     Ok(())
 * }
 * ```
 */

pub mod binary;
pub mod container;
pub mod context;
pub mod error;
pub mod intlib;
pub mod parameters;
pub mod pcblib;
pub mod records;
pub mod schlib;
pub mod units;

pub use error::{Error, Result};
pub use intlib::{IntLib, IntLibReader, ReaderOptions};
