// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  parse.rs - Parser demo for Altium integrated libraries.
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

use clap::Parser;
use tracing_subscriber::EnvFilter;

use altiumlib::intlib::{DuplicatePolicy, IntLibReader, ReaderOptions};
use altiumlib::records::SchRecord;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The file to read.
    file: String,

    /// Keep the last entry when library references repeat.
    #[arg(long)]
    last_wins: bool,

    /// Skip the embedded PCB libraries.
    #[arg(long)]
    no_footprints: bool,

    /// Print every record of every component.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let policy = if args.last_wins {
        DuplicatePolicy::LastWins
    } else {
        DuplicatePolicy::Reject
    };
    let options = ReaderOptions::default()
        .duplicate_lib_refs(policy)
        .load_footprints(!args.no_footprints);

    let library = match IntLibReader::new(options).open(&args.file) {
        Ok(library) => library,
        Err(error) => {
            eprintln!("Error reading file {:?}: {}", &args.file, error);
            return;
        }
    };

    println!("Version: {:02x?}", library.version);
    println!("Parameters: {}", library.parameters);

    for cross_reference in &library.cross_references {
        let Some(component) = library.component(&cross_reference.lib_ref) else {
            println!("{}: not loaded", cross_reference.lib_ref);
            continue;
        };

        println!(
            "{}: {} ({} part(s))",
            cross_reference.lib_ref, cross_reference.description, cross_reference.parts_count
        );
        for sch in &component.sch_lib.components {
            let bounds = sch.calculate_bounds();
            println!(
                "  Symbol {}: {} primitive(s), {} x {} mil",
                sch.name(),
                sch.primitives.len(),
                bounds.width().to_mils(),
                bounds.height().to_mils()
            );
            if args.verbose {
                for primitive in &sch.primitives {
                    println!("    {}", primitive.to_parameters());
                }
            }
        }
        if let Some(pcb_lib) = &component.pcb_lib {
            for footprint in &pcb_lib.footprints {
                println!(
                    "  Footprint {}: height {} mm",
                    footprint.name,
                    footprint.height.to_mm().normalize()
                );
            }
        }
    }

    for diagnostic in &library.diagnostics {
        eprintln!("Warning: {}", diagnostic);
    }
}
