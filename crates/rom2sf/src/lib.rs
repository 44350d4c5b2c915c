//! A tool to convert NDS ROM images into 2SF files.
//!
//! Any arguments which are not options are treated as ROM files to convert.
//! Each file is handed to a conversion engine, which is an external program
//! (`nds2sf` unless `--engine <program>` is specified) that is responsible
//! for extracting and packing the ROM.
//!
//! By default a file like `song.nds` is converted to `song.2sf` next to it.
//! If `--lib <name>` is specified, output files instead reference the given
//! library and are named like `song.mini2sf`.
//!
//! <br>
//!
//! ## Usage
//!
//! ```sh
//! rom2sf --2sfby "Your Name" song.nds
//! ```
//!
//! Options are only recognized up until the first file, so everything after
//! it is treated as a file to convert.
//!
//! Conversions continue even if one of them fails. The tool exits with an
//! error once every file has been attempted if any of them failed.
//!
//! <br>
//!
//! ## Caveats
//!
//! The `-o <path>` option sets the output path for *every* file in the
//! batch. So if multiple files are being converted, each conversion will
//! overwrite the output of the previous one. Only use `-o` when converting a
//! single file.

pub mod cli;
mod config;
mod engine;
mod load;
mod out;
mod shell;
mod tags;
