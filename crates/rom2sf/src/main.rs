//! NDS ROM to 2SF converter.
//!
//! See [`rom2sf`] documentation for more information.
//!
//! [`rom2sf`]: https://crates.io/crates/rom2sf

use std::env;

use anyhow::Result;

use rom2sf::cli::Rom2sf;

fn main() -> Result<()> {
    let opts = Rom2sf::try_parse_args(env::args_os()).unwrap_or_else(|e| e.exit());
    rom2sf::cli::entry(&opts)
}
