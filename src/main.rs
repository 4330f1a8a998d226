//! # media-arrange CLI
//!
//! Command-line interface for the media arranger.
//!
//! ## Usage
//! ```bash
//! media-arrange organize -i ~/Camera -o ~/Pictures/Sorted -l YYYY/MMM/DD
//! media-arrange dd -i ~/Pictures --action move
//! ```

mod cli;

use media_arranger::Result;

fn main() -> Result<()> {
    cli::run()
}
