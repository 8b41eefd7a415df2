//! # card-ingest CLI
//!
//! Command-line front-end for the card ingest engine.
//!
//! ## Usage
//! ```bash
//! card-ingest card --source /media/CARD --archive /mnt/archive --proxy /mnt/ssd \
//!     --client Iriya --project "Yom HaAtsmaut"
//! card-ingest session --cards 3 --client Iriya --project "Yom HaAtsmaut"
//! card-ingest ledger --filter iriya
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    card_ingest::init_tracing();

    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", console::style("error:").red().bold(), e);
            ExitCode::from(2)
        }
    }
}
