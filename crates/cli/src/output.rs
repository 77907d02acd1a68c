//! Command output
//!
//! Results go to stdout as pretty JSON; logs go to stderr.

use serde::Serialize;
use std::io::Write;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> eyre::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

pub fn print_text(text: &str) -> eyre::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        writeln!(stdout)?;
    }
    Ok(())
}
