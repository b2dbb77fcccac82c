use std::io::{self, BufRead, Write};

pub const CONFIRM_PROMPT: &str = "Do you really want to apply the changes? [Y/N]: ";
pub const POSSIBLE_CHOICES: &str = "Possible choices: [Y, y, Yes, yes, N, n, No, no]";

/// Ask until the answer is one of y/yes/n/no (any case). End of input
/// counts as no.
pub fn confirm_apply<R: BufRead, W: Write>(mut reader: R, mut writer: W) -> io::Result<bool> {
    let mut line = String::new();
    loop {
        write!(writer, "{}", CONFIRM_PROMPT)?;
        writer.flush()?;

        line.clear();
        if reader.read_line(&mut line)? == 0 {
            writeln!(writer)?;
            return Ok(false);
        }

        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(writer, "{}", POSSIBLE_CHOICES)?,
        }
    }
}
