//! Line-based terminal prompts over any reader/writer pair.

use std::io::{self, BufRead, Write};

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{message}")
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }

    /// Asks until `validate` accepts the answer. End of input is an
    /// `UnexpectedEof` error.
    pub fn input<F>(&mut self, message: &str, validate: F) -> io::Result<String>
    where
        F: Fn(&str) -> Result<(), String>,
    {
        loop {
            write!(self.output, "? {message} ")?;
            self.output.flush()?;
            let answer = self.read_line()?;
            match validate(&answer) {
                Ok(()) => return Ok(answer),
                Err(reason) => writeln!(self.output, ">> {reason}")?,
            }
        }
    }

    /// Numbered list; an empty answer picks `default`. Returns the index.
    pub fn select(&mut self, message: &str, choices: &[String], default: usize) -> io::Result<usize> {
        writeln!(self.output, "? {message}")?;
        for (i, choice) in choices.iter().enumerate() {
            writeln!(self.output, "  {}) {choice}", i + 1)?;
        }
        loop {
            write!(self.output, "  Answer [{}]: ", default + 1)?;
            self.output.flush()?;
            let answer = self.read_line()?;
            let answer = answer.trim();
            if answer.is_empty() {
                return Ok(default);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=choices.len()).contains(&n) => return Ok(n - 1),
                _ => writeln!(
                    self.output,
                    ">> please enter a number between 1 and {}",
                    choices.len()
                )?,
            }
        }
    }

    pub fn confirm(&mut self, message: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "(Y/n)" } else { "(y/N)" };
        loop {
            write!(self.output, "? {message} {hint} ")?;
            self.output.flush()?;
            let answer = self.read_line()?;
            match answer.trim().to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, ">> please answer yes or no")?,
            }
        }
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
    }
}
