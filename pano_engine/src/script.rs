//! Line-oriented scene-script parsing. One command per line: a keyword
//! followed by whitespace-separated arguments, with double quotes grouping
//! arguments that contain spaces and `//` starting a comment.

use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptCommand {
    /// 1-based source line, for diagnostics.
    pub line: usize,
    pub keyword: String,
    pub args: Vec<String>,
}

impl ScriptCommand {
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn arg_u32(&self, index: usize) -> Option<u32> {
        self.arg(index)?.parse().ok()
    }

    pub fn arg_f32(&self, index: usize) -> Option<f32> {
        self.arg(index)?.parse().ok()
    }

    /// Boolean-ish argument: on/off, true/false, 1/0.
    pub fn arg_flag(&self, index: usize) -> Option<bool> {
        match self.arg(index)? {
            "on" | "true" | "1" => Some(true),
            "off" | "false" | "0" => Some(false),
            _ => None,
        }
    }
}

pub fn parse_script(source: &str) -> Result<Vec<ScriptCommand>> {
    let mut commands = Vec::new();
    for (index, raw_line) in source.lines().enumerate() {
        let line = index + 1;
        let tokens = tokenize(raw_line, line)?;
        let Some((keyword, args)) = tokens.split_first() else {
            continue;
        };
        commands.push(ScriptCommand {
            line,
            keyword: keyword.clone(),
            args: args.to_vec(),
        });
    }
    Ok(commands)
}

fn tokenize(raw_line: &str, line: usize) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = raw_line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    // Closing quote ends the token even when empty.
                    tokens.push(std::mem::take(&mut current));
                    in_quotes = false;
                } else {
                    in_quotes = true;
                }
            }
            '/' if !in_quotes && chars.peek() == Some(&'/') => break,
            ch if ch.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            ch => current.push(ch),
        }
    }
    if in_quotes {
        bail!("line {line}: unterminated quote");
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}
