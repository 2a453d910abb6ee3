//! Utility functions for preparing a program for execution
//!
//! A listing holds one instruction per line. `name:` marks the next
//! instruction, `#` and `//` start comments, and `.` directives are
//! skipped. Anything inside a `.data` segment is ignored.

use std::fs;
use std::path::Path;

use log::debug;
use log::warn;

use crate::error::SimulatorError;
use crate::error::SimulatorResult;
use crate::program::LabelTable;
use crate::program::Program;

/// Reads and parses a listing from disk
pub fn load_program(path: &Path) -> SimulatorResult<Program> {
    let source = fs::read_to_string(path)?;
    parse_listing(&source).map_err(|e| SimulatorError::LoadError(path.to_path_buf(), e))
}

fn strip_comment(line: &str) -> &str {
    let end = [line.find('#'), line.find("//")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    &line[..end]
}

fn is_label(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Splits a listing into instruction lines and text labels
pub fn parse_listing(source: &str) -> Result<Program, String> {
    let mut lines: Vec<String> = Vec::new();
    let mut labels = LabelTable::default();
    let mut in_data = false;

    for (line_num, raw) in source.lines().enumerate() {
        let mut line = strip_comment(raw).trim();

        if line.starts_with('.') {
            let directive = line.split_whitespace().next().unwrap_or(line);
            match directive {
                ".data" => in_data = true,
                ".text" => in_data = false,
                _ => debug!("Skipping directive '{}' at line {}", directive, line_num + 1),
            }
            continue;
        }
        if in_data {
            if !line.is_empty() {
                warn!("Ignoring data definition at line {}: '{}'", line_num + 1, line);
            }
            continue;
        }

        // Labels, possibly several, before the instruction
        while let Some((name, rest)) = line.split_once(':') {
            let name = name.trim();
            if !is_label(name) {
                return Err(format!("Invalid label '{}' at line {}", name, line_num + 1));
            }
            if labels.text(name).is_some() {
                return Err(format!("Duplicate label '{}' at line {}", name, line_num + 1));
            }
            labels.insert_text(name, lines.len());
            line = rest.trim();
        }

        if line.is_empty() || line.starts_with('.') {
            continue;
        }
        lines.push(line.to_string());
    }

    Ok(Program::new(lines, labels))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const LISTING: &str = "
        .text
        .globl main
main:   addi $t0, $zero, 3   # counter
loop:
        addi $t0, $t0, -1    // decrement
        bne $t0, $zero, loop
        nop
        .data
arr:    .word 1, 2, 3
        .text
done:   syscall
";

    #[test]
    fn labels_mark_the_next_instruction() {
        let program = parse_listing(LISTING).unwrap();
        assert_eq!(program.len(), 5);
        assert_eq!(program.labels().text("main"), Some(0));
        assert_eq!(program.labels().text("loop"), Some(1));
        assert_eq!(program.labels().text("done"), Some(4));
        assert_eq!(program.labels().text("arr"), None);
        assert_eq!(program.line(1), Some("addi $t0, $t0, -1"));
    }

    #[test]
    fn listing_decodes() {
        let mut program = parse_listing(LISTING).unwrap();
        assert!(program.decode_all().is_ok());
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let err = parse_listing("a: nop\na: nop").unwrap_err();
        assert!(err.contains("Duplicate label 'a'"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_program(Path::new("/nonexistent/listing.s")).unwrap_err();
        assert!(matches!(err, SimulatorError::IoError(_)));
    }
}
