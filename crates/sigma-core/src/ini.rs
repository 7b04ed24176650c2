//! Minimal reader for pipeline ini files.
//!
//! Every value is stored as text and typed when a module reads it, so
//! `z = 0.0 0.5 1.0` can be read as a vector and `use_m = T` as a bool.

use crate::block::{DataBlock, MemoryBlock, Value};
use crate::error::BlockError;

impl MemoryBlock {
    /// Parse ini text into a block, one block section per ini section.
    ///
    /// Accepts `key = value` and `key : value`, `;` and `#` comment lines,
    /// and inline `;` comments. Later assignments override earlier ones.
    pub fn from_ini_str(text: &str) -> Result<Self, BlockError> {
        let mut block = MemoryBlock::new();
        let mut section: Option<String> = None;

        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| BlockError::Ini {
                    line: line_no,
                    message: format!("unterminated section header {line:?}"),
                })?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(BlockError::Ini {
                        line: line_no,
                        message: "empty section name".to_string(),
                    });
                }
                section = Some(name.to_string());
                continue;
            }

            let Some(current) = section.as_deref() else {
                return Err(BlockError::Ini {
                    line: line_no,
                    message: "assignment outside of any section".to_string(),
                });
            };

            let split_at = line.find(|c: char| c == '=' || c == ':').ok_or_else(|| BlockError::Ini {
                line: line_no,
                message: format!("expected `key = value`, got {line:?}"),
            })?;
            let name = line[..split_at].trim();
            if name.is_empty() {
                return Err(BlockError::Ini {
                    line: line_no,
                    message: "missing key before separator".to_string(),
                });
            }
            let value = strip_inline_comment(&line[split_at + 1..]).trim();
            block.put(current, name, Value::Str(value.to_string()));
        }

        Ok(block)
    }
}

fn strip_inline_comment(value: &str) -> &str {
    match value.find(" ;") {
        Some(pos) => &value[..pos],
        None => value,
    }
}
