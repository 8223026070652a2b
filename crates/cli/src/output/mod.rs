//! Command output: text tables or a structured result envelope.

mod format;
mod model;
mod table;

use std::io::{self, Write};

use serde::Serialize;

pub use format::OutputFormat;
pub use model::*;
pub use table::Table;

/// Prints `result` to stdout.
///
/// Text output comes from `text`; the structured formats serialize the whole
/// envelope, and `ndjson` emits one line per element when `data` is a list.
pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat, text: impl FnOnce(&T) -> String) {
	let mut stdout = io::stdout().lock();
	let _ = write_result(&mut stdout, result, format, text);
}

pub fn write_result<T: Serialize>(out: &mut impl Write, result: &CommandResult<T>, format: OutputFormat, text: impl FnOnce(&T) -> String) -> io::Result<()> {
	match format {
		OutputFormat::Text => {
			if let Some(data) = &result.data {
				out.write_all(text(data).as_bytes())?;
			} else if let Some(error) = &result.error {
				writeln!(out, "Error: {}", error.message)?;
			}
		}
		OutputFormat::Json => {
			let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
			writeln!(out, "{json}")?;
		}
		OutputFormat::Ndjson => match serde_json::to_value(&result.data).map_err(io::Error::other)? {
			serde_json::Value::Array(items) if result.ok => {
				for item in items {
					writeln!(out, "{item}")?;
				}
			}
			_ => writeln!(out, "{}", serde_json::to_string(result).map_err(io::Error::other)?)?,
		},
		OutputFormat::Toon => {
			let value = serde_json::to_value(result).map_err(io::Error::other)?;
			writeln!(out, "{}", toon::encode(&value, None))?;
		}
	}
	out.flush()
}
