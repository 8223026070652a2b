use clap::ValueEnum;

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Column-aligned tables and plain messages (default)
	#[default]
	Text,
	/// Pretty-printed JSON envelope
	Json,
	/// One JSON record per line
	Ndjson,
	/// TOON envelope
	Toon,
}

impl OutputFormat {
	pub fn is_structured(self) -> bool {
		self != Self::Text
	}
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Ndjson => write!(f, "ndjson"),
			OutputFormat::Toon => write!(f, "toon"),
		}
	}
}
