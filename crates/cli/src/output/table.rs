/// Left-aligned text table with one space between columns.
#[derive(Debug, Clone, Default)]
pub struct Table {
	headers: Vec<String>,
	rows: Vec<Vec<String>>,
}

impl Table {
	pub fn new<I, S>(headers: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			headers: headers.into_iter().map(Into::into).collect(),
			rows: Vec::new(),
		}
	}

	pub fn push(&mut self, row: Vec<String>) {
		self.rows.push(row);
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	pub fn render(&self) -> String {
		let columns = self.headers.len();
		let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
		for row in &self.rows {
			for (i, cell) in row.iter().take(columns).enumerate() {
				widths[i] = widths[i].max(cell.chars().count());
			}
		}

		let mut out = String::new();
		for row in std::iter::once(&self.headers).chain(self.rows.iter()) {
			let mut line = String::new();
			for (i, width) in widths.iter().enumerate() {
				let cell = row.get(i).map(String::as_str).unwrap_or("");
				if i > 0 {
					line.push(' ');
				}
				line.push_str(cell);
				if i + 1 < columns {
					line.extend(std::iter::repeat_n(' ', width - cell.chars().count()));
				}
			}
			out.push_str(line.trim_end());
			out.push('\n');
		}
		out
	}
}
