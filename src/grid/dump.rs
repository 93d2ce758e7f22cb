//! Fixed-width text dumps of a grid, halo included, for per-rank debug logs.

use std::fmt;
use std::io::{self, Write};

use super::Grid;

impl Grid {
    /// Write the full padded buffer, one padded row per line.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "grid {}x{} padding={} ({}x{} padded)",
            self.width(),
            self.height(),
            self.padding(),
            self.padded_width(),
            self.padded_height()
        )?;
        for row in self.as_slice().chunks(self.padded_width()) {
            for v in row {
                write!(out, "{v:10.3} ")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.dump(&mut buf).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_has_header_and_padded_rows() {
        let g = Grid::from_fn(2, 1, |x, _| x as f64).unwrap().pad(1).unwrap();
        let text = g.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "grid 2x1 padding=1 (4x3 padded)");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2].split_whitespace().collect::<Vec<_>>(), ["0.000", "0.000", "1.000", "0.000"]);
    }
}
