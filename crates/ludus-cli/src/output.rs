//! Output formatting helpers: pretty JSON and aligned text tables.

/// Print a payload as pretty JSON with a trailing newline.
pub fn print_json(payload: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

/// Render rows under a header with columns aligned by a two-space gutter.
pub fn render_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let columns = header.len();
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(columns) {
            widths[idx] = widths[idx].max(cell.len());
        }
    }

    let mut out = String::new();
    render_row(&mut out, header.iter().map(|h| h.to_string()), &widths);
    for row in rows {
        render_row(&mut out, row.iter().cloned(), &widths);
    }
    out
}

fn render_row(out: &mut String, cells: impl Iterator<Item = String>, widths: &[usize]) {
    let cells: Vec<String> = cells.collect();
    let last = cells.len().saturating_sub(1);
    for (idx, cell) in cells.iter().enumerate() {
        if idx == last {
            out.push_str(cell);
        } else {
            out.push_str(&format!("{:<width$}  ", cell, width = widths[idx]));
        }
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_aligns_columns() {
        let table = render_table(
            &["ID", "Score"],
            &[
                vec!["art_0a1b2c3d".to_string(), "7".to_string()],
                vec!["art_ff".to_string(), "-".to_string()],
            ],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert_eq!(
            lines[0].find("Score"),
            lines[1].find('7'),
            "score column must align"
        );
    }

    #[test]
    fn test_header_only_table() {
        let table = render_table(&["ID", "MODE"], &[]);
        assert_eq!(table, "ID  MODE\n");
    }
}
