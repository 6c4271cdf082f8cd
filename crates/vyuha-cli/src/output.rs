use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Column-aligned plain-text table. Cells beyond the header count are dropped.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    println!("{}", render_row(&widths, headers));
    println!(
        "{}",
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("  ")
    );
    for row in &rows {
        println!("{}", render_row(&widths, row.as_slice()));
    }
}

fn render_row<S: AsRef<str>>(widths: &[usize], cells: &[S]) -> String {
    widths
        .iter()
        .zip(cells)
        .map(|(&w, cell)| format!("{:<w$}", cell.as_ref()))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Fixed-precision number for table cells.
pub fn num(v: f64) -> String {
    format!("{v:.2}")
}
