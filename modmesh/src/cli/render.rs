use owo_colors::Style;

/// Lays two or more multi-line blocks out side by side if `width` has room
/// for all of them plus a one-space gutter between each; returns `None` when
/// the terminal is too narrow, so the caller can fall back to stacking them.
pub(super) fn render_row(width: u16, blocks: &[(String, Option<Style>)], pad_right: bool) -> Option<String> {
    let columns: Vec<Vec<&str>> = blocks.iter().map(|(text, _)| text.lines().collect()).collect();
    let col_widths: Vec<usize> = columns
        .iter()
        .map(|lines| lines.iter().map(|l| l.chars().count()).max().unwrap_or(0))
        .collect();

    let total: usize = col_widths.iter().sum::<usize>() + col_widths.len().saturating_sub(1);
    if total > width as usize {
        return None;
    }

    let row_count = columns.iter().map(|lines| lines.len()).max().unwrap_or(0);
    let mut out = String::new();
    for row in 0..row_count {
        for (i, lines) in columns.iter().enumerate() {
            let line = lines.get(row).copied().unwrap_or("");
            let styled = match &blocks[i].1 {
                Some(style) => style.style(line).to_string(),
                None => line.to_string(),
            };
            if pad_right || i + 1 < columns.len() {
                out.push_str(&styled);
                let pad = col_widths[i].saturating_sub(line.chars().count());
                out.push_str(&" ".repeat(pad + 1));
            } else {
                out.push_str(&styled);
            }
        }
        out.push('\n');
    }
    Some(out)
}
