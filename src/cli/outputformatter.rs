use serde_json::Value;

use terminal_size::{terminal_size, Width};

/// Render a list of JSON objects as an ASCII table followed by a one-line summary.
/// Returns false (nothing printed) when rows are empty or output is forced to JSON via
/// `FOLIO_OUTPUT=json`; callers then fall back to JSON.
pub fn print_rows(rows: &[Value], summary: &str) -> bool {
    if std::env::var("FOLIO_OUTPUT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false) {
        return false;
    }
    let Some((cols, cells)) = tabulate(rows) else { return false; };
    for line in render_table(&cols, &cells, terminal_width()) {
        println!("{}", line);
    }
    println!("{}", summary);
    true
}

/// Union of object keys (first-seen order, `id` first) and one cell row per record.
/// Non-object rows map to a single `value` column.
pub fn tabulate(rows: &[Value]) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    if rows.is_empty() { return None; }
    if rows.iter().all(|r| r.is_object()) {
        let mut cols: Vec<String> = Vec::new();
        for r in rows {
            if let Value::Object(map) = r {
                for k in map.keys() {
                    if !cols.contains(k) { cols.push(k.clone()); }
                }
            }
        }
        if let Some(pos) = cols.iter().position(|c| c == "id") {
            let id = cols.remove(pos);
            cols.insert(0, id);
        }
        let cells = rows
            .iter()
            .map(|r| cols.iter().map(|c| r.get(c).map(to_cell_string).unwrap_or_default()).collect())
            .collect();
        Some((cols, cells))
    } else {
        Some((vec!["value".to_string()], rows.iter().map(|r| vec![to_cell_string(r)]).collect()))
    }
}

pub fn render_table(cols: &[String], rows: &[Vec<String>], termw: usize) -> Vec<String> {
    // keep a single wide column from pushing the rest off screen
    let max_col = (termw / cols.len().max(1)).max(8);
    let mut widths: Vec<usize> = cols.iter().map(|c| visible_len(c).min(max_col)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            widths[i] = widths[i].max(visible_len(cell).min(max_col));
        }
    }
    let sep = build_separator(&widths);
    let mut out = vec![sep.clone(), build_row(cols, &widths, false), sep.clone()];
    for r in rows {
        out.push(build_row(r, &widths, true));
    }
    out.push(sep);
    out
}

fn to_cell_string(v: &Value) -> String {
    match v {
        Value::Null => String::from("NULL"),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.iter().all(|i| i.is_string()) => {
            items.iter().filter_map(|i| i.as_str()).collect::<Vec<_>>().join(",")
        }
        other => other.to_string(),
    }
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize], align_numbers: bool) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(|c| c.as_str()).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(visible_len(&text)));
        s.push(' ');
        if align_numbers && is_numeric_like(cell) {
            s.push_str(&pad);
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&pad);
        }
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    !st.is_empty() && st.chars().any(|c| c.is_ascii_digit()) && st.chars().all(|c| c.is_ascii_digit() || ".-+eE,_".contains(c))
}

fn visible_len(s: &str) -> usize { s.chars().count() }

fn terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), _)) if w > 4 => (w - 4) as usize,
        _ => 120,
    }
}
