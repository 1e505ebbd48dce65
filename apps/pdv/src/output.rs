//! Text output: Brazilian dates and fixed-width tables.

use chrono::{DateTime, Local, NaiveDate, Utc};

pub fn date(day: NaiveDate) -> String {
    day.format("%d/%m/%Y").to_string()
}

/// Local date and time, `dd/mm/aaaa hh:mm`.
pub fn datetime(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "sim"
    } else {
        "não"
    }
}

pub fn opt(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Column-aligned table. Widths follow the widest cell.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<(String, Align)>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[(&str, Align)]) -> Self {
        Table {
            headers: headers.iter().map(|(h, a)| (h.to_string(), *a)).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row<I, S>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|(h, _)| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let line = |cells: &[String]| -> String {
            let parts: Vec<String> = self
                .headers
                .iter()
                .enumerate()
                .map(|(i, (_, align))| {
                    let cell = cells.get(i).map(String::as_str).unwrap_or("");
                    let pad = widths[i].saturating_sub(cell.chars().count());
                    match align {
                        Align::Left => format!("{}{}", cell, " ".repeat(pad)),
                        Align::Right => format!("{}{}", " ".repeat(pad), cell),
                    }
                })
                .collect();
            parts.join("  ").trim_end().to_string()
        };

        let headers: Vec<String> = self.headers.iter().map(|(h, _)| h.clone()).collect();
        let mut out = vec![line(&headers)];
        out.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("  "),
        );
        for row in &self.rows {
            out.push(line(row));
        }
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_format() {
        assert_eq!(date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()), "05/01/2024");
    }

    #[test]
    fn test_table_alignment() {
        let mut t = Table::new(&[("Código", Align::Left), ("Preço", Align::Right)]);
        t.row(["ARROZ-5KG", "R$ 25,90"]).row(["SAL", "R$ 3,50"]);
        let text = t.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("Código{}Preço", " ".repeat(8)));
        assert_eq!(lines[1], "---------  --------");
        assert_eq!(lines[2], "ARROZ-5KG  R$ 25,90");
        assert_eq!(lines[3], format!("SAL{}R$ 3,50", " ".repeat(9)));
    }
}
