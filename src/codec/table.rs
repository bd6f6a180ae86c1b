//! codec/table: Table ↔ CSV.
//!
//! Запись: заголовок из имён колонок, далее строки; индекс строк НЕ пишется.
//! Строковые ячейки и имена колонок всегда в кавычках (RFC‑4180, `""` для кавычки).
//! Чтение: ячейка в кавычках → Str; без кавычек тип выводится:
//!   "" → Null, true/false → Bool, i64 → Int, f64 → Float, иначе Str.
//! Формат lossy: индекс строк теряется; для CSV, записанных не нами, типы колонок
//! восстанавливаются только выводом по содержимому.

use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::Path;

use super::{wrong_tag, Codec};
use crate::error::EslError;
use crate::util::read_existing;
use crate::value::{Cell, Table, TypeTag, Value};

pub struct CsvTableCodec;

impl Codec for CsvTableCodec {
    fn tag(&self) -> TypeTag {
        TypeTag::Table
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn encode(&self, value: &Value, path: &Path) -> Result<()> {
        let Value::Table(t) = value else {
            return Err(wrong_tag(self.tag(), value).into());
        };
        fs::write(path, write_csv(t)).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    fn decode(&self, path: &Path) -> Result<Value> {
        let bytes = read_existing(path)?.ok_or_else(|| EslError::NotFound {
            path: path.display().to_string(),
        })?;
        let text = String::from_utf8(bytes).map_err(|e| EslError::corrupt(path, e.to_string()))?;
        let t = read_csv(&text).map_err(|e| EslError::corrupt(path, format!("{e:#}")))?;
        Ok(Value::Table(t))
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn render_cell(c: &Cell) -> String {
    match c {
        Cell::Null => String::new(),
        Cell::Bool(b) => b.to_string(),
        Cell::Int(v) => v.to_string(),
        // Debug у f64 всегда оставляет дробную часть/экспоненту: 1.0, 1e-7
        Cell::Float(v) => format!("{v:?}"),
        Cell::Str(s) => quote(s),
    }
}

pub(crate) fn write_csv(t: &Table) -> String {
    let mut out = String::new();
    if t.num_cols() == 0 {
        return out;
    }
    let header: Vec<String> = t.columns().iter().map(|c| quote(c)).collect();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in t.rows() {
        let cells: Vec<String> = row.iter().map(render_cell).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

struct Field {
    text: String,
    quoted: bool,
}

fn parse_records(text: &str) -> Result<Vec<Vec<Field>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut at_record_start = true;
    let mut line = 1usize;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                if c == '\n' {
                    line += 1;
                }
                field.push(c);
            }
            continue;
        }
        match c {
            '"' if field.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
                at_record_start = false;
            }
            ',' => {
                record.push(Field {
                    text: std::mem::take(&mut field),
                    quoted,
                });
                quoted = false;
                at_record_start = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(Field {
                    text: std::mem::take(&mut field),
                    quoted,
                });
                records.push(std::mem::take(&mut record));
                quoted = false;
                at_record_start = true;
                line += 1;
            }
            _ if quoted => bail!("line {line}: data after closing quote"),
            '"' => bail!("line {line}: stray quote"),
            _ => {
                field.push(c);
                at_record_start = false;
            }
        }
    }
    if in_quotes {
        bail!("line {line}: unterminated quoted field");
    }
    if !at_record_start {
        record.push(Field { text: field, quoted });
        records.push(record);
    }
    Ok(records)
}

fn infer_cell(f: Field) -> Cell {
    if f.quoted {
        return Cell::Str(f.text);
    }
    let s = f.text.as_str();
    if s.is_empty() {
        return Cell::Null;
    }
    match s {
        "true" => return Cell::Bool(true),
        "false" => return Cell::Bool(false),
        _ => {}
    }
    if let Ok(v) = s.parse::<i64>() {
        return Cell::Int(v);
    }
    if let Ok(v) = s.parse::<f64>() {
        return Cell::Float(v);
    }
    Cell::Str(f.text)
}

pub(crate) fn read_csv(text: &str) -> Result<Table> {
    let mut records = parse_records(text)?.into_iter();
    let Some(header) = records.next() else {
        return Ok(Table::new(Vec::<String>::new()));
    };
    let columns: Vec<String> = header.into_iter().map(|f| f.text).collect();
    let ncols = columns.len();
    let mut t = Table::new(columns);
    for (i, rec) in records.enumerate() {
        if rec.len() != ncols {
            return Err(anyhow!(
                "row {} has {} fields, header has {}",
                i + 1,
                rec.len(),
                ncols
            ));
        }
        t.push_row(rec.into_iter().map(infer_cell).collect())?;
    }
    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            ["c1", "c2", "c3"],
            vec![
                vec![Cell::Int(1), Cell::Int(2), Cell::Int(3)],
                vec!["wy1".into(), "w,h\"y".into(), Cell::Null],
                vec![Cell::Float(1.0), Cell::Bool(true), "12".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn csv_text_roundtrip_keeps_cells() {
        let t = sample();
        let back = read_csv(&write_csv(&t)).unwrap();
        assert!(back.same_content(&t), "got {back:?}");
    }

    #[test]
    fn index_is_not_persisted() {
        let t = sample().with_index(["r1", "r2", "r3"]).unwrap();
        let back = read_csv(&write_csv(&t)).unwrap();
        assert!(back.index().is_none());
        assert!(back.same_content(&t));
        assert_ne!(back, t);
    }

    #[test]
    fn foreign_csv_types_are_inferred() {
        let t = read_csv("a,b\r\n007,x\n1.5,\n").unwrap();
        assert_eq!(t.rows()[0], vec![Cell::Int(7), Cell::Str("x".into())]);
        assert_eq!(t.rows()[1], vec![Cell::Float(1.5), Cell::Null]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert!(read_csv("a,b\n1\n").is_err());
        assert!(read_csv("a\n\"open\n").is_err());
    }
}
