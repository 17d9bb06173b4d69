//! Flat record table format.
//!
//! - Line 1: header `id,name,height,weight,flat_abilities`
//! - One comma-separated row per creature, numeric fields as decimal integers
//! - Ability references joined by `|` inside the last field
//!
//! Field counts are checked when the table is loaded; numeric fields are only
//! parsed per row, by the segment task that owns the row.

use dexrefresh_shared::{ABILITY_DELIMITER, Creature, DexError, RECORD_HEADER, Result};

const FIELD_DELIMITER: char = ',';

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One unparsed data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based line number in the source file, for error messages.
    pub line: usize,
    pub fields: Vec<String>,
}

/// A loaded table: the header has been validated and dropped.
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    pub rows: Vec<RawRecord>,
}

impl RecordTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Split the file content into a header-checked table of raw rows.
pub fn parse_table(content: &str) -> Result<RecordTable> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        return Ok(RecordTable::default());
    };

    let header: Vec<&str> = header.split(FIELD_DELIMITER).map(str::trim).collect();
    if header != RECORD_HEADER {
        return Err(DexError::validation(format!(
            "unexpected header {header:?}, expected {RECORD_HEADER:?}"
        )));
    }

    let mut rows = Vec::new();
    for (idx, line) in lines {
        let fields: Vec<String> = line
            .split(FIELD_DELIMITER)
            .map(|f| f.trim().to_string())
            .collect();
        if fields.len() != RECORD_HEADER.len() {
            return Err(DexError::parse(format!(
                "line {}: expected {} fields, found {}",
                idx + 1,
                RECORD_HEADER.len(),
                fields.len()
            )));
        }
        rows.push(RawRecord {
            line: idx + 1,
            fields,
        });
    }

    Ok(RecordTable { rows })
}

/// Parse one raw row into a creature with an empty effect list.
pub fn parse_creature(record: &RawRecord) -> Result<Creature> {
    let [id, name, height, weight, flat_abilities] = record.fields.as_slice() else {
        return Err(DexError::parse(format!(
            "line {}: expected {} fields, found {}",
            record.line,
            RECORD_HEADER.len(),
            record.fields.len()
        )));
    };

    Ok(Creature {
        id: parse_number(record.line, "id", id)?,
        name: name.clone(),
        height: parse_number(record.line, "height", height)?,
        weight: parse_number(record.line, "weight", weight)?,
        flat_abilities: flat_abilities.clone(),
        effect_entries: Vec::new(),
    })
}

fn parse_number(line: usize, field: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|e| DexError::parse(format!("line {line}: {field} {value:?} is not a number: {e}")))
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Render creatures as a table, header first. Effect lists are not persisted.
pub fn format_table(creatures: &[Creature]) -> Result<String> {
    let mut out = RECORD_HEADER.join(",");
    out.push('\n');

    for c in creatures {
        for (field, value) in [("name", &c.name), ("flat_abilities", &c.flat_abilities)] {
            if value.contains(FIELD_DELIMITER) || value.contains('\n') {
                return Err(DexError::validation(format!(
                    "creature {}: {field} {value:?} cannot contain ',' or a newline",
                    c.id
                )));
            }
        }
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            c.id, c.name, c.height, c.weight, c.flat_abilities
        ));
    }

    Ok(out)
}

/// Join ability references the way they are stored in `flat_abilities`.
pub fn join_abilities<'a>(refs: impl IntoIterator<Item = &'a str>) -> String {
    refs.into_iter()
        .collect::<Vec<_>>()
        .join(&ABILITY_DELIMITER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "id,name,height,weight,flat_abilities
1,bulbasaur,7,69,https://pokeapi.co/api/v2/ability/65/|https://pokeapi.co/api/v2/ability/34/
4,charmander,6,85,https://pokeapi.co/api/v2/ability/66/
";

    #[test]
    fn parse_sample_table() {
        let table = parse_table(SAMPLE).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].line, 2);

        let c = parse_creature(&table.rows[0]).unwrap();
        assert_eq!(c.id, 1);
        assert_eq!(c.name, "bulbasaur");
        assert_eq!(c.height, 7);
        assert_eq!(c.weight, 69);
        assert_eq!(c.ability_refs().count(), 2);
        assert!(c.effect_entries.is_empty());
    }

    #[test]
    fn empty_content_is_empty_table() {
        assert!(parse_table("").unwrap().is_empty());
        assert!(parse_table("id,name,height,weight,flat_abilities\n").unwrap().is_empty());
    }

    #[test]
    fn blank_lines_are_skipped() {
        let content = "id,name,height,weight,flat_abilities\n\n7,squirtle,5,90,\n\n";
        let table = parse_table(content).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].line, 3);
    }

    #[test]
    fn wrong_header_rejected() {
        let err = parse_table("id,name,weight\n1,a,2\n").unwrap_err();
        assert!(matches!(err, DexError::Validation { .. }));
    }

    #[test]
    fn wrong_field_count_rejected_at_load() {
        let content = "id,name,height,weight,flat_abilities\n1,bulbasaur,7\n";
        let err = parse_table(content).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn non_numeric_field_fails_row_parse() {
        let content = "id,name,height,weight,flat_abilities\n1,bulbasaur,tall,69,\n";
        let table = parse_table(content).unwrap();
        let err = parse_creature(&table.rows[0]).unwrap_err();
        assert!(matches!(err, DexError::Parse { .. }));
        assert!(err.to_string().contains("height"));
    }

    #[test]
    fn format_then_parse_keeps_fields() {
        let creatures = vec![Creature {
            id: 25,
            name: "pikachu".into(),
            height: 4,
            weight: 60,
            flat_abilities: join_abilities(["https://a/9/", "https://a/31/"]),
            effect_entries: vec!["dropped on write".into()],
        }];
        let text = format_table(&creatures).unwrap();
        assert!(text.starts_with("id,name,height,weight,flat_abilities\n"));

        let table = parse_table(&text).unwrap();
        let back = parse_creature(&table.rows[0]).unwrap();
        assert_eq!(back.id, 25);
        assert_eq!(back.flat_abilities, "https://a/9/|https://a/31/");
        assert!(back.effect_entries.is_empty());
    }

    #[test]
    fn format_rejects_embedded_delimiter() {
        let creatures = vec![Creature {
            id: 1,
            name: "mr,mime".into(),
            height: 1,
            weight: 1,
            flat_abilities: String::new(),
            effect_entries: Vec::new(),
        }];
        assert!(format_table(&creatures).is_err());
    }
}
