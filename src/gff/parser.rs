//! GFF3/GTF line and attribute parser.

use crate::error::Error;
use crate::strand::Strand;

/// Result of parsing a single GFF line.
#[derive(Debug)]
pub enum ParsedLine {
    Record(Box<GffRecord>),
    /// Blank lines and `#` comments or directives.
    Comment,
}

/// One data line, with coordinates as written in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GffRecord {
    pub seqid: String,
    pub source: String,
    pub feature_type: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub attributes: AttributeTable,
    /// Attribute pairs that had neither an `=` nor a GTF `key "value"` form.
    pub malformed_attributes: Vec<String>,
}

/// Column 9 attributes. Keys keep the order they were first seen in and each
/// key keeps all of its values in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeTable {
    entries: Vec<(String, Vec<String>)>,
}

impl AttributeTable {
    pub fn insert(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value.to_string()),
            None => self
                .entries
                .push((key.to_string(), vec![value.to_string()])),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    /// First value recorded for `key`.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a single GFF3 or GTF line.
///
/// An `Err` means the line must be skipped; the error is the warning to report.
pub fn parse_line(line: &str) -> Result<ParsedLine, Error> {
    if line.trim().is_empty() || line.starts_with('#') {
        return Ok(ParsedLine::Comment);
    }

    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() < 7 {
        return Err(Error::Parse(format!("Not enough data from line '{line}'")));
    }

    let (Ok(start), Ok(end)) = (columns[3].parse::<i64>(), columns[4].parse::<i64>()) else {
        return Err(Error::Parse(format!(
            "Location {}-{} was not an integer",
            columns[3], columns[4]
        )));
    };
    let (start, end) = if end < start { (end, start) } else { (start, end) };

    let (attributes, malformed_attributes) = match columns.get(8).map(|c| c.trim()) {
        Some(column) if !column.is_empty() => parse_attributes(column),
        _ => (AttributeTable::default(), Vec::new()),
    };

    Ok(ParsedLine::Record(Box::new(GffRecord {
        seqid: columns[0].to_string(),
        source: columns[1].to_string(),
        feature_type: columns[2].to_string(),
        start,
        end,
        strand: Strand::from_gff(columns[6]),
        attributes,
        malformed_attributes,
    })))
}

/// Parse column 9: `key=value` pairs (GFF3) or `key "value"` pairs (GTF)
/// separated by `;`. Returns the table and the pairs that could not be split.
pub fn parse_attributes(column: &str) -> (AttributeTable, Vec<String>) {
    let mut table = AttributeTable::default();
    let mut malformed = Vec::new();

    for pair in column.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        if let Some((key, value)) = pair.split_once('=') {
            table.insert(key, value);
        } else if let Some((key, value)) = pair.split_once(" \"") {
            table.insert(key, value.strip_suffix('"').unwrap_or(value));
        } else {
            malformed.push(pair.to_string());
        }
    }

    (table, malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: &str) -> GffRecord {
        match parse_line(line).unwrap() {
            ParsedLine::Record(record) => *record,
            ParsedLine::Comment => panic!("expected a record"),
        }
    }

    #[test]
    fn parse_gff3_line() {
        let record = record("chr1\tsrc\tmRNA\t100\t200\t.\t+\t.\tID=m1;Parent=g1");
        assert_eq!(record.seqid, "chr1");
        assert_eq!(record.feature_type, "mRNA");
        assert_eq!((record.start, record.end), (100, 200));
        assert_eq!(record.strand, Strand::Forward);
        assert_eq!(record.attributes.first("ID"), Some("m1"));
        assert_eq!(record.attributes.first("Parent"), Some("g1"));
    }

    #[test]
    fn parse_gtf_attributes() {
        let (table, malformed) =
            parse_attributes("gene_id \"ENSG1\"; transcript_id \"ENST1\"; tag \"basic\"; tag \"CCDS\";");
        assert!(malformed.is_empty());
        assert_eq!(table.first("transcript_id"), Some("ENST1"));
        assert_eq!(table.get("tag").unwrap(), &["basic".to_string(), "CCDS".to_string()]);
        let keys: Vec<&str> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["gene_id", "transcript_id", "tag"]);
    }

    #[test]
    fn swapped_coordinates() {
        let record = record("1\tsrc\tgene\t500\t100\t.\t-\t.");
        assert_eq!((record.start, record.end), (100, 500));
        assert_eq!(record.strand, Strand::Reverse);
        assert!(record.attributes.is_empty());
    }

    #[test]
    fn comments_and_blank_lines() {
        assert!(matches!(parse_line("##gff-version 3"), Ok(ParsedLine::Comment)));
        assert!(matches!(parse_line("   "), Ok(ParsedLine::Comment)));
    }

    #[test]
    fn too_few_columns() {
        assert!(parse_line("chr1\t100\t200").is_err());
    }

    #[test]
    fn non_integer_coordinates() {
        assert!(parse_line("chr1\tsrc\tgene\tabc\t200\t.\t+\t.\tID=g1").is_err());
    }

    #[test]
    fn attribute_without_delimiter() {
        let record = record("1\tsrc\tgene\t1\t5\t.\t.\t.\tID=g1;orphan");
        assert_eq!(record.malformed_attributes, vec!["orphan".to_string()]);
        assert_eq!(record.attributes.first("ID"), Some("g1"));
    }
}
