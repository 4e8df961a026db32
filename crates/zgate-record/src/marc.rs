//! MARC21 assembly and ISO 2709 serialization.
//!
//! Records are either re-parsed wholesale from MARC-XML (the `full` field
//! spec) or assembled field-by-field from xpath hits per the database's
//! field-mapping rules, then written out as binary ISO 2709.

use bytes::{BufMut, BytesMut};
use roxmltree::Document;

use zgate_core::config::FieldSpec;
use zgate_core::diag::{bib1, Diagnostic};

use crate::xml;

const FIELD_TERMINATOR: u8 = 0x1e;
const RECORD_TERMINATOR: u8 = 0x1d;
const SUBFIELD_DELIMITER: u8 = 0x1f;
const LEADER_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    pub code: char,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarcField {
    Control {
        tag: String,
        data: String,
    },
    Data {
        tag: String,
        ind1: char,
        ind2: char,
        subfields: Vec<Subfield>,
    },
}

/// An in-memory MARC21 record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarcRecord {
    pub leader: String,
    pub fields: Vec<MarcField>,
}

impl Default for MarcRecord {
    fn default() -> Self {
        Self {
            leader: " ".repeat(LEADER_LEN),
            fields: Vec::new(),
        }
    }
}

impl MarcRecord {
    /// Parse a MARC-XML document (`record` element with `leader`,
    /// `controlfield` and `datafield` children; the MARC21-slim namespace
    /// is accepted but not required).
    pub fn from_marcxml(text: &str) -> Result<Self, Diagnostic> {
        let doc = Document::parse(text).map_err(|e| {
            Diagnostic::new(bib1::UNSPECIFIED_ERROR, format!("bad MARC-XML: {}", e))
        })?;
        Self::from_doc(&doc)
    }

    /// Extract the record from an already parsed document.
    pub fn from_doc(doc: &Document) -> Result<Self, Diagnostic> {
        let record_el = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "record")
            .ok_or_else(|| {
                Diagnostic::new(bib1::UNSPECIFIED_ERROR, "MARC-XML has no record element")
            })?;

        let mut record = MarcRecord::default();
        for child in record_el.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "leader" => record.leader = xml::text_value(child),
                "controlfield" => record.fields.push(MarcField::Control {
                    tag: child.attribute("tag").unwrap_or_default().to_string(),
                    data: xml::text_value(child),
                }),
                "datafield" => {
                    let subfields = child
                        .children()
                        .filter(|n| n.is_element() && n.tag_name().name() == "subfield")
                        .map(|sf| Subfield {
                            code: sf
                                .attribute("code")
                                .and_then(|c| c.chars().next())
                                .unwrap_or(' '),
                            value: xml::text_value(sf),
                        })
                        .collect();
                    record.fields.push(MarcField::Data {
                        tag: child.attribute("tag").unwrap_or_default().to_string(),
                        ind1: indicator(child.attribute("ind1")),
                        ind2: indicator(child.attribute("ind2")),
                        subfields,
                    });
                }
                _ => {}
            }
        }
        Ok(record)
    }

    /// Add subfield `q` to every 952 holdings field that lacks one, so
    /// clients that expect an explicit availability marker always see it.
    pub fn patch_explicit_availability(&mut self) {
        for field in &mut self.fields {
            if let MarcField::Data { tag, subfields, .. } = field {
                if tag == "952" && !subfields.iter().any(|sf| sf.code == 'q') {
                    subfields.push(Subfield {
                        code: 'q',
                        value: "0".to_string(),
                    });
                }
            }
        }
    }

    /// Serialize as binary ISO 2709.
    pub fn to_iso2709(&self) -> Vec<u8> {
        let mut directory = BytesMut::new();
        let mut data = BytesMut::new();

        for field in &self.fields {
            let start = data.len();
            let tag = match field {
                MarcField::Control { tag, data: content } => {
                    data.put_slice(content.as_bytes());
                    data.put_u8(FIELD_TERMINATOR);
                    tag
                }
                MarcField::Data {
                    tag,
                    ind1,
                    ind2,
                    subfields,
                } => {
                    let mut buf = [0u8; 4];
                    data.put_slice(ind1.encode_utf8(&mut buf).as_bytes());
                    data.put_slice(ind2.encode_utf8(&mut buf).as_bytes());
                    for sf in subfields {
                        data.put_u8(SUBFIELD_DELIMITER);
                        data.put_slice(sf.code.encode_utf8(&mut buf).as_bytes());
                        data.put_slice(sf.value.as_bytes());
                    }
                    data.put_u8(FIELD_TERMINATOR);
                    tag
                }
            };
            let length = data.len() - start;
            directory.put_slice(format!("{:0>3.3}", tag).as_bytes());
            directory.put_slice(format!("{:04}", length).as_bytes());
            directory.put_slice(format!("{:05}", start).as_bytes());
        }

        let base_address = LEADER_LEN + directory.len() + 1;
        let record_length = base_address + data.len() + 1;

        let mut leader: Vec<u8> = self
            .leader
            .bytes()
            .chain(std::iter::repeat(b' '))
            .take(LEADER_LEN)
            .collect();
        leader[0..5].copy_from_slice(format!("{:05}", record_length).as_bytes());
        leader[10] = b'2';
        leader[11] = b'2';
        leader[12..17].copy_from_slice(format!("{:05}", base_address).as_bytes());
        leader[20..24].copy_from_slice(b"4500");

        let mut out = BytesMut::with_capacity(record_length);
        out.put_slice(&leader);
        out.put_slice(&directory);
        out.put_u8(FIELD_TERMINATOR);
        out.put_slice(&data);
        out.put_u8(RECORD_TERMINATOR);
        out.to_vec()
    }
}

fn indicator(attr: Option<&str>) -> char {
    attr.and_then(|a| a.chars().next()).unwrap_or(' ')
}

/// `tag[/i1[/i2]][$subtag]` as written in field-spec `content` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ContentSpec {
    tag: String,
    ind1: char,
    ind2: char,
    subfield: char,
}

fn parse_content(content: &str) -> ContentSpec {
    let (main, subfield) = match content.split_once('$') {
        Some((main, sub)) => (main, sub.chars().next().unwrap_or('a')),
        None => (content, 'a'),
    };
    let mut parts = main.split('/');
    let tag = parts.next().unwrap_or_default().to_string();
    let ind1 = parts.next().and_then(|p| p.chars().next()).unwrap_or(' ');
    let ind2 = parts.next().and_then(|p| p.chars().next()).unwrap_or(' ');
    ContentSpec {
        tag,
        ind1,
        ind2,
        subfield,
    }
}

/// Build a MARC21 record from the field-mapping rules and serialize it.
///
/// A `full` content spec short-circuits: the entry's xpath value (or the
/// whole document when the xpath is empty) is re-parsed as MARC-XML and
/// emitted verbatim. Otherwise each xpath hit lands under its configured
/// tag; values group into the most recent field with the same tag unless
/// that field already carries the subfield code.
pub fn to_marc21(
    doc: &Document,
    specs: &[FieldSpec],
    patch_availability: bool,
) -> Result<Vec<u8>, Diagnostic> {
    let mut record = MarcRecord::default();

    for spec in specs {
        if spec.content == "full" {
            let mut full = if spec.xpath.is_empty() {
                MarcRecord::from_doc(doc)?
            } else {
                MarcRecord::from_marcxml(&xml::find_value(doc, &spec.xpath))?
            };
            if patch_availability {
                full.patch_explicit_availability();
            }
            return Ok(full.to_iso2709());
        }

        let raw = xml::find_value(doc, &spec.xpath);
        let value = raw.trim_matches(['\n', '\r']);
        if value.is_empty() {
            continue;
        }

        let content = parse_content(&spec.content);
        if content.tag.starts_with("00") {
            record.fields.push(MarcField::Control {
                tag: content.tag,
                data: value.to_string(),
            });
            continue;
        }

        let existing = record.fields.iter_mut().rev().find_map(|f| match f {
            MarcField::Data { tag, subfields, .. } if *tag == content.tag => Some(subfields),
            _ => None,
        });
        match existing {
            Some(subfields) if !subfields.iter().any(|sf| sf.code == content.subfield) => {
                subfields.push(Subfield {
                    code: content.subfield,
                    value: value.to_string(),
                });
            }
            _ => record.fields.push(MarcField::Data {
                tag: content.tag,
                ind1: content.ind1,
                ind2: content.ind2,
                subfields: vec![Subfield {
                    code: content.subfield,
                    value: value.to_string(),
                }],
            }),
        }
    }

    if patch_availability {
        record.patch_explicit_availability();
    }
    Ok(record.to_iso2709())
}

/// Straight MARC-XML to ISO 2709, for schema-based retrieval.
pub fn marcxml_to_marc21(text: &str) -> Result<Vec<u8>, Diagnostic> {
    Ok(MarcRecord::from_marcxml(text)?.to_iso2709())
}
