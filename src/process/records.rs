// src/process/records.rs

use quick_xml::{
    errors::IllFormedError,
    events::{BytesStart, Event},
    Reader,
};

/// One element somewhere below a record, with its own text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Local name, namespace prefix dropped (`wb:value` → `value`).
    pub name: String,
    pub id: Option<String>,
    pub text: String,
}

/// A direct child of the document root and every element nested inside it,
/// flattened in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub id: Option<String>,
    pub fields: Vec<Field>,
}

impl Record {
    /// Text of the first descendant called `name`.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.text.as_str())
    }

    pub fn fields_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields.iter().filter(move |f| f.name == name)
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn id_attr(e: &BytesStart<'_>) -> Result<Option<String>, quick_xml::Error> {
    match e.try_get_attribute("id")? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Read the children of the root element as records.
///
/// Returns `None` when the document has no root element at all.
pub fn read_records(xml: &str) -> Result<Option<Vec<Record>>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);

    let mut records = Vec::new();
    let mut current: Option<Record> = None;
    // indices into `current.fields` of the elements still open
    let mut open: Vec<usize> = Vec::new();
    let mut names: Vec<String> = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e);
                match names.len() {
                    0 => seen_root = true,
                    1 => {
                        current = Some(Record {
                            name: name.clone(),
                            id: id_attr(&e)?,
                            fields: Vec::new(),
                        })
                    }
                    _ => {
                        if let Some(rec) = current.as_mut() {
                            rec.fields.push(Field {
                                name: name.clone(),
                                id: id_attr(&e)?,
                                text: String::new(),
                            });
                            open.push(rec.fields.len() - 1);
                        }
                    }
                }
                names.push(name);
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                match names.len() {
                    0 => {
                        seen_root = true;
                        break;
                    }
                    1 => records.push(Record {
                        name,
                        id: id_attr(&e)?,
                        fields: Vec::new(),
                    }),
                    _ => {
                        if let Some(rec) = current.as_mut() {
                            rec.fields.push(Field {
                                name,
                                id: id_attr(&e)?,
                                text: String::new(),
                            });
                        }
                    }
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                // indentation between elements; real text is kept verbatim
                if !text.trim().is_empty() {
                    push_text(current.as_mut(), &open, &text);
                }
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c).into_owned();
                push_text(current.as_mut(), &open, &text);
            }
            Event::End(_) => {
                names.pop();
                match names.len() {
                    0 => break,
                    1 => {
                        if let Some(rec) = current.take() {
                            records.push(rec);
                        }
                    }
                    _ => {
                        open.pop();
                    }
                }
            }
            Event::Eof => {
                if let Some(name) = names.pop() {
                    return Err(quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(name)));
                }
                break;
            }
            _ => {}
        }
    }

    Ok(seen_root.then_some(records))
}

fn push_text(current: Option<&mut Record>, open: &[usize], text: &str) {
    if let (Some(rec), Some(&idx)) = (current, open.last()) {
        rec.fields[idx].text.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDICATORS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<wb:indicators page="1" pages="1" per_page="50" total="1" xmlns:wb="http://www.worldbank.org">
  <wb:indicator id="SP.POP.TOTL">
    <wb:name>Population, total</wb:name>
    <wb:source id="2">World Development Indicators</wb:source>
    <wb:sourceNote />
    <wb:topics>
      <wb:topic id="19">Climate Change</wb:topic>
      <wb:topic id="8" />
    </wb:topics>
  </wb:indicator>
</wb:indicators>"#;

    #[test]
    fn flattens_nested_fields_with_ids() {
        let records = read_records(INDICATORS).unwrap().unwrap();
        assert_eq!(records.len(), 1);

        let rec = &records[0];
        assert_eq!(rec.name, "indicator");
        assert_eq!(rec.id.as_deref(), Some("SP.POP.TOTL"));
        assert_eq!(rec.text("name"), Some("Population, total"));
        assert_eq!(rec.text("sourceNote"), Some(""));

        let topics: Vec<_> = rec
            .fields_named("topic")
            .map(|f| (f.id.as_deref(), f.text.as_str()))
            .collect();
        assert_eq!(topics, vec![(Some("19"), "Climate Change"), (Some("8"), "")]);
    }

    #[test]
    fn entities_are_unescaped_without_trimming() {
        let xml = "<root><c><name>Latin America &amp; Caribbean </name></c></root>";
        let records = read_records(xml).unwrap().unwrap();
        assert_eq!(records[0].text("name"), Some("Latin America & Caribbean "));
    }

    #[test]
    fn text_is_kept_verbatim_and_indentation_dropped() {
        let xml = "<root>\n  <rec>\n    <value> 1.5 </value>\n    <topics>\n      <topic>A</topic>\n    </topics>\n  </rec>\n</root>";
        let records = read_records(xml).unwrap().unwrap();
        assert_eq!(records[0].text("value"), Some(" 1.5 "));
        assert_eq!(records[0].text("topics"), Some(""));
        assert_eq!(records[0].text("topic"), Some("A"));
    }

    #[test]
    fn empty_root_has_no_records() {
        let records = read_records(r#"<wb:data total="0" xmlns:wb="x"/>"#).unwrap();
        assert_eq!(records, Some(Vec::new()));
    }

    #[test]
    fn no_root_is_none() {
        assert_eq!(read_records("").unwrap(), None);
    }

    #[test]
    fn unclosed_document_is_an_error() {
        assert!(read_records("<root><rec><a>1</a></rec>").is_err());
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        assert!(read_records("<root><rec></root>").is_err());
    }
}
