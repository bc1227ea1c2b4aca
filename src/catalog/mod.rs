// src/catalog/mod.rs

//! Read-only reference tables: topics, the indicators filed under each topic,
//! and countries. Loaded once from the files the `update` command downloads.

use std::{fs, path::Path};
use tracing::info;

use crate::{
    error::CatalogError,
    process::records::{read_records, Record},
};

pub mod request;

pub use request::{refresh_requests, ReportKind, Selection};

pub const TOPICS_FILE: &str = "topics.xml";
pub const INDICATORS_FILE: &str = "indicator.xml";
pub const COUNTRIES_FILE: &str = "countries.xml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: String,
    pub name: String,
    /// Indexes into [`Catalog::indicators`].
    pub indicators: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    pub iso2: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    topics: Vec<Topic>,
    indicators: Vec<Indicator>,
    countries: Vec<Country>,
}

fn load_records(path: &Path) -> Result<Vec<Record>, CatalogError> {
    let xml = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_records(&xml)
        .map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| CatalogError::Structure {
            path: path.to_path_buf(),
            reason: "no root element".to_string(),
        })
}

fn required<'a>(path: &Path, value: Option<&'a str>, what: &str) -> Result<&'a str, CatalogError> {
    value.ok_or_else(|| CatalogError::Structure {
        path: path.to_path_buf(),
        reason: format!("entry without {what}"),
    })
}

impl Catalog {
    /// Load the three reference files from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let mut catalog = Catalog::default();

        let path = dir.join(TOPICS_FILE);
        for rec in load_records(&path)? {
            catalog.topics.push(Topic {
                id: required(&path, rec.id.as_deref(), "id")?.to_string(),
                name: required(&path, rec.text("value"), "value")?.to_string(),
                indicators: Vec::new(),
            });
        }

        let path = dir.join(INDICATORS_FILE);
        for rec in load_records(&path)? {
            let indicator = Indicator {
                id: required(&path, rec.id.as_deref(), "id")?.to_string(),
                name: required(&path, rec.text("name"), "name")?.to_string(),
            };
            let index = catalog.indicators.len();
            for topic_ref in rec.fields_named("topic") {
                let topic_id = required(&path, topic_ref.id.as_deref(), "topic id")?;
                let topic = catalog
                    .topics
                    .iter_mut()
                    .find(|t| t.id == topic_id)
                    .ok_or_else(|| CatalogError::UnknownTopicRef {
                        indicator: indicator.id.clone(),
                        topic: topic_id.to_string(),
                    })?;
                topic.indicators.push(index);
            }
            catalog.indicators.push(indicator);
        }

        let path = dir.join(COUNTRIES_FILE);
        for rec in load_records(&path)? {
            catalog.countries.push(Country {
                iso2: required(&path, rec.text("iso2Code"), "iso2Code")?.to_string(),
                name: required(&path, rec.text("name"), "name")?.to_string(),
            });
        }

        info!(
            topics = catalog.topics.len(),
            indicators = catalog.indicators.len(),
            countries = catalog.countries.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn topic(&self, name: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.name == name)
    }

    /// Indicators filed under the topic called `topic`, in file order.
    pub fn indicators_for(&self, topic: &str) -> Vec<&Indicator> {
        self.topic(topic)
            .map(|t| t.indicators.iter().map(|&i| &self.indicators[i]).collect())
            .unwrap_or_default()
    }

    /// Look a country up by ISO-2 code, ignoring case.
    pub fn country(&self, iso2: &str) -> Option<&Country> {
        self.countries
            .iter()
            .find(|c| c.iso2.eq_ignore_ascii_case(iso2))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) const TOPICS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<wb:topics xmlns:wb="http://www.worldbank.org">
  <wb:topic id="1"><wb:value>Agriculture &amp; Rural Development</wb:value><wb:sourceNote>Food.</wb:sourceNote></wb:topic>
  <wb:topic id="8"><wb:value>Health</wb:value><wb:sourceNote /></wb:topic>
  <wb:topic id="19"><wb:value>Climate Change</wb:value><wb:sourceNote /></wb:topic>
</wb:topics>"#;

    pub(crate) const INDICATORS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<wb:indicators xmlns:wb="http://www.worldbank.org">
  <wb:indicator id="SP.POP.TOTL">
    <wb:name>Population, total</wb:name>
    <wb:source id="2">World Development Indicators</wb:source>
    <wb:topics><wb:topic id="19">Climate Change</wb:topic><wb:topic id="8">Health</wb:topic></wb:topics>
  </wb:indicator>
  <wb:indicator id="AG.LND.ARBL.ZS">
    <wb:name>Arable land (% of land area)</wb:name>
    <wb:topics><wb:topic id="1">Agriculture &amp; Rural Development</wb:topic></wb:topics>
  </wb:indicator>
</wb:indicators>"#;

    pub(crate) const COUNTRIES: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<wb:countries xmlns:wb="http://www.worldbank.org">
  <wb:country id="ABW"><wb:iso2Code>AW</wb:iso2Code><wb:name>Aruba</wb:name><wb:region id="LCN">Latin America &amp; Caribbean </wb:region></wb:country>
  <wb:country id="DEU"><wb:iso2Code>DE</wb:iso2Code><wb:name>Germany</wb:name></wb:country>
  <wb:country id="USA"><wb:iso2Code>US</wb:iso2Code><wb:name>United States</wb:name></wb:country>
</wb:countries>"#;

    pub(crate) fn write_reference(topics: &str, indicators: &str, countries: &str) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TOPICS_FILE), topics).unwrap();
        fs::write(dir.path().join(INDICATORS_FILE), indicators).unwrap();
        fs::write(dir.path().join(COUNTRIES_FILE), countries).unwrap();
        dir
    }

    #[test]
    fn loads_reference_tables() {
        let dir = write_reference(TOPICS, INDICATORS, COUNTRIES);
        let catalog = Catalog::load(dir.path()).unwrap();

        let names: Vec<_> = catalog.topics().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            ["Agriculture & Rural Development", "Health", "Climate Change"]
        );

        let health: Vec<_> = catalog.indicators_for("Health").into_iter().map(|i| i.id.as_str()).collect();
        assert_eq!(health, ["SP.POP.TOTL"]);
        let agri: Vec<_> = catalog
            .indicators_for("Agriculture & Rural Development")
            .into_iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(agri, ["Arable land (% of land area)"]);
        assert!(catalog.indicators_for("Energy").is_empty());

        assert_eq!(catalog.countries().len(), 3);
        assert_eq!(catalog.country("de").map(|c| c.name.as_str()), Some("Germany"));
    }

    #[test]
    fn unknown_topic_reference_fails() {
        let indicators = r#"<wb:indicators xmlns:wb="x">
  <wb:indicator id="X.Y"><wb:name>X</wb:name><wb:topics><wb:topic id="99"/></wb:topics></wb:indicator>
</wb:indicators>"#;
        let dir = write_reference(TOPICS, indicators, COUNTRIES);
        match Catalog::load(dir.path()).unwrap_err() {
            CatalogError::UnknownTopicRef { indicator, topic } => {
                assert_eq!(indicator, "X.Y");
                assert_eq!(topic, "99");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Catalog::load(dir.path()),
            Err(CatalogError::Io { .. })
        ));
    }

    #[test]
    fn corrupt_file_fails() {
        let dir = write_reference(TOPICS, INDICATORS, "<wb:countries><wb:country>");
        assert!(matches!(
            Catalog::load(dir.path()),
            Err(CatalogError::Parse { .. })
        ));
    }

    #[test]
    fn country_without_code_fails() {
        let countries = "<countries><country><name>Nowhere</name></country></countries>";
        let dir = write_reference(TOPICS, INDICATORS, countries);
        assert!(matches!(
            Catalog::load(dir.path()),
            Err(CatalogError::Structure { .. })
        ));
    }
}
