// src/catalog/request.rs

use chrono::{Datelike, Utc};
use std::path::PathBuf;
use url::Url;

use super::{Catalog, COUNTRIES_FILE, INDICATORS_FILE, TOPICS_FILE};
use crate::{config::Settings, error::CatalogError, fetch::DownloadRequest, process};

/// What the user wants on disk at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportKind {
    /// Staged XML, turned into a `;`-separated report once downloaded.
    #[default]
    Report,
    /// The API's XML, kept as is.
    RawXml,
}

impl ReportKind {
    pub fn extension(self) -> &'static str {
        match self {
            ReportKind::Report => process::STAGING_EXTENSION,
            ReportKind::RawXml => "xml",
        }
    }
}

/// A user's pick from the catalog.
#[derive(Debug, Clone)]
pub struct Selection {
    pub topic: String,
    pub indicator: String,
    /// ISO-2 country codes.
    pub countries: Vec<String>,
    pub from: i32,
    pub till: i32,
    pub kind: ReportKind,
    pub out_dir: PathBuf,
}

fn invalid(msg: impl Into<String>) -> CatalogError {
    CatalogError::Selection(msg.into())
}

impl Catalog {
    /// Validate `sel` and turn it into a download of the matching data.
    pub fn request(
        &self,
        settings: &Settings,
        sel: &Selection,
    ) -> Result<DownloadRequest, CatalogError> {
        let nonce = Utc::now().timestamp_micros();
        self.request_with_nonce(settings, sel, nonce)
    }

    fn request_with_nonce(
        &self,
        settings: &Settings,
        sel: &Selection,
        nonce: i64,
    ) -> Result<DownloadRequest, CatalogError> {
        if self.topic(&sel.topic).is_none() {
            return Err(invalid(format!("unknown topic {:?}", sel.topic)));
        }
        let indicator = self
            .indicators_for(&sel.topic)
            .into_iter()
            .find(|i| i.name == sel.indicator || i.id == sel.indicator)
            .ok_or_else(|| {
                invalid(format!(
                    "indicator {:?} is not filed under {:?}",
                    sel.indicator, sel.topic
                ))
            })?;

        if sel.countries.is_empty() {
            return Err(invalid("no country selected"));
        }
        let mut codes = Vec::with_capacity(sel.countries.len());
        for code in &sel.countries {
            let country = self
                .country(code)
                .ok_or_else(|| invalid(format!("unknown country code {code:?}")))?;
            codes.push(country.iso2.as_str());
        }

        if !sel.out_dir.is_dir() {
            return Err(invalid(format!(
                "output folder {} does not exist",
                sel.out_dir.display()
            )));
        }

        let (from, till) = if sel.till < sel.from {
            (sel.till, sel.from)
        } else {
            (sel.from, sel.till)
        };
        let this_year = Utc::now().year();
        if till > this_year {
            return Err(invalid(format!("{till} lies in the future")));
        }

        let mut url = Url::parse(&format!(
            "{}/countries/{}/indicators/{}",
            settings.api_base(),
            codes.join(";"),
            indicator.id
        ))?;
        url.set_query(Some(&format!(
            "format=xml&per_page={}&date={from}:{till}",
            settings.per_page
        )));

        let file_name = format!(
            "{}_{from}_{till}_{nonce}.{}",
            indicator.id.replace('.', "_"),
            sel.kind.extension()
        );

        Ok(DownloadRequest::new(url, sel.out_dir.join(file_name)))
    }
}

/// Downloads that replace the reference files in `settings.config_dir`.
pub fn refresh_requests(settings: &Settings) -> Result<Vec<DownloadRequest>, CatalogError> {
    let base = settings.api_base();
    let per_page = settings.per_page;
    let dir = &settings.config_dir;

    Ok(vec![
        DownloadRequest::new(
            Url::parse(&format!("{base}/indicator?featured=1&per_page={per_page}"))?,
            dir.join(INDICATORS_FILE),
        ),
        DownloadRequest::new(
            Url::parse(&format!("{base}/topics?per_page={per_page}"))?,
            dir.join(TOPICS_FILE),
        ),
        DownloadRequest::new(
            Url::parse(&format!("{base}/countries?per_page={per_page}"))?,
            dir.join(COUNTRIES_FILE),
        ),
    ])
}
