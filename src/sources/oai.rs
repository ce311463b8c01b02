//! Internal repository provider speaking OAI-PMH.
//!
//! Records are selected through dynamic sets of the form
//! `collection~*_solr~<field>:"<value>"`, where `<field>` is `identifier` for
//! DOI lookups and `title` for title lookups. Only abstracts are extracted.
//!
//! When several records match, the one with the most recent creation date
//! wins and a warning is logged.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::sync::Arc;

use crate::models::{Attribute, Attributes};
use crate::sources::{Provider, ProviderCapabilities, SourceError};
use crate::utils::{titles_match, HttpClient};

/// Default metadata format of the repository
pub const DEFAULT_METADATA_PREFIX: &str = "ftx";

/// Upper bound on `resumptionToken` pages followed per lookup
const MAX_PAGES: usize = 10;

/// Elements whose text content is read; inline markup inside them is flattened
const TEXT_ELEMENTS: [&str; 5] = [
    "abstract",
    "title",
    "ftxCreationDate",
    "resumptionToken",
    "error",
];

/// OAI-PMH provider for the internal repository
#[derive(Debug, Clone)]
pub struct OaiSource {
    client: Arc<HttpClient>,
    endpoint: String,
    metadata_prefix: String,
}

impl OaiSource {
    pub fn new(endpoint: &str, metadata_prefix: &str) -> Result<Self, SourceError> {
        if endpoint.trim().is_empty() {
            return Err(SourceError::InvalidRequest(
                "OAI endpoint must not be empty".to_string(),
            ));
        }

        Ok(Self {
            client: Arc::new(HttpClient::new()?),
            endpoint: endpoint.trim().to_string(),
            metadata_prefix: metadata_prefix.to_string(),
        })
    }

    /// Fetch every record of a dynamic set, following resumption tokens
    async fn list_records(
        &self,
        dynamic_set: &str,
        query: &str,
    ) -> Result<Vec<OaiRecord>, SourceError> {
        let set = format!("collection~*_solr~{}:\"{}\"", dynamic_set, query);
        let mut url = format!(
            "{}?verb=ListRecords&metadataPrefix={}&set={}",
            self.endpoint,
            urlencoding::encode(&self.metadata_prefix),
            urlencoding::encode(&set)
        );

        let mut records = Vec::new();
        for page_number in 1..=MAX_PAGES {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| SourceError::Network(format!("Failed to list OAI records: {}", e)))?;

            if !response.status().is_success() {
                return Err(SourceError::Api(format!(
                    "OAI endpoint returned status: {}",
                    response.status()
                )));
            }

            let body = response
                .text()
                .await
                .map_err(|e| SourceError::Network(format!("Failed to read OAI response: {}", e)))?;

            let page = parse_list_records(&body)?;

            if let Some(error) = page.error {
                if error.code == "noRecordsMatch" {
                    break;
                }
                return Err(SourceError::Api(format!(
                    "OAI-PMH error: {} - {}",
                    error.code, error.message
                )));
            }

            records.extend(page.records);

            match page.resumption_token {
                Some(token) if page_number == MAX_PAGES => {
                    tracing::warn!(
                        "Stopped after {} OAI pages for {}=\"{}\", resumption token {} not followed",
                        MAX_PAGES,
                        dynamic_set,
                        query,
                        token
                    );
                }
                Some(token) => {
                    url = format!(
                        "{}?verb=ListRecords&resumptionToken={}",
                        self.endpoint,
                        urlencoding::encode(&token)
                    );
                }
                None => break,
            }
        }

        Ok(records)
    }

    async fn lookup(
        &self,
        dynamic_set: &str,
        query: &str,
        verify_title: bool,
    ) -> Result<Option<Attributes>, SourceError> {
        let candidates: Vec<OaiRecord> = self
            .list_records(dynamic_set, query)
            .await?
            .into_iter()
            .filter(|record| !record.abstracts.is_empty())
            .filter(|record| {
                !verify_title
                    || record
                        .title
                        .as_deref()
                        .is_some_and(|t| titles_match(t, query))
            })
            .collect();

        let Some(record) = select_most_recent(candidates, dynamic_set, query) else {
            return Ok(None);
        };

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::Abstract, record.abstracts.join(" "));
        Ok(Some(attributes))
    }
}

#[async_trait]
impl Provider for OaiSource {
    fn id(&self) -> &str {
        "oai"
    }

    fn name(&self) -> &str {
        "Internal Repository (OAI-PMH)"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::DOI_LOOKUP | ProviderCapabilities::TITLE_LOOKUP
    }

    async fn lookup_doi(&self, doi: &str) -> Result<Option<Attributes>, SourceError> {
        self.lookup("identifier", doi, false).await
    }

    async fn lookup_title(&self, title: &str) -> Result<Option<Attributes>, SourceError> {
        self.lookup("title", title, true).await
    }
}

/// Pick the record with the latest creation date; unparsable dates rank last
fn select_most_recent(
    mut records: Vec<OaiRecord>,
    dynamic_set: &str,
    query: &str,
) -> Option<OaiRecord> {
    match records.len() {
        0 => {
            tracing::warn!("No OAI record found for {}={}", dynamic_set, query);
            None
        }
        1 => records.pop(),
        n => {
            tracing::warn!(
                "{} OAI records found for {}={}, taking the most recently created one",
                n,
                dynamic_set,
                query
            );
            records
                .into_iter()
                .max_by_key(|record| record.creation_date.as_deref().and_then(parse_timestamp))
        }
    }
}

/// Parse an ISO 8601 date or date-time into a sortable timestamp
fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// ===== OAI-PMH Response Types =====

#[derive(Debug, Default, Clone, PartialEq)]
struct OaiRecord {
    creation_date: Option<String>,
    title: Option<String>,
    abstracts: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct OaiError {
    code: String,
    message: String,
}

#[derive(Debug, Default)]
struct ListRecordsPage {
    records: Vec<OaiRecord>,
    resumption_token: Option<String>,
    error: Option<OaiError>,
}

/// Parse a `ListRecords` response, matching elements by local name so that
/// namespace prefixes of the metadata format do not matter
fn parse_list_records(xml: &str) -> Result<ListRecordsPage, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut page = ListRecordsPage::default();
    let mut path: Vec<String> = Vec::new();
    let mut current: Option<OaiRecord> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e);
                match name.as_str() {
                    "record" => current = Some(OaiRecord::default()),
                    "error" => {
                        page.error = Some(OaiError {
                            code: get_attr(e, "code").unwrap_or_default(),
                            message: String::new(),
                        });
                    }
                    _ => {}
                }
                if TEXT_ELEMENTS.contains(&name.as_str()) {
                    text.clear();
                }
                path.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                if local_name(e) == "error" {
                    page.error = Some(OaiError {
                        code: get_attr(e, "code").unwrap_or_default(),
                        message: String::new(),
                    });
                }
            }
            Ok(Event::Text(e)) => {
                let value = e
                    .unescape()
                    .map_err(|e| SourceError::Parse(format!("XML text: {}", e)))?;
                push_text(&mut text, &value);
            }
            Ok(Event::CData(e)) => {
                push_text(&mut text, &String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(_)) => {
                let name = path.pop().unwrap_or_default();

                if name == "record" {
                    if let Some(record) = current.take() {
                        page.records.push(record);
                    }
                } else if TEXT_ELEMENTS.contains(&name.as_str()) {
                    let value = std::mem::take(&mut text).trim().to_string();
                    let in_bibliographic = path.iter().any(|p| p == "bibliographicInfo");

                    match (name.as_str(), current.as_mut()) {
                        ("ftxCreationDate", Some(record)) if !value.is_empty() => {
                            record.creation_date.get_or_insert(value);
                        }
                        ("abstract", Some(record))
                            if !value.is_empty()
                                && path.last().is_some_and(|p| p == "abstracts") =>
                        {
                            record.abstracts.push(value);
                        }
                        ("title", Some(record)) if in_bibliographic && !value.is_empty() => {
                            record.title.get_or_insert(value);
                        }
                        ("resumptionToken", _) if !value.is_empty() => {
                            page.resumption_token = Some(value);
                        }
                        ("error", _) => {
                            if let Some(error) = page.error.as_mut() {
                                error.message = value;
                            }
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(SourceError::Parse(format!("XML parsing error: {}", e)));
            }
        }
        buf.clear();
    }

    Ok(page)
}

/// Append a text node, keeping adjacent nodes apart by one space
fn push_text(text: &mut String, value: &str) {
    if value.is_empty() {
        return;
    }
    if !text.is_empty()
        && !text.ends_with(char::is_whitespace)
        && !value.starts_with(char::is_whitespace)
    {
        text.push(' ');
    }
    text.push_str(value);
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

fn get_attr(e: &BytesStart<'_>, attr_name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == attr_name.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::LookupKey;
    use mockito::Matcher;

    fn record_xml(created: &str, title: &str, abstracts: &[&str]) -> String {
        let abstracts: String = abstracts
            .iter()
            .map(|a| format!("<x:abstract>{}</x:abstract>", a))
            .collect();
        format!(
            r#"<record>
                <header><identifier>oai:repo:{created}</identifier></header>
                <metadata>
                  <ftx:documentContainer xmlns:ftx="http://www.tib-hannover.de/ext/schema/2007-06-26/fiz-tib-schema.xsd" xmlns:x="http://www.openarchives.org/OAI/2.0/">
                    <x:document>
                      <x:systemInfo><x:ftxCreationDate>{created}</x:ftxCreationDate></x:systemInfo>
                      <x:bibliographicInfo>
                        <x:titles><x:title>{title}</x:title></x:titles>
                        <x:abstracts>{abstracts}</x:abstracts>
                      </x:bibliographicInfo>
                    </x:document>
                  </ftx:documentContainer>
                </metadata>
              </record>"#
        )
    }

    fn list_records(records: &[String], token: Option<&str>) -> String {
        let token = token
            .map(|t| format!("<resumptionToken>{}</resumptionToken>", t))
            .unwrap_or_default();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
              <responseDate>2024-01-01T00:00:00Z</responseDate>
              <ListRecords>{}{}</ListRecords>
            </OAI-PMH>"#,
            records.concat(),
            token
        )
    }

    #[test]
    fn test_parse_records() {
        let xml = list_records(
            &[record_xml(
                "2020-01-02T10:00:00",
                "Deep Learning Methods Survey",
                &["First part.", "Second &amp; last."],
            )],
            Some("page-2"),
        );

        let page = parse_list_records(&xml).unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.resumption_token.as_deref(), Some("page-2"));
        assert!(page.error.is_none());

        let record = &page.records[0];
        assert_eq!(record.creation_date.as_deref(), Some("2020-01-02T10:00:00"));
        assert_eq!(record.title.as_deref(), Some("Deep Learning Methods Survey"));
        assert_eq!(record.abstracts, vec!["First part.", "Second & last."]);
    }

    #[test]
    fn test_parse_abstract_with_inline_markup() {
        let xml = list_records(
            &[record_xml(
                "2020-01-02",
                "Water <i>in</i> Solution Studies",
                &["Water H<sub>2</sub>O is studied here.", "<i>Second</i> part."],
            )],
            None,
        );

        let page = parse_list_records(&xml).unwrap();
        let record = &page.records[0];
        assert_eq!(
            record.abstracts,
            vec!["Water H 2 O is studied here.", "Second part."]
        );
        assert_eq!(record.title.as_deref(), Some("Water in Solution Studies"));
        assert_eq!(record.creation_date.as_deref(), Some("2020-01-02"));
    }

    #[test]
    fn test_parse_error() {
        let xml = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
            <error code="noRecordsMatch">No records match the request</error>
        </OAI-PMH>"#;

        let page = parse_list_records(xml).unwrap();
        let error = page.error.unwrap();
        assert_eq!(error.code, "noRecordsMatch");
        assert_eq!(error.message, "No records match the request");
        assert!(page.records.is_empty());
    }

    #[test]
    fn test_most_recent_record_wins() {
        let records = vec![
            OaiRecord {
                creation_date: Some("2019-05-01T00:00:00".to_string()),
                title: None,
                abstracts: vec!["old".to_string()],
            },
            OaiRecord {
                creation_date: Some("2021-02-03".to_string()),
                title: None,
                abstracts: vec!["new".to_string()],
            },
            OaiRecord {
                creation_date: Some("not a date".to_string()),
                title: None,
                abstracts: vec!["broken".to_string()],
            },
        ];

        let chosen = select_most_recent(records, "identifier", "10.1/x").unwrap();
        assert_eq!(chosen.abstracts, vec!["new".to_string()]);
        assert!(select_most_recent(Vec::new(), "identifier", "10.1/x").is_none());
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2020-01-02T10:00:00Z").is_some());
        assert!(parse_timestamp("2020-01-02T10:00:00.123").is_some());
        assert!(parse_timestamp("2020-01-02").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        assert!(OaiSource::new("  ", DEFAULT_METADATA_PREFIX).is_err());
    }

    #[tokio::test]
    async fn test_lookup_doi_uses_identifier_set() {
        let mut server = mockito::Server::new_async().await;
        let body = list_records(
            &[record_xml("2020-01-01", "Anything", &["Part one.", "Part two."])],
            None,
        );
        let mock = server
            .mock("GET", "/oai")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("verb".to_string(), "ListRecords".to_string()),
                Matcher::UrlEncoded("metadataPrefix".to_string(), "ftx".to_string()),
                Matcher::UrlEncoded(
                    "set".to_string(),
                    "collection~*_solr~identifier:\"10.1/x\"".to_string(),
                ),
            ]))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let source = OaiSource::new(&format!("{}/oai", server.url()), "ftx").unwrap();
        let attributes = source.lookup_doi("10.1/x").await.unwrap().unwrap();

        assert_eq!(
            attributes.get(&Attribute::Abstract).unwrap(),
            "Part one. Part two."
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_lookup_title_filters_on_title() {
        let mut server = mockito::Server::new_async().await;
        let body = list_records(
            &[
                record_xml("2022-01-01", "Deep Learning Methods Survey II", &["sequel"]),
                record_xml("2020-01-01", "deep learning methods survey", &["original"]),
            ],
            None,
        );
        let _mock = server
            .mock("GET", "/oai")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let source = OaiSource::new(&format!("{}/oai", server.url()), "ftx").unwrap();
        let attributes = source
            .lookup_title("Deep Learning Methods Survey")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(attributes.get(&Attribute::Abstract).unwrap(), "original");
    }

    #[tokio::test]
    async fn test_follows_resumption_token() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/oai")
            .match_query(Matcher::UrlEncoded(
                "metadataPrefix".to_string(),
                "ftx".to_string(),
            ))
            .with_status(200)
            .with_body(list_records(
                &[record_xml("2018-01-01", "x", &["older"])],
                Some("next"),
            ))
            .create_async()
            .await;
        let second = server
            .mock("GET", "/oai")
            .match_query(Matcher::UrlEncoded(
                "resumptionToken".to_string(),
                "next".to_string(),
            ))
            .with_status(200)
            .with_body(list_records(
                &[record_xml("2023-01-01", "x", &["newer"])],
                None,
            ))
            .create_async()
            .await;

        let source = OaiSource::new(&format!("{}/oai", server.url()), "ftx").unwrap();
        let attributes = source.lookup_doi("10.1/x").await.unwrap().unwrap();

        assert_eq!(attributes.get(&Attribute::Abstract).unwrap(), "newer");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_pagination_stops_at_page_cap() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/oai")
            .match_query(Matcher::UrlEncoded(
                "metadataPrefix".to_string(),
                "ftx".to_string(),
            ))
            .with_status(200)
            .with_body(list_records(
                &[record_xml("2018-01-01", "x", &["first page"])],
                Some("again"),
            ))
            .expect(1)
            .create_async()
            .await;
        let rest = server
            .mock("GET", "/oai")
            .match_query(Matcher::UrlEncoded(
                "resumptionToken".to_string(),
                "again".to_string(),
            ))
            .with_status(200)
            .with_body(list_records(
                &[record_xml("2019-01-01", "x", &["later page"])],
                Some("again"),
            ))
            .expect(MAX_PAGES - 1)
            .create_async()
            .await;

        let source = OaiSource::new(&format!("{}/oai", server.url()), "ftx").unwrap();
        let records = source.list_records("identifier", "10.1/x").await.unwrap();

        assert_eq!(records.len(), MAX_PAGES);
        first.assert_async().await;
        rest.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_records_match_is_no_match() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/oai")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"<OAI-PMH><error code="noRecordsMatch">nothing</error></OAI-PMH>"#,
            )
            .create_async()
            .await;

        let source = OaiSource::new(&format!("{}/oai", server.url()), "ftx").unwrap();
        let response = source.query(LookupKey::Doi("10.1/x")).await;
        assert_eq!(response.source, "oai");
        assert!(response.attributes.is_none());
    }

    #[tokio::test]
    async fn test_bad_argument_error_is_no_match() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/oai")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"<OAI-PMH><error code="badArgument">bad set</error></OAI-PMH>"#)
            .create_async()
            .await;

        let source = OaiSource::new(&format!("{}/oai", server.url()), "ftx").unwrap();
        assert!(source.lookup_doi("10.1/x").await.is_err());
        assert!(!source.query(LookupKey::Doi("10.1/x")).await.is_match());
    }
}
