//! Reading OAI-PMH response bodies.
//!
//! Everything here is synchronous and does no I/O. Namespace prefixes are
//! ignored: elements are matched by local name.

use std::collections::HashSet;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::InterpretError;
use crate::mode::OperationMode;

const RESUMPTION_TOKEN: &str = "resumptionToken";
const NO_RECORDS_MATCH: &str = "noRecordsMatch";
const NO_SET_HIERARCHY: &str = "noSetHierarchy";

/// Determine how many items the set behind `body` holds.
///
/// - a `resumptionToken` declaring `completeListSize` wins, whatever the page holds
/// - otherwise items directly inside the verb element are counted
/// - `noRecordsMatch` is an empty set, i.e. `Some(0)`
///
/// `Ok(None)` means the document was readable but carried nothing countable.
pub fn interpret_count(mode: OperationMode, body: &str) -> Result<Option<u64>, InterpretError> {
    let doc = read_document(body, mode.verb(), mode.item_tag())?;

    if let Some(token) = &doc.token {
        return match &token.complete_list_size {
            Some(size) => parse_list_size(size).map(Some),
            // An empty token marks the final page of a list, so what we see is all there is.
            None if token.value.is_empty() && doc.container_seen => Ok(Some(doc.items)),
            None => Ok(None),
        };
    }

    if doc.container_seen {
        return Ok(Some(doc.items));
    }
    if doc.errors.iter().any(|e| e.code == NO_RECORDS_MATCH) {
        return Ok(Some(0));
    }
    Ok(None)
}

/// Extract the `setSpec` of every set in a ListSets response, in document order.
///
/// Blank specs are skipped and repeated specs keep their first position. A
/// repository without set support (`noSetHierarchy`) has no sets.
pub fn parse_set_specs(body: &str) -> Result<Vec<String>, InterpretError> {
    let doc = read_document(body, "ListSets", "set")?;

    if let Some(err) = doc.errors.into_iter().next() {
        if err.code == NO_SET_HIERARCHY {
            return Ok(Vec::new());
        }
        return Err(InterpretError::OaiError {
            code: err.code,
            message: err.message,
        });
    }
    if !doc.container_seen {
        return Err(InterpretError::Missing("ListSets".into()));
    }

    let mut seen = HashSet::new();
    Ok(doc
        .set_specs
        .into_iter()
        .filter(|spec| !spec.is_empty())
        .filter(|spec| seen.insert(spec.clone()))
        .collect())
}

fn parse_list_size(raw: &str) -> Result<u64, InterpretError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| InterpretError::BadListSize(raw.to_string()))
}

#[derive(Debug, Default)]
struct ResumptionToken {
    complete_list_size: Option<String>,
    value: String,
}

#[derive(Debug, Default)]
struct OaiError {
    code: String,
    message: String,
}

/// What a single pass over a response collects.
#[derive(Debug, Default)]
struct Document {
    container_seen: bool,
    items: u64,
    token: Option<ResumptionToken>,
    errors: Vec<OaiError>,
    set_specs: Vec<String>,
}

impl Document {
    fn open(
        &mut self,
        name: &str,
        element: &BytesStart<'_>,
        parent: Option<&str>,
        container: &str,
        item_tag: &str,
    ) -> Result<(), InterpretError> {
        if name == container {
            self.container_seen = true;
        } else if name == RESUMPTION_TOKEN && self.token.is_none() {
            self.token = Some(ResumptionToken {
                complete_list_size: attribute(element, "completeListSize")?,
                value: String::new(),
            });
        } else if name == "error" {
            self.errors.push(OaiError {
                code: attribute(element, "code")?.unwrap_or_default(),
                message: String::new(),
            });
        } else if name == "setSpec" && parent == Some("set") {
            self.set_specs.push(String::new());
        }

        if name == item_tag && parent == Some(container) {
            self.items += 1;
        }
        Ok(())
    }

    fn text(&mut self, current: &str, parent: Option<&str>, text: &str) {
        let target = match current {
            RESUMPTION_TOKEN => self.token.as_mut().map(|t| &mut t.value),
            "error" => self.errors.last_mut().map(|e| &mut e.message),
            "setSpec" if parent == Some("set") => self.set_specs.last_mut(),
            _ => None,
        };
        if let Some(target) = target {
            target.push_str(text.trim());
        }
    }
}

fn read_document(body: &str, container: &str, item_tag: &str) -> Result<Document, InterpretError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut doc = Document::default();
    let mut stack: Vec<String> = Vec::new();
    let mut root_seen = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                doc.open(&name, &e, stack.last().map(String::as_str), container, item_tag)?;
                root_seen = true;
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                doc.open(&name, &e, stack.last().map(String::as_str), container, item_tag)?;
                root_seen = true;
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| InterpretError::Malformed(e.to_string()))?;
                if let Some((current, parent)) = current_and_parent(&stack) {
                    doc.text(current, parent, &text);
                }
            }
            Ok(Event::CData(c)) => {
                let raw = c.into_inner();
                let text = String::from_utf8_lossy(&raw);
                if let Some((current, parent)) = current_and_parent(&stack) {
                    doc.text(current, parent, &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(InterpretError::Malformed(format!(
                    "at byte {}: {e}",
                    reader.error_position()
                )))
            }
            _ => {}
        }
    }

    if !root_seen {
        return Err(InterpretError::Malformed("no root element".into()));
    }
    if let Some(open) = stack.last() {
        return Err(InterpretError::Malformed(format!("unclosed element <{open}>")));
    }
    Ok(doc)
}

fn current_and_parent(stack: &[String]) -> Option<(&str, Option<&str>)> {
    let (current, rest) = stack.split_last()?;
    Some((current.as_str(), rest.last().map(String::as_str)))
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, InterpretError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| InterpretError::Malformed(err.to_string()))?;
        if attr.key.local_name().as_ref() == key.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|err| InterpretError::Malformed(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oai(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
              <responseDate>2024-01-01T00:00:00Z</responseDate>
              {inner}
            </OAI-PMH>"#
        )
    }

    fn header(id: &str) -> String {
        format!("<header><identifier>{id}</identifier><datestamp>2024-01-01</datestamp><setSpec>A</setSpec></header>")
    }

    #[test]
    fn complete_list_size_is_authoritative() {
        let body = oai(&format!(
            r#"<ListIdentifiers>{}{}<resumptionToken completeListSize="42" cursor="0">tok-1</resumptionToken></ListIdentifiers>"#,
            header("a"),
            header("b")
        ));
        assert_eq!(interpret_count(OperationMode::Identifiers, &body), Ok(Some(42)));
    }

    #[test]
    fn counts_headers_without_token() {
        let body = oai(&format!(
            "<ListIdentifiers>{}{}{}</ListIdentifiers>",
            header("a"),
            header("b"),
            header("c")
        ));
        assert_eq!(interpret_count(OperationMode::Identifiers, &body), Ok(Some(3)));
    }

    #[test]
    fn records_mode_ignores_nested_headers() {
        let record = format!("<record>{}<metadata><dc/></metadata></record>", header("x"));
        let body = oai(&format!("<ListRecords>{record}{record}</ListRecords>"));
        assert_eq!(interpret_count(OperationMode::Records, &body), Ok(Some(2)));
        // The same document has no direct headers under ListIdentifiers.
        assert_eq!(interpret_count(OperationMode::Identifiers, &body), Ok(None));
    }

    #[test]
    fn prefixed_elements_match_by_local_name() {
        let body = r#"<oai:OAI-PMH xmlns:oai="http://www.openarchives.org/OAI/2.0/">
            <oai:ListIdentifiers>
              <oai:header><oai:identifier>a</oai:identifier></oai:header>
              <oai:resumptionToken oai:completeListSize="7">t</oai:resumptionToken>
            </oai:ListIdentifiers>
        </oai:OAI-PMH>"#;
        assert_eq!(interpret_count(OperationMode::Identifiers, body), Ok(Some(7)));
    }

    #[test]
    fn empty_final_token_counts_page() {
        let body = oai(&format!(
            "<ListIdentifiers>{}{}<resumptionToken/></ListIdentifiers>",
            header("a"),
            header("b")
        ));
        assert_eq!(interpret_count(OperationMode::Identifiers, &body), Ok(Some(2)));
    }

    #[test]
    fn token_without_size_is_unknown() {
        let body = oai(&format!(
            "<ListIdentifiers>{}<resumptionToken>more</resumptionToken></ListIdentifiers>",
            header("a")
        ));
        assert_eq!(interpret_count(OperationMode::Identifiers, &body), Ok(None));
    }

    #[test]
    fn non_integer_size_is_an_error() {
        let body = oai(r#"<ListIdentifiers><resumptionToken completeListSize="lots">t</resumptionToken></ListIdentifiers>"#);
        assert_eq!(
            interpret_count(OperationMode::Identifiers, &body),
            Err(InterpretError::BadListSize("lots".into()))
        );
    }

    #[test]
    fn no_records_match_is_zero() {
        let body = oai(r#"<request verb="ListIdentifiers">https://example.org/oai</request>
            <error code="noRecordsMatch">No matching records</error>"#);
        assert_eq!(interpret_count(OperationMode::Identifiers, &body), Ok(Some(0)));
        assert_eq!(interpret_count(OperationMode::Records, &body), Ok(Some(0)));
    }

    #[test]
    fn other_oai_error_has_nothing_to_count() {
        let body = oai(r#"<error code="badArgument">Unknown metadataPrefix</error>"#);
        assert_eq!(interpret_count(OperationMode::Identifiers, &body), Ok(None));
    }

    #[test]
    fn malformed_bodies_are_errors() {
        for body in ["", "plain text", "<OAI-PMH><ListIdentifiers></OAI-PMH>", "<OAI-PMH>"] {
            assert!(
                matches!(
                    interpret_count(OperationMode::Identifiers, body),
                    Err(InterpretError::Malformed(_))
                ),
                "{body:?} should be malformed"
            );
        }
    }

    #[test]
    fn set_specs_in_order_without_duplicates() {
        let body = oai(r#"<ListSets>
            <set><setSpec>A</setSpec><setName>Alpha</setName></set>
            <set><setSpec> B </setSpec><setName>Beta</setName></set>
            <set><setSpec>A</setSpec><setName>Alpha again</setName></set>
            <set><setSpec></setSpec><setName>blank</setName></set>
            <set><setSpec>coll:sub</setSpec><setName>Nested</setName></set>
        </ListSets>"#);
        assert_eq!(parse_set_specs(&body).unwrap(), vec!["A", "B", "coll:sub"]);
    }

    #[test]
    fn empty_list_sets() {
        assert_eq!(parse_set_specs(&oai("<ListSets/>")).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn no_set_hierarchy_means_no_sets() {
        let body = oai(r#"<error code="noSetHierarchy">This repository does not support sets</error>"#);
        assert_eq!(parse_set_specs(&body).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn other_list_sets_errors_surface() {
        let body = oai(r#"<error code="badVerb">Illegal verb</error>"#);
        assert_eq!(
            parse_set_specs(&body),
            Err(InterpretError::OaiError {
                code: "badVerb".into(),
                message: "Illegal verb".into()
            })
        );
        assert!(matches!(
            parse_set_specs("<html><body>hi</body></html>"),
            Err(InterpretError::Missing(_))
        ));
    }
}
