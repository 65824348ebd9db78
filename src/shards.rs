//! Shard directory loader: resolves the list of index shards to crawl from
//! the federation's XML whitelist.

use crate::config::Config;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::path::{Path, PathBuf};

/// An opaque `host:port[/path]` string identifying one queryable index shard.
pub type ShardEndpoint = String;

/// The shard directory source is missing, unreadable or structurally invalid.
/// Fatal to the whole run; no partial output is attempted.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("shard whitelist {path} is unreadable: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shard whitelist is not valid XML: {0}")]
    InvalidXml(#[from] quick_xml::Error),
}

/// Load shard endpoints from the whitelist file.
///
/// Zero matching elements is not an error: the crawl completes successfully
/// with an empty snapshot, so an empty directory yields `Ok(vec![])`.
pub fn load_shards(path: impl AsRef<Path>) -> Result<Vec<ShardEndpoint>, ConfigError> {
    let path = path.as_ref();
    let xml = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_whitelist(&xml)
}

/// Extract the text of every `{http://www.esgf.org/whitelist}value` element
/// anywhere in the document tree.
pub fn parse_whitelist(xml: &str) -> Result<Vec<ShardEndpoint>, ConfigError> {
    let mut reader = NsReader::from_str(xml);
    let mut shards = Vec::new();
    let mut inside_value = false;
    // Elements opened inside the current value; its own end tag is depth 0.
    let mut depth = 0usize;
    let mut text = String::new();

    loop {
        match reader.read_resolved_event()? {
            (_, Event::Eof) => break,
            (ResolveResult::Bound(Namespace(ns)), Event::Start(e))
                if !inside_value
                    && ns == Config::WHITELIST_NS.as_bytes()
                    && e.local_name().as_ref() == b"value" =>
            {
                inside_value = true;
                depth = 0;
                text.clear();
            }
            (_, Event::Start(_)) if inside_value => depth += 1,
            (_, Event::Text(t)) if inside_value => {
                text.push_str(&t.unescape()?);
            }
            (_, Event::End(_)) if inside_value => {
                if depth > 0 {
                    depth -= 1;
                } else {
                    inside_value = false;
                    let endpoint = text.trim();
                    if !endpoint.is_empty() {
                        shards.push(endpoint.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    Ok(shards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const WHITELIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<shards xmlns="http://www.esgf.org/whitelist">
  <value>esgf-index1.ceda.ac.uk:8983/solr</value>
  <value>esgf-node.llnl.gov:8983/solr</value>
  <value> esgf-data.dkrz.de:8983/solr </value>
</shards>
"#;

    #[test]
    fn test_parse_whitelist() {
        let shards = parse_whitelist(WHITELIST).unwrap();
        assert_eq!(
            shards,
            vec![
                "esgf-index1.ceda.ac.uk:8983/solr",
                "esgf-node.llnl.gov:8983/solr",
                "esgf-data.dkrz.de:8983/solr",
            ]
        );
    }

    #[test]
    fn test_namespaced_elements_only() {
        let xml = r#"<shards xmlns:w="http://www.esgf.org/whitelist">
            <w:value>host1:8983/solr</w:value>
            <value>not-whitelisted:8983/solr</value>
        </shards>"#;
        let shards = parse_whitelist(xml).unwrap();
        assert_eq!(shards, vec!["host1:8983/solr"]);
    }

    #[test]
    fn test_markup_inside_value_keeps_trailing_text() {
        let xml = r#"<shards xmlns="http://www.esgf.org/whitelist">
            <value>host1:<br/>8983/solr</value>
            <value>host2:<em>8983</em>/solr</value>
        </shards>"#;
        let shards = parse_whitelist(xml).unwrap();
        assert_eq!(shards, vec!["host1:8983/solr", "host2:8983/solr"]);
    }

    #[test]
    fn test_zero_matches_is_not_an_error() {
        let xml = r#"<shards><other>x</other></shards>"#;
        assert_eq!(parse_whitelist(xml).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_invalid_xml() {
        let result = parse_whitelist("<shards><value>x</wrong></shards>");
        assert!(matches!(result, Err(ConfigError::InvalidXml(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_shards("/nonexistent/esgf_shards_static.xml");
        assert!(matches!(result, Err(ConfigError::Unreadable { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(WHITELIST.as_bytes()).unwrap();
        let shards = load_shards(file.path()).unwrap();
        assert_eq!(shards.len(), 3);
    }
}
