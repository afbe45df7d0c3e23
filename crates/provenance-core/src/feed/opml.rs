use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::endpoints::NewEndpoint;
use crate::Result;

/// An endpoint listed in an OPML file
#[derive(Debug, Clone)]
pub struct OpmlEntry {
    pub url: String,
    pub title: Option<String>,
}

impl OpmlEntry {
    /// Endpoint registration for this entry with the given accept type
    pub fn to_endpoint(&self, accept: &str) -> NewEndpoint {
        NewEndpoint::new(self.url.clone(), accept)
    }
}

/// Parse OPML file and extract endpoint entries
pub fn parse_opml_file(path: &Path) -> Result<Vec<OpmlEntry>> {
    let content = std::fs::read_to_string(path)?;
    parse_opml(&content)
}

/// Parse OPML content string
pub fn parse_opml(content: &str) -> Result<Vec<OpmlEntry>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"outline" => {
                let mut xml_url = None;
                let mut title = None;

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"xmlUrl" => xml_url = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        b"title" => title = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        b"text" if title.is_none() => {
                            title = Some(String::from_utf8_lossy(&attr.value).to_string())
                        }
                        _ => {}
                    }
                }

                // Outlines without xmlUrl are folders
                if let Some(url) = xml_url.filter(|u| !u.trim().is_empty()) {
                    entries.push(OpmlEntry { url, title });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(crate::Error::FeedParse(format!("Failed to parse OPML: {}", e)));
            }
            _ => {}
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_opml_nested_outlines() {
        let opml = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="2.0">
  <head><title>Endpoints</title></head>
  <body>
    <outline text="Engineering">
      <outline text="InfoQ" title="InfoQ Feed" xmlUrl="https://feed.infoq.com/" type="rss"/>
      <outline text="Example" xmlUrl="https://feed.example.com/" type="rss"/>
    </outline>
    <outline xmlUrl="https://bare.example.com/rss"/>
  </body>
</opml>"#;

        let entries = parse_opml(opml).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].title.as_deref(), Some("InfoQ Feed"));
        assert_eq!(entries[0].url, "https://feed.infoq.com/");
        assert_eq!(entries[1].title.as_deref(), Some("Example"));
        assert!(entries[2].title.is_none());

        let endpoint = entries[1].to_endpoint("application/rss+xml");
        assert_eq!(endpoint, NewEndpoint::new("https://feed.example.com/", "application/rss+xml"));
    }

    #[test]
    fn test_folders_without_url_are_skipped() {
        let opml = r#"<opml version="2.0"><body><outline text="Empty"/><outline text="Blank" xmlUrl=" "/></body></opml>"#;

        assert!(parse_opml(opml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_opml_file_reads_from_disk() {
        let path = std::env::temp_dir().join(format!("provenance-opml-{}.xml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"<opml version="2.0"><body><outline text="A" xmlUrl="https://a.example/"/></body></opml>"#,
        )
        .unwrap();

        let entries = parse_opml_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://a.example/");
    }
}
