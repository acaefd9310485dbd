use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::list::{FeedDescriptor, FeedListError};

/// Maximum allowed nesting depth for OPML outline elements.
const MAX_OPML_DEPTH: usize = 50;

/// Parses an OPML subscription list into feed descriptors.
///
/// Every `<outline>` carrying an `xmlUrl` attribute becomes one feed,
/// regardless of nesting; category outlines without `xmlUrl` are walked but
/// not returned. The feed name comes from `title`, then `text`, then the URL.
///
/// `quick-xml` never expands `<!ENTITY>` declarations, so only the five XML
/// builtin entities are resolved in attribute values.
pub fn parse_opml(content: &str) -> Result<Vec<FeedDescriptor>, FeedListError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut feeds = Vec::new();
    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut saw_opml_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"opml" => saw_opml_root = true,
            Ok(Event::Start(e)) if e.name().as_ref() == b"outline" => {
                depth += 1;
                if depth > MAX_OPML_DEPTH {
                    return Err(FeedListError::Opml(format!(
                        "outline nesting exceeds {} levels",
                        MAX_OPML_DEPTH
                    )));
                }
                if let Some(feed) = outline_to_feed(&e, &reader)? {
                    feeds.push(feed);
                }
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"outline" => {
                if let Some(feed) = outline_to_feed(&e, &reader)? {
                    feeds.push(feed);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"outline" => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedListError::Opml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !saw_opml_root {
        return Err(FeedListError::Opml("missing <opml> root element".to_string()));
    }

    Ok(feeds)
}

fn outline_to_feed(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<Option<FeedDescriptor>, FeedListError> {
    let mut xml_url = None;
    let mut title = None;
    let mut text = None;

    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed OPML attribute");
                continue;
            }
        };
        let value = || -> Result<String, FeedListError> {
            attr.decode_and_unescape_value(reader.decoder())
                .map(|v| v.trim().to_string())
                .map_err(|e| FeedListError::Opml(e.to_string()))
        };
        match attr.key.as_ref() {
            b"xmlUrl" => xml_url = Some(value()?),
            b"title" => title = Some(value()?),
            b"text" => text = Some(value()?),
            _ => {}
        }
    }

    let Some(url) = xml_url.filter(|u| !u.is_empty()) else {
        return Ok(None);
    };

    let name = title
        .filter(|t| !t.is_empty())
        .or(text.filter(|t| !t.is_empty()))
        .unwrap_or_else(|| url.clone());

    Ok(Some(FeedDescriptor { name, url }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_outlines() {
        let opml = r#"<?xml version="1.0"?>
<opml version="2.0">
  <head><title>Blogs</title></head>
  <body>
    <outline text="Tech">
      <outline type="rss" text="Text Name" title="Title Name" xmlUrl="https://a.example.com/feed"/>
      <outline type="rss" text="Only Text" xmlUrl="https://b.example.com/rss?x=1&amp;y=2"/>
    </outline>
    <outline type="rss" xmlUrl="https://c.example.com/atom.xml"/>
  </body>
</opml>"#;

        let feeds = parse_opml(opml).unwrap();
        assert_eq!(
            feeds,
            vec![
                FeedDescriptor {
                    name: "Title Name".into(),
                    url: "https://a.example.com/feed".into(),
                },
                FeedDescriptor {
                    name: "Only Text".into(),
                    url: "https://b.example.com/rss?x=1&y=2".into(),
                },
                FeedDescriptor {
                    name: "https://c.example.com/atom.xml".into(),
                    url: "https://c.example.com/atom.xml".into(),
                },
            ]
        );
    }

    #[test]
    fn test_category_without_feeds() {
        let opml = r#"<opml version="2.0"><body><outline text="Empty"></outline></body></opml>"#;
        assert!(parse_opml(opml).unwrap().is_empty());
    }

    #[test]
    fn test_not_opml_is_error() {
        let result = parse_opml("<rss><channel></channel></rss>");
        assert!(matches!(result, Err(FeedListError::Opml(_))));
    }

    #[test]
    fn test_excessive_nesting_rejected() {
        let mut opml = String::from("<opml><body>");
        for _ in 0..=MAX_OPML_DEPTH {
            opml.push_str("<outline text=\"x\">");
        }
        for _ in 0..=MAX_OPML_DEPTH {
            opml.push_str("</outline>");
        }
        opml.push_str("</body></opml>");

        assert!(matches!(parse_opml(&opml), Err(FeedListError::Opml(_))));
    }
}
