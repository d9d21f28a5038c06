//! OPML subscription lists.

use roxmltree::{Document, Node};

use crate::app::{CanopyError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outline {
    Folder {
        title: String,
        children: Vec<Outline>,
    },
    Feed {
        title: String,
        xml_url: String,
        html_url: Option<String>,
    },
}

/// Parse the `body` of an OPML document into an outline tree.
///
/// An outline with an `xmlUrl` is a feed; any other outline is a folder,
/// however deeply nested.
pub fn parse(xml: &str) -> Result<Vec<Outline>> {
    let doc = Document::parse(xml.trim_start_matches('\u{feff}'))
        .map_err(|e| CanopyError::FeedParse(format!("invalid OPML: {}", e)))?;

    let root = doc.root_element();
    if root.tag_name().name() != "opml" {
        return Err(CanopyError::FeedParse(format!(
            "expected <opml>, found <{}>",
            root.tag_name().name()
        )));
    }

    let body = root
        .children()
        .find(|n| n.has_tag_name("body"))
        .ok_or_else(|| CanopyError::FeedParse("OPML document has no body".into()))?;

    Ok(outlines(body))
}

fn outlines(node: Node<'_, '_>) -> Vec<Outline> {
    node.children()
        .filter(|n| n.has_tag_name("outline"))
        .map(|n| {
            let title = n
                .attribute("text")
                .or_else(|| n.attribute("title"))
                .unwrap_or_default()
                .trim()
                .to_string();
            match n.attribute("xmlUrl").map(str::trim).filter(|u| !u.is_empty()) {
                Some(xml_url) => Outline::Feed {
                    title,
                    xml_url: xml_url.to_string(),
                    html_url: n
                        .attribute("htmlUrl")
                        .map(str::trim)
                        .filter(|u| !u.is_empty())
                        .map(String::from),
                },
                None => Outline::Folder {
                    title,
                    children: outlines(n),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_outlines() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="1.0">
  <head><title>Feeds</title></head>
  <body>
    <outline text="News" title="News">
      <outline text="World">
        <outline type="rss" text="Daily" xmlUrl="https://daily.example/rss" htmlUrl="https://daily.example/"/>
      </outline>
    </outline>
    <outline type="rss" title="Blog" xmlUrl=" https://blog.example/atom "/>
  </body>
</opml>"#;

        let parsed = parse(xml).unwrap();
        assert_eq!(
            parsed,
            vec![
                Outline::Folder {
                    title: "News".into(),
                    children: vec![Outline::Folder {
                        title: "World".into(),
                        children: vec![Outline::Feed {
                            title: "Daily".into(),
                            xml_url: "https://daily.example/rss".into(),
                            html_url: Some("https://daily.example/".into()),
                        }],
                    }],
                },
                Outline::Feed {
                    title: "Blog".into(),
                    xml_url: "https://blog.example/atom".into(),
                    html_url: None,
                },
            ]
        );
    }

    #[test]
    fn test_parse_rejects_non_opml() {
        assert!(parse("<rss/>").is_err());
        assert!(parse("<opml><head/></opml>").is_err());
        assert!(parse("not xml").is_err());
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(parse("<opml><body/></opml>").unwrap().is_empty());
    }
}
