//! Markup Transformer Module
//!
//! This module parses markup content entries (chapter documents) into a
//! mutable tree, applies the cleanup transforms (watermark removal,
//! navigation-link pruning, paragraph reflow) and serializes the tree
//! back to bytes.
//!
//! The tree keeps the raw character data and the raw start-tag content of
//! every node exactly as they appear in the source, so serializing a freshly
//! parsed, unmutated document reproduces its input byte for byte. Any
//! difference between input and output can therefore only come from an
//! applied transform, and an entry with zero applied mutations is never
//! rewritten at all.

use std::io::Cursor;

use quick_xml::{
    Reader, Writer,
    events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesRef, BytesStart, BytesText, Event},
};

use crate::{
    error::CleanError,
    types::TransformOutcome,
    utils::DecodeBytes,
    workarea::WorkArea,
};

/// The literal watermark substring stripped from chapter text
pub const WATERMARK_TOKEN: &str = "RUBoard";

/// UTF-8 byte order mark, re-attached to rewritten payloads that carried one
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Text markers identifying navigation anchors to prune
///
/// An anchor element whose rendered text contains any of these substrings
/// (case-sensitive) is detached from its parent.
pub const NAV_MARKERS: [&str; 2] = ["Next", "Prev"];

/// A single node of a parsed markup document
///
/// Non-element variants carry their raw source content verbatim: escaped
/// character data for text, the interior of the marker for declarations,
/// processing instructions, doctypes, comments and general entity
/// references.
#[derive(Debug, Clone)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
    Decl(String),
    PI(String),
    DocType(String),
    GeneralRef(String),
}

/// An element node in a markup document
#[derive(Debug, Clone)]
pub struct XmlElement {
    /// The exact interior of the start tag (name plus raw attributes)
    raw_start: String,

    /// The tag name as written, including any namespace prefix
    name: String,

    /// Whether the element was written in self-closing form
    self_closing: bool,

    /// Child nodes in document order
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    fn from_start(event: &BytesStart, self_closing: bool) -> Self {
        let raw_start = String::from_utf8_lossy(event.as_ref()).to_string();
        let name = String::from_utf8_lossy(event.name().as_ref()).to_string();

        XmlElement {
            raw_start,
            name,
            self_closing,
            children: Vec::new(),
        }
    }

    /// The tag name without its namespace prefix
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Gets the text content of the element and all its child elements
    ///
    /// Collects the character data (text and CDATA) of the whole subtree in
    /// document order, without trimming or unescaping.
    pub fn text_content(&self) -> String {
        fn collect(element: &XmlElement, text: &mut String) {
            for child in &element.children {
                match child {
                    XmlNode::Text(value) | XmlNode::CData(value) => text.push_str(value),
                    XmlNode::Element(child) => collect(child, text),
                    _ => {}
                }
            }
        }

        let mut text = String::new();
        collect(self, &mut text);
        text
    }
}

/// A parsed tree view of one markup entry's payload
///
/// Produced transiently by the transformer for one entry and discarded after
/// re-serialization. The top-level node list holds the prolog (declaration,
/// doctype, surrounding whitespace) alongside the root element.
#[derive(Debug)]
pub struct MarkupDocument {
    nodes: Vec<XmlNode>,
}

impl MarkupDocument {
    /// Parses a markup string and builds the document tree
    ///
    /// ## Parameters
    /// - `entry`: The entry path, used for error context only
    /// - `content`: The markup text to parse
    ///
    /// ## Return
    /// - `Ok(MarkupDocument)`: The parsed document tree
    /// - `Err(CleanError)`: The content is malformed
    ///   ([CleanError::MarkupParseError])
    pub fn parse(entry: &str, content: &str) -> Result<Self, CleanError> {
        let parse_error = |reason: String| CleanError::MarkupParseError {
            entry: entry.to_string(),
            reason,
        };

        let mut reader = Reader::from_str(content);
        let mut nodes = Vec::new();
        let mut stack = Vec::<XmlElement>::new();

        // Attach a finished node to the innermost open element,
        // or to the document itself when no element is open
        fn attach(stack: &mut [XmlElement], nodes: &mut Vec<XmlNode>, node: XmlNode) {
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => nodes.push(node),
            }
        }

        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,

                Ok(Event::Start(event)) => {
                    stack.push(XmlElement::from_start(&event, false));
                }

                Ok(Event::End(_)) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut nodes, XmlNode::Element(element));
                    }
                }

                Ok(Event::Empty(event)) => {
                    let element = XmlElement::from_start(&event, true);
                    attach(&mut stack, &mut nodes, XmlNode::Element(element));
                }

                Ok(Event::Text(event)) => {
                    let text = String::from_utf8_lossy(event.as_ref()).to_string();
                    attach(&mut stack, &mut nodes, XmlNode::Text(text));
                }

                Ok(Event::CData(event)) => {
                    let data = String::from_utf8_lossy(event.as_ref()).to_string();
                    attach(&mut stack, &mut nodes, XmlNode::CData(data));
                }

                Ok(Event::Comment(event)) => {
                    let comment = String::from_utf8_lossy(event.as_ref()).to_string();
                    attach(&mut stack, &mut nodes, XmlNode::Comment(comment));
                }

                Ok(Event::Decl(event)) => {
                    let decl = String::from_utf8_lossy(event.as_ref()).to_string();
                    attach(&mut stack, &mut nodes, XmlNode::Decl(decl));
                }

                Ok(Event::PI(event)) => {
                    let instruction = String::from_utf8_lossy(event.as_ref()).to_string();
                    attach(&mut stack, &mut nodes, XmlNode::PI(instruction));
                }

                Ok(Event::DocType(event)) => {
                    let doctype = String::from_utf8_lossy(event.as_ref()).to_string();
                    attach(&mut stack, &mut nodes, XmlNode::DocType(doctype));
                }

                Ok(Event::GeneralRef(event)) => {
                    let reference = String::from_utf8_lossy(event.as_ref()).to_string();
                    attach(&mut stack, &mut nodes, XmlNode::GeneralRef(reference));
                }

                Err(err) => return Err(parse_error(err.to_string())),
            }
        }

        if let Some(unclosed) = stack.last() {
            return Err(parse_error(format!(
                "missing end tag </{}>",
                unclosed.name
            )));
        }

        let has_root = nodes
            .iter()
            .any(|node| matches!(node, XmlNode::Element(_)));
        if !has_root {
            return Err(parse_error("no root element".to_string()));
        }

        Ok(MarkupDocument { nodes })
    }

    /// Serializes the document tree back to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, CleanError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        for node in &self.nodes {
            write_node(&mut writer, node)?;
        }

        Ok(writer.into_inner().into_inner())
    }

    /// Removes the watermark token from all text inside the body element
    ///
    /// Every text-bearing node (text and CDATA) in the subtree of the
    /// document's body element has all literal occurrences of `token`
    /// removed; surrounding text is left unchanged. The match is
    /// substring-exact, not a full-word match.
    ///
    /// ## Return
    /// The number of occurrences removed.
    pub fn strip_watermark(&mut self, token: &str) -> usize {
        fn strip(element: &mut XmlElement, token: &str) -> usize {
            let mut removed = 0;

            for child in element.children.iter_mut() {
                match child {
                    XmlNode::Text(value) | XmlNode::CData(value) => {
                        let occurrences = value.matches(token).count();
                        if occurrences > 0 {
                            *value = value.replace(token, "");
                            removed += occurrences;
                        }
                    }
                    XmlNode::Element(child) => removed += strip(child, token),
                    _ => {}
                }
            }

            removed
        }

        match self.body_mut() {
            Some(body) => strip(body, token),
            None => 0,
        }
    }

    /// Detaches navigation anchors from the whole document tree
    ///
    /// Every anchor element whose aggregate text content contains one of
    /// the [NAV_MARKERS] substrings is removed from its parent together
    /// with its subtree. A root-level anchor has no parent and is left
    /// untouched.
    ///
    /// ## Return
    /// The number of anchors removed.
    pub fn prune_nav_anchors(&mut self) -> usize {
        fn is_nav_anchor(node: &XmlNode) -> bool {
            match node {
                XmlNode::Element(element) if element.local_name() == "a" => {
                    let text = element.text_content();
                    NAV_MARKERS.iter().any(|marker| text.contains(marker))
                }
                _ => false,
            }
        }

        fn prune(element: &mut XmlElement) -> usize {
            let mut removed = 0;

            element.children.retain(|child| {
                if is_nav_anchor(child) {
                    removed += 1;
                    false
                } else {
                    true
                }
            });

            for child in element.children.iter_mut() {
                if let XmlNode::Element(child) = child {
                    removed += prune(child);
                }
            }

            removed
        }

        let mut removed = 0;
        for node in self.nodes.iter_mut() {
            if let XmlNode::Element(element) = node {
                removed += prune(element);
            }
        }
        removed
    }

    /// Reflows the paragraphs that are direct children of the body element
    ///
    /// Every run of one or more carriage-return/line-feed characters in the
    /// paragraph's text is replaced with a single space character; all other
    /// whitespace is preserved verbatim.
    ///
    /// ## Return
    /// The number of text nodes altered.
    pub fn reflow_paragraphs(&mut self) -> usize {
        fn reflow(element: &mut XmlElement) -> usize {
            let mut altered = 0;

            for child in element.children.iter_mut() {
                match child {
                    XmlNode::Text(value) | XmlNode::CData(value) => {
                        if let Some(collapsed) = collapse_line_breaks(value) {
                            *value = collapsed;
                            altered += 1;
                        }
                    }
                    XmlNode::Element(child) => altered += reflow(child),
                    _ => {}
                }
            }

            altered
        }

        let Some(body) = self.body_mut() else {
            return 0;
        };

        let mut altered = 0;
        for child in body.children.iter_mut() {
            if let XmlNode::Element(element) = child {
                if element.local_name() == "p" {
                    altered += reflow(element);
                }
            }
        }
        altered
    }

    /// Finds the document's body element, depth-first
    fn body_mut(&mut self) -> Option<&mut XmlElement> {
        fn find<'a>(element: &'a mut XmlElement) -> Option<&'a mut XmlElement> {
            if element.local_name() == "body" {
                return Some(element);
            }
            for child in element.children.iter_mut() {
                if let XmlNode::Element(child) = child {
                    if let Some(body) = find(child) {
                        return Some(body);
                    }
                }
            }
            None
        }

        for node in self.nodes.iter_mut() {
            if let XmlNode::Element(element) = node {
                if let Some(body) = find(element) {
                    return Some(body);
                }
            }
        }
        None
    }
}

/// Replaces every run of CR/LF characters with a single space
///
/// Returns `None` when the text contains no line breaks, so callers can
/// tell an actual mutation apart from a no-op.
fn collapse_line_breaks(text: &str) -> Option<String> {
    if !text.contains(['\r', '\n']) {
        return None;
    }

    let mut collapsed = String::with_capacity(text.len());
    let mut in_break = false;

    for character in text.chars() {
        if character == '\r' || character == '\n' {
            if !in_break {
                collapsed.push(' ');
                in_break = true;
            }
        } else {
            collapsed.push(character);
            in_break = false;
        }
    }

    Some(collapsed)
}

/// Writes one node and its subtree as serialization events
fn write_node(writer: &mut Writer<Cursor<Vec<u8>>>, node: &XmlNode) -> Result<(), CleanError> {
    match node {
        XmlNode::Element(element) => {
            let start = BytesStart::from_content(element.raw_start.as_str(), element.name.len());

            if element.self_closing {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                for child in &element.children {
                    write_node(writer, child)?;
                }
                writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
            }
        }

        XmlNode::Text(value) => {
            writer.write_event(Event::Text(BytesText::from_escaped(value.as_str())))?;
        }

        XmlNode::CData(value) => {
            writer.write_event(Event::CData(BytesCData::new(value.as_str())))?;
        }

        XmlNode::Comment(value) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(value.as_str())))?;
        }

        XmlNode::Decl(value) => {
            let start = BytesStart::from_content(value.as_str(), 3);
            writer.write_event(Event::Decl(BytesDecl::from_start(start)))?;
        }

        XmlNode::PI(value) => {
            writer.write_event(Event::PI(BytesPI::new(value.as_str())))?;
        }

        XmlNode::DocType(value) => {
            writer.write_event(Event::DocType(BytesText::from_escaped(value.as_str())))?;
        }

        XmlNode::GeneralRef(value) => {
            writer.write_event(Event::GeneralRef(BytesRef::new(value.as_str())))?;
        }
    }

    Ok(())
}

/// Applies the full markup transform to one working-area entry
///
/// Decodes and parses the entry's payload, applies watermark removal,
/// navigation-link pruning and paragraph reflow in that order, and
/// overwrites the payload with the serialized result when anything
/// actually changed.
///
/// The transform is idempotent: re-running it on its own output yields
/// byte-identical content.
pub fn transform_markup(work: &WorkArea, entry: &str) -> TransformOutcome {
    let payload = match work.read(entry) {
        Ok(payload) => payload,
        Err(err) => return TransformOutcome::Failed(err),
    };

    let content = match payload.decode() {
        Ok(content) => content,
        Err(err) => {
            return TransformOutcome::Failed(CleanError::MarkupParseError {
                entry: entry.to_string(),
                reason: err.to_string(),
            });
        }
    };

    let mut document = match MarkupDocument::parse(entry, &content) {
        Ok(document) => document,
        Err(err) => return TransformOutcome::Failed(err),
    };

    let mut changes = document.strip_watermark(WATERMARK_TOKEN);
    changes += document.prune_nav_anchors();
    changes += document.reflow_paragraphs();

    if changes == 0 {
        return TransformOutcome::Unchanged;
    }

    let mut bytes = match document.to_bytes() {
        Ok(bytes) => bytes,
        Err(err) => return TransformOutcome::Failed(err),
    };

    if payload.starts_with(&UTF8_BOM) {
        let mut with_bom = Vec::with_capacity(UTF8_BOM.len() + bytes.len());
        with_bom.extend_from_slice(&UTF8_BOM);
        with_bom.append(&mut bytes);
        bytes = with_bom;
    }

    match work.write(entry, &bytes) {
        Ok(()) => TransformOutcome::Modified,
        Err(err) => TransformOutcome::Failed(err),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        markup::{MarkupDocument, WATERMARK_TOKEN, transform_markup},
        types::TransformOutcome,
        workarea::WorkArea,
    };

    const CHAPTER: &str = concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<!DOCTYPE html>\n",
        "<html xmlns=\"http://www.w3.org/1999/xhtml\">\n",
        "<head><title>Chapter 1</title></head>\n",
        "<body>\n",
        "<p>line one\r\nline two\nline three</p>\n",
        "<div><a href=\"ch02.xhtml\">Next Chapter</a></div>\n",
        "<p>RUBoardSome textRUBoard</p>\n",
        "</body>\n",
        "</html>\n",
    );

    /// Serialization of an unmutated document must not drift from its input
    #[test]
    fn test_serialization_is_byte_stable() {
        let content = concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
            "<!DOCTYPE html>\n",
            "<!-- produced by hand -->\n",
            "<html xmlns=\"http://www.w3.org/1999/xhtml\" lang='en'>\n",
            "<head>\n",
            "  <meta charset=\"utf-8\"/>\n",
            "  <title>Fish &amp; Chips</title>\n",
            "</head>\n",
            "<body class=\"chapter\">\n",
            "  <p>plain text with  double  spaces</p>\n",
            "  <p><![CDATA[raw <data> here]]></p>\n",
            "  <br />\n",
            "</body>\n",
            "</html>\n",
        );

        let document = MarkupDocument::parse("test.xhtml", content).unwrap();
        let bytes = document.to_bytes().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), content);
    }

    /// All token occurrences are removed, even several in one text run
    #[test]
    fn test_watermark_removed_everywhere_in_body() {
        let mut document = MarkupDocument::parse("test.xhtml", CHAPTER).unwrap();
        let removed = document.strip_watermark(WATERMARK_TOKEN);
        assert_eq!(removed, 2);

        let output = String::from_utf8(document.to_bytes().unwrap()).unwrap();
        assert!(!output.contains("RUBoard"));
        assert!(output.contains("<p>Some text</p>"));
    }

    /// The token is only stripped inside the body element
    #[test]
    fn test_watermark_outside_body_is_kept() {
        let content = "<html><head><title>RUBoard</title></head>\
                       <body><p>RUBoard</p></body></html>";
        let mut document = MarkupDocument::parse("test.xhtml", content).unwrap();
        let removed = document.strip_watermark(WATERMARK_TOKEN);
        assert_eq!(removed, 1);

        let output = String::from_utf8(document.to_bytes().unwrap()).unwrap();
        assert!(output.contains("<title>RUBoard</title>"));
        assert!(output.contains("<body><p></p></body>"));
    }

    /// Anchors with Next/Prev text disappear entirely, wherever they nest
    #[test]
    fn test_nav_anchors_are_detached() {
        let content = "<html><body>\
                       <div><span><a href=\"b.xhtml\">Next Chapter</a></span></div>\
                       <a href=\"a.xhtml\">Prev</a>\
                       <a href=\"toc.xhtml\">Table of Contents</a>\
                       </body></html>";
        let mut document = MarkupDocument::parse("test.xhtml", content).unwrap();
        let removed = document.prune_nav_anchors();
        assert_eq!(removed, 2);

        let output = String::from_utf8(document.to_bytes().unwrap()).unwrap();
        assert!(!output.contains("Next Chapter"));
        assert!(!output.contains("Prev"));
        assert!(output.contains("<a href=\"toc.xhtml\">Table of Contents</a>"));
        assert!(output.contains("<div><span></span></div>"));
    }

    /// A root-level anchor has no parent and must survive unchanged
    #[test]
    fn test_root_level_anchor_is_left_untouched() {
        let content = "<a href=\"b.xhtml\">Next</a>";
        let mut document = MarkupDocument::parse("test.xhtml", content).unwrap();
        let removed = document.prune_nav_anchors();
        assert_eq!(removed, 0);

        let output = String::from_utf8(document.to_bytes().unwrap()).unwrap();
        assert_eq!(output, content);
    }

    /// Runs of CR/LF collapse to a single space, other whitespace survives
    #[test]
    fn test_paragraph_reflow() {
        let content = "<html><body><p>line one\r\nline two\nline three</p></body></html>";
        let mut document = MarkupDocument::parse("test.xhtml", content).unwrap();
        let altered = document.reflow_paragraphs();
        assert_eq!(altered, 1);

        let output = String::from_utf8(document.to_bytes().unwrap()).unwrap();
        assert!(output.contains("<p>line one line two line three</p>"));
    }

    /// Only paragraphs that are direct children of body are reflowed
    #[test]
    fn test_reflow_skips_nested_paragraphs() {
        let content = "<html><body>\
                       <p>a\nb</p>\
                       <div><p>c\nd</p></div>\
                       </body></html>";
        let mut document = MarkupDocument::parse("test.xhtml", content).unwrap();
        let altered = document.reflow_paragraphs();
        assert_eq!(altered, 1);

        let output = String::from_utf8(document.to_bytes().unwrap()).unwrap();
        assert!(output.contains("<p>a b</p>"));
        assert!(output.contains("<div><p>c\nd</p></div>"));
    }

    /// Re-running the transform on its own output changes nothing
    #[test]
    fn test_transform_is_idempotent() {
        let work = WorkArea::new().unwrap();
        work.write("ch01.xhtml", CHAPTER.as_bytes()).unwrap();

        let outcome = transform_markup(&work, "ch01.xhtml");
        assert!(matches!(outcome, TransformOutcome::Modified));
        let once = work.read("ch01.xhtml").unwrap();

        let outcome = transform_markup(&work, "ch01.xhtml");
        assert!(matches!(outcome, TransformOutcome::Unchanged));
        let twice = work.read("ch01.xhtml").unwrap();

        assert_eq!(once, twice);
    }

    /// A document needing no changes is reported unchanged and not rewritten
    #[test]
    fn test_clean_document_is_unchanged() {
        let content = "<html><body><p>nothing to do here</p></body></html>";
        let work = WorkArea::new().unwrap();
        work.write("ch01.xhtml", content.as_bytes()).unwrap();

        let outcome = transform_markup(&work, "ch01.xhtml");
        assert!(matches!(outcome, TransformOutcome::Unchanged));
        assert_eq!(work.read("ch01.xhtml").unwrap(), content.as_bytes());
    }

    /// Malformed markup fails the entry without touching its payload
    #[test]
    fn test_malformed_markup_is_a_parse_failure() {
        let content = "<html><body><p>unclosed";
        let work = WorkArea::new().unwrap();
        work.write("broken.xhtml", content.as_bytes()).unwrap();

        let outcome = transform_markup(&work, "broken.xhtml");
        match outcome {
            TransformOutcome::Failed(err) => {
                assert!(err.to_string().starts_with("Markup parse error:"));
            }
            _ => panic!("expected a failed outcome"),
        }
        assert_eq!(work.read("broken.xhtml").unwrap(), content.as_bytes());
    }

    /// Entity references round-trip and do not confuse the transforms
    #[test]
    fn test_entity_references_survive() {
        let content = "<html><body><p>Fish &amp; Chips\nRUBoard&#160;end</p></body></html>";
        let work = WorkArea::new().unwrap();
        work.write("ch01.xhtml", content.as_bytes()).unwrap();

        let outcome = transform_markup(&work, "ch01.xhtml");
        assert!(matches!(outcome, TransformOutcome::Modified));

        let output = String::from_utf8(work.read("ch01.xhtml").unwrap()).unwrap();
        assert_eq!(
            output,
            "<html><body><p>Fish &amp; Chips &#160;end</p></body></html>"
        );
    }
}
