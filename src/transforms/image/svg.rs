// src/transforms/image/svg.rs

//! Structural SVG clean-up on a `quick-xml` event stream.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::pipeline::TransformError;

const EDITOR_PREFIXES: [&[u8]; 2] = [b"inkscape:", b"sodipodi:"];

/// Drop declarations, comments, `<metadata>`, editor elements and
/// attributes, and whitespace-only text between tags.
///
/// Whitespace inside `<text>` is content and is kept. With
/// `preserve_viewbox = false`, a root `viewBox` that only repeats the
/// `width`/`height` of the element is dropped as well. Malformed markup is a
/// codec failure.
pub fn optimize(svg: &str, preserve_viewbox: bool) -> Result<String, TransformError> {
    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Vec::with_capacity(svg.len()));
    let mut skipped_depth = 0usize;
    let mut text_depth = 0usize;
    let mut seen_root = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            TransformError::codec(format!(
                "malformed svg at byte {}: {e}",
                reader.error_position()
            ))
        })?;
        match event {
            Event::Eof => break,
            Event::Decl(_) | Event::DocType(_) | Event::Comment(_) | Event::PI(_) => {}
            Event::Start(tag) => {
                if skipped_depth > 0 || is_dropped_element(&tag) {
                    skipped_depth += 1;
                    continue;
                }
                if tag.name().as_ref() == b"text" {
                    text_depth += 1;
                }
                let drop_viewbox = !preserve_viewbox && !seen_root && redundant_viewbox(&tag);
                seen_root = true;
                write(&mut writer, Event::Start(clean_tag(&tag, drop_viewbox)?))?;
            }
            Event::Empty(tag) => {
                if skipped_depth > 0 || is_dropped_element(&tag) {
                    continue;
                }
                let drop_viewbox = !preserve_viewbox && !seen_root && redundant_viewbox(&tag);
                seen_root = true;
                write(&mut writer, Event::Empty(clean_tag(&tag, drop_viewbox)?))?;
            }
            Event::End(tag) => {
                if skipped_depth > 0 {
                    skipped_depth -= 1;
                    continue;
                }
                if tag.name().as_ref() == b"text" {
                    text_depth = text_depth.saturating_sub(1);
                }
                write(&mut writer, Event::End(tag))?;
            }
            Event::Text(text) => {
                if skipped_depth > 0 {
                    continue;
                }
                if text_depth == 0 && text.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                write(&mut writer, Event::Text(text))?;
            }
            other => {
                if skipped_depth == 0 {
                    write(&mut writer, other)?;
                }
            }
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| TransformError::codec(format!("svg output is not UTF-8: {e}")))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), TransformError> {
    writer
        .write_event(event)
        .map_err(|e| TransformError::codec(format!("writing svg: {e}")))
}

fn is_editor_name(name: &[u8]) -> bool {
    EDITOR_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

fn is_dropped_element(tag: &BytesStart<'_>) -> bool {
    let name = tag.name();
    name.as_ref() == b"metadata" || is_editor_name(name.as_ref())
}

fn is_editor_attr(key: &[u8]) -> bool {
    is_editor_name(key) || matches!(key, b"xmlns:inkscape" | b"xmlns:sodipodi")
}

/// Copy `tag` without editor attributes (and without `viewBox` if asked).
fn clean_tag(tag: &BytesStart<'_>, drop_viewbox: bool) -> Result<BytesStart<'static>, TransformError> {
    let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    for attr in tag.attributes() {
        let attr = attr.map_err(|e| TransformError::codec(format!("malformed svg attribute: {e}")))?;
        let key = attr.key.as_ref();
        if is_editor_attr(key) || (drop_viewbox && key == b"viewBox") {
            continue;
        }
        out.push_attribute(attr);
    }
    Ok(out)
}

/// `viewBox="0 0 W H"` on an element whose `width`/`height` are `W`/`H`.
fn redundant_viewbox(tag: &BytesStart<'_>) -> bool {
    let attr = |name: &str| -> Option<String> {
        tag.try_get_attribute(name)
            .ok()
            .flatten()
            .map(|a| String::from_utf8_lossy(&a.value).into_owned())
    };
    let (Some(width), Some(height), Some(view_box)) = (attr("width"), attr("height"), attr("viewBox"))
    else {
        return false;
    };
    let numbers: Vec<&str> = view_box.split([' ', ',']).filter(|s| !s.is_empty()).collect();
    numbers == ["0", "0", width.trim_end_matches("px"), height.trim_end_matches("px")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ErrorKind;

    const INKSCAPE: &str = r##"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!-- Created with Inkscape -->
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape" xmlns:sodipodi="http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd" width="24" height="24" viewBox="0 0 24 24" inkscape:version="1.2">
  <metadata>
    <rdf:RDF/>
  </metadata>
  <sodipodi:namedview id="nv" pagecolor="#ffffff">
    <inkscape:page x="0" y="0"/>
  </sodipodi:namedview>
  <g inkscape:label="Layer 1" id="layer1">
    <path d="M0 0h24v24H0z" fill="red"/>
  </g>
</svg>
"##;

    #[test]
    fn strips_editor_cruft_and_keeps_viewbox() {
        let out = optimize(INKSCAPE, true).unwrap();
        assert_eq!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24"><g id="layer1"><path d="M0 0h24v24H0z" fill="red"/></g></svg>"#
        );
        assert!(out.len() < INKSCAPE.len());
    }

    #[test]
    fn redundant_viewbox_can_be_dropped() {
        let out = optimize(INKSCAPE, false).unwrap();
        assert!(!out.contains("viewBox"));
        assert!(out.contains(r#"width="24""#));
    }

    #[test]
    fn non_trivial_viewbox_is_kept_even_when_allowed_to_drop() {
        let svg = r#"<svg width="10" height="10" viewBox="5 5 10 10"></svg>"#;
        assert_eq!(optimize(svg, false).unwrap(), svg);
    }

    #[test]
    fn nested_editor_elements_are_removed_whole() {
        let svg = r#"<svg><sodipodi:namedview id="nv"><inkscape:grid type="xygrid"></inkscape:grid></sodipodi:namedview><rect/></svg>"#;
        assert_eq!(optimize(svg, true).unwrap(), "<svg><rect/></svg>");
    }

    #[test]
    fn whitespace_between_text_spans_survives() {
        let svg = "<svg>\n  <text x=\"0\"><tspan>Hello</tspan> <tspan>world</tspan></text>\n</svg>";
        assert_eq!(
            optimize(svg, true).unwrap(),
            "<svg><text x=\"0\"><tspan>Hello</tspan> <tspan>world</tspan></text></svg>"
        );
    }

    #[test]
    fn escaped_content_is_written_back_unchanged() {
        let svg = r#"<svg><title>a &amp; b</title><g data-x="1 &lt; 2"/></svg>"#;
        assert_eq!(optimize(svg, true).unwrap(), svg);
    }

    #[test]
    fn mismatched_tags_are_a_codec_failure() {
        let err = optimize("<svg><g></svg>", true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Codec);
    }
}
