// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::io::BufRead;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;

use crate::style::{
    Color, DifferentialAlignment, DifferentialBorder, DifferentialBorderSide, DifferentialFill,
    DifferentialFont, DifferentialFormat, DifferentialNumberFormat, DifferentialProtection,
};
use crate::utils::{parse_bool, parse_f64};
use crate::xlsx::{buf_xml_reader, XlsxError};

/// Reads the differential formats (`<dxfs>`) of a styles part
///
/// Formats keep their document order, the position of a format being the
/// `dxfId` other parts refer to.
pub fn read_dxfs<B: BufRead>(reader: B) -> Result<Vec<DifferentialFormat>, XlsxError> {
    parse_styles(&mut buf_xml_reader(reader))
}

pub(crate) fn parse_styles<B: BufRead>(
    xml: &mut XmlReader<B>,
) -> Result<Vec<DifferentialFormat>, XlsxError> {
    let mut dxfs = Vec::new();
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"styleSheet" => (),
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"dxfs" => {
                dxfs = parse_dxfs(xml)?;
            }
            Ok(Event::Start(ref e)) => {
                let mut temp_buf = Vec::new();
                xml.read_to_end_into(e.name(), &mut temp_buf)?;
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"styleSheet" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(dxfs)
}

fn parse_dxfs<B: BufRead>(xml: &mut XmlReader<B>) -> Result<Vec<DifferentialFormat>, XlsxError> {
    let mut dxfs = Vec::new();
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"dxf" => {
                dxfs.push(parse_dxf(xml)?);
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"dxfs" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("dxfs")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(dxfs)
}

fn parse_dxf<B: BufRead>(xml: &mut XmlReader<B>) -> Result<DifferentialFormat, XlsxError> {
    let mut dxf = DifferentialFormat::default();
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"font" => dxf.font = Some(parse_font(xml)?),
                b"fill" => dxf.fill = Some(parse_fill(xml)?),
                b"border" => dxf.border = Some(parse_border(xml)?),
                b"numFmt" => {
                    let mut format = DifferentialNumberFormat {
                        format_code: String::new(),
                        num_fmt_id: None,
                    };
                    for a in e.attributes() {
                        match a.map_err(XlsxError::XmlAttr)? {
                            Attribute {
                                key: k,
                                value: v,
                            } if k.local_name().as_ref() == b"numFmtId" => {
                                format.num_fmt_id = atoi_simd::parse::<u32>(&v).ok();
                            }
                            a if a.key.local_name().as_ref() == b"formatCode" => {
                                format.format_code =
                                    a.decode_and_unescape_value(xml.decoder())?.into_owned();
                            }
                            _ => (),
                        }
                    }
                    dxf.number_format = Some(format);
                }
                b"alignment" => {
                    let mut alignment = DifferentialAlignment::default();
                    for a in e.attributes() {
                        let a = a.map_err(XlsxError::XmlAttr)?;
                        match a.key.local_name().as_ref() {
                            b"horizontal" => {
                                alignment.horizontal = Some(xml.decoder().decode(&a.value)?.into_owned())
                            }
                            b"vertical" => {
                                alignment.vertical = Some(xml.decoder().decode(&a.value)?.into_owned())
                            }
                            b"wrapText" => alignment.wrap_text = parse_bool(&a.value),
                            b"indent" => alignment.indent = atoi_simd::parse::<u32>(&a.value).ok(),
                            _ => (),
                        }
                    }
                    dxf.alignment = Some(alignment);
                }
                b"protection" => {
                    let mut protection = DifferentialProtection::default();
                    for a in e.attributes() {
                        let a = a.map_err(XlsxError::XmlAttr)?;
                        match a.key.local_name().as_ref() {
                            b"locked" => protection.locked = parse_bool(&a.value),
                            b"hidden" => protection.hidden = parse_bool(&a.value),
                            _ => (),
                        }
                    }
                    dxf.protection = Some(protection);
                }
                _ => {
                    let mut temp_buf = Vec::new();
                    xml.read_to_end_into(e.name(), &mut temp_buf)?;
                }
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"dxf" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("dxf")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(dxf)
}

/// Reads the `val` attribute of a font property, `<b/>` meaning `<b val="1"/>`
fn val_flag(e: &BytesStart) -> Result<bool, XlsxError> {
    Ok(match e.try_get_attribute("val")? {
        Some(a) => parse_bool(&a.value).unwrap_or(true),
        None => true,
    })
}

fn parse_font<B: BufRead>(xml: &mut XmlReader<B>) -> Result<DifferentialFont, XlsxError> {
    let mut font = DifferentialFont::default();
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"name" => {
                    if let Some(a) = e.try_get_attribute("val")? {
                        font.name = Some(a.decode_and_unescape_value(xml.decoder())?.into_owned());
                    }
                }
                b"sz" => {
                    if let Some(a) = e.try_get_attribute("val")? {
                        font.size = parse_f64(&a.value);
                    }
                }
                b"b" => font.bold = Some(val_flag(e)?),
                b"i" => font.italic = Some(val_flag(e)?),
                b"strike" => font.strike = Some(val_flag(e)?),
                b"u" => {
                    font.underline = Some(match e.try_get_attribute("val")? {
                        Some(a) => &*a.value != b"none",
                        None => true,
                    })
                }
                b"color" => font.color = parse_color(e)?,
                _ => (),
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"font" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("font")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(font)
}

fn parse_fill<B: BufRead>(xml: &mut XmlReader<B>) -> Result<DifferentialFill, XlsxError> {
    let mut fill = DifferentialFill::default();
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"patternFill" => {
                    if let Some(a) = e.try_get_attribute("patternType")? {
                        fill.pattern_type = Some(xml.decoder().decode(&a.value)?.into_owned());
                    }
                }
                b"fgColor" => fill.fg_color = parse_color(e)?,
                b"bgColor" => fill.bg_color = parse_color(e)?,
                _ => (),
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"fill" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("fill")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(fill)
}

fn parse_border<B: BufRead>(xml: &mut XmlReader<B>) -> Result<DifferentialBorder, XlsxError> {
    let mut border = DifferentialBorder::default();
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let side = match e.local_name().as_ref() {
                    b"left" | b"start" => &mut border.left,
                    b"right" | b"end" => &mut border.right,
                    b"top" => &mut border.top,
                    b"bottom" => &mut border.bottom,
                    b"diagonal" => &mut border.diagonal,
                    _ => {
                        let mut temp_buf = Vec::new();
                        xml.read_to_end_into(e.name(), &mut temp_buf)?;
                        continue;
                    }
                };
                let style = match e.try_get_attribute("style")? {
                    Some(a) => Some(xml.decoder().decode(&a.value)?.into_owned()),
                    None => None,
                };
                *side = Some(DifferentialBorderSide {
                    style,
                    color: parse_border_color(xml, e)?,
                });
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"border" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("border")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(border)
}

/// Reads the optional `color` child of a border side, up to the side's end
fn parse_border_color<B: BufRead>(
    xml: &mut XmlReader<B>,
    side: &BytesStart,
) -> Result<Option<Color>, XlsxError> {
    let mut color = None;
    let mut buf = Vec::with_capacity(64);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"color" => {
                color = parse_color(e)?;
            }
            Ok(Event::End(ref e)) if e.local_name() == side.local_name() => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("border side")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(color)
}

fn parse_hex(v: &[u8]) -> Result<u8, XlsxError> {
    std::str::from_utf8(v)
        .ok()
        .and_then(|s| u8::from_str_radix(s, 16).ok())
        .ok_or_else(|| XlsxError::Unrecognized {
            typ: "color",
            val: String::from_utf8_lossy(v).into_owned(),
        })
}

/// Reads a color out of the attributes of `color`, `fgColor` or `bgColor`
fn parse_color(e: &BytesStart) -> Result<Option<Color>, XlsxError> {
    let mut color = None;
    let mut tint = None;
    for a in e.attributes() {
        let a = a.map_err(XlsxError::XmlAttr)?;
        match a.key.local_name().as_ref() {
            b"rgb" => {
                let v = &*a.value;
                color = match v.len() {
                    6 => Some(Color::Rgb {
                        r: parse_hex(&v[0..2])?,
                        g: parse_hex(&v[2..4])?,
                        b: parse_hex(&v[4..6])?,
                    }),
                    8 => Some(Color::Argb {
                        a: parse_hex(&v[0..2])?,
                        r: parse_hex(&v[2..4])?,
                        g: parse_hex(&v[4..6])?,
                        b: parse_hex(&v[6..8])?,
                    }),
                    _ => {
                        return Err(XlsxError::Unrecognized {
                            typ: "color",
                            val: String::from_utf8_lossy(v).into_owned(),
                        })
                    }
                };
            }
            b"theme" => {
                if let Ok(theme) = atoi_simd::parse::<u32>(&a.value) {
                    color = Some(Color::Theme { theme, tint: None });
                }
            }
            b"indexed" => {
                if let Ok(i) = atoi_simd::parse::<u32>(&a.value) {
                    color = Some(Color::Indexed(i));
                }
            }
            b"auto" if parse_bool(&a.value) == Some(true) => color = Some(Color::Auto),
            b"tint" => tint = parse_f64(&a.value),
            _ => (),
        }
    }
    if let Some(Color::Theme { tint: t, .. }) = color.as_mut() {
        *t = tint;
    }
    Ok(color)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="1"><font><b/><sz val="11"/><name val="Calibri"/></font></fonts>
  <fills count="1"><fill><patternFill patternType="none"/></fill></fills>
  <dxfs count="3">
    <dxf>
      <font><b/><i val="0"/><u/><color rgb="FFFF0000"/></font>
      <numFmt numFmtId="164" formatCode="0.0&quot;%&quot;"/>
    </dxf>
    <dxf>
      <fill><patternFill patternType="solid"><fgColor theme="4" tint="0.39997558519241921"/><bgColor indexed="64"/></patternFill></fill>
      <border><left style="thin"><color auto="1"/></left><bottom style="double"/></border>
    </dxf>
    <dxf>
      <alignment horizontal="center" wrapText="1" indent="2"/>
      <protection locked="0"/>
    </dxf>
  </dxfs>
</styleSheet>"#;

    #[test]
    fn dxfs() {
        let dxfs = read_dxfs(STYLES.as_bytes()).unwrap();
        assert_eq!(dxfs.len(), 3);

        let font = dxfs[0].font.as_ref().unwrap();
        assert_eq!(font.bold, Some(true));
        assert_eq!(font.italic, Some(false));
        assert_eq!(font.underline, Some(true));
        assert_eq!(
            font.color,
            Some(Color::Argb {
                a: 255,
                r: 255,
                g: 0,
                b: 0
            })
        );
        assert_eq!(font.name, None);
        let format = dxfs[0].number_format.as_ref().unwrap();
        assert_eq!(format.num_fmt_id, Some(164));
        assert_eq!(format.format_code, "0.0\"%\"");

        let fill = dxfs[1].fill.as_ref().unwrap();
        assert_eq!(fill.pattern_type.as_deref(), Some("solid"));
        assert!(matches!(
            fill.fg_color,
            Some(Color::Theme {
                theme: 4,
                tint: Some(_)
            })
        ));
        assert_eq!(fill.bg_color, Some(Color::Indexed(64)));
        let border = dxfs[1].border.as_ref().unwrap();
        let left = border.left.as_ref().unwrap();
        assert_eq!(left.style.as_deref(), Some("thin"));
        assert_eq!(left.color, Some(Color::Auto));
        assert_eq!(border.bottom.as_ref().unwrap().color, None);
        assert!(border.top.is_none());

        let alignment = dxfs[2].alignment.as_ref().unwrap();
        assert_eq!(alignment.horizontal.as_deref(), Some("center"));
        assert_eq!(alignment.wrap_text, Some(true));
        assert_eq!(alignment.indent, Some(2));
        assert_eq!(dxfs[2].protection.as_ref().unwrap().locked, Some(false));
    }

    #[test]
    fn no_dxfs() {
        let xml = r#"<styleSheet><fonts count="0"/></styleSheet>"#;
        assert!(read_dxfs(xml.as_bytes()).unwrap().is_empty());
    }
}
