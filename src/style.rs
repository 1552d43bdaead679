// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Differential formats and the styles pivot formatting rules attach to

use std::fmt;
use std::sync::Arc;

/// Color representation
///
/// Represents the different ways colors can be specified in Excel files.
///
/// # References
///
/// - ECMA-376 Part 1, Section 18.8.3 (color)
#[derive(Debug, Clone, PartialEq)]
pub enum Color {
    /// RGB color
    Rgb {
        /// Red component (0-255)
        r: u8,
        /// Green component (0-255)
        g: u8,
        /// Blue component (0-255)
        b: u8,
    },
    /// ARGB color (with alpha)
    Argb {
        /// Alpha component (0-255, where 255 is opaque)
        a: u8,
        /// Red component (0-255)
        r: u8,
        /// Green component (0-255)
        g: u8,
        /// Blue component (0-255)
        b: u8,
    },
    /// Theme color reference
    Theme {
        /// Theme color index (0-based)
        theme: u32,
        /// Tint adjustment (-1.0 to 1.0)
        tint: Option<f64>,
    },
    /// Indexed color
    Indexed(u32),
    /// Automatic color
    Auto,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Rgb { r, g, b } => write!(f, "#{r:02X}{g:02X}{b:02X}"),
            Color::Argb { a, r, g, b } => write!(f, "#{a:02X}{r:02X}{g:02X}{b:02X}"),
            Color::Theme { theme, tint: None } => write!(f, "theme({theme})"),
            Color::Theme {
                theme,
                tint: Some(t),
            } => write!(f, "theme({theme}, {t})"),
            Color::Indexed(i) => write!(f, "indexed({i})"),
            Color::Auto => write!(f, "auto"),
        }
    }
}

/// Differential formatting record (`<dxf>` in `xl/styles.xml`)
///
/// These are the reusable style definitions pivot table formats point
/// to through their `dxfId`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifferentialFormat {
    /// Font changes
    pub font: Option<DifferentialFont>,
    /// Fill changes
    pub fill: Option<DifferentialFill>,
    /// Border changes
    pub border: Option<DifferentialBorder>,
    /// Number format
    pub number_format: Option<DifferentialNumberFormat>,
    /// Alignment changes
    pub alignment: Option<DifferentialAlignment>,
    /// Protection changes
    pub protection: Option<DifferentialProtection>,
}

/// Differential font formatting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifferentialFont {
    /// Font name
    pub name: Option<String>,
    /// Font size
    pub size: Option<f64>,
    /// Bold
    pub bold: Option<bool>,
    /// Italic
    pub italic: Option<bool>,
    /// Underline
    pub underline: Option<bool>,
    /// Strike through
    pub strike: Option<bool>,
    /// Font color
    pub color: Option<Color>,
}

/// Differential fill formatting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifferentialFill {
    /// Pattern type
    pub pattern_type: Option<String>,
    /// Foreground color
    pub fg_color: Option<Color>,
    /// Background color
    pub bg_color: Option<Color>,
}

/// Differential border formatting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifferentialBorder {
    /// Left border
    pub left: Option<DifferentialBorderSide>,
    /// Right border
    pub right: Option<DifferentialBorderSide>,
    /// Top border
    pub top: Option<DifferentialBorderSide>,
    /// Bottom border
    pub bottom: Option<DifferentialBorderSide>,
    /// Diagonal border
    pub diagonal: Option<DifferentialBorderSide>,
}

/// Border side for differential formatting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifferentialBorderSide {
    /// Border style
    pub style: Option<String>,
    /// Border color
    pub color: Option<Color>,
}

/// Differential number format
#[derive(Debug, Clone, PartialEq)]
pub struct DifferentialNumberFormat {
    /// Format code
    pub format_code: String,
    /// Format ID
    pub num_fmt_id: Option<u32>,
}

/// Differential alignment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifferentialAlignment {
    /// Horizontal alignment
    pub horizontal: Option<String>,
    /// Vertical alignment
    pub vertical: Option<String>,
    /// Wrap text
    pub wrap_text: Option<bool>,
    /// Indent
    pub indent: Option<u32>,
}

/// Differential protection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifferentialProtection {
    /// Locked
    pub locked: Option<bool>,
    /// Hidden
    pub hidden: Option<bool>,
}

/// Style applied to an area of a pivot table
///
/// Only the parts a pivot format can carry are kept: font, fill, border
/// and number format. The default style changes nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    /// Font
    pub font: Option<Arc<DifferentialFont>>,
    /// Fill
    pub fill: Option<Arc<DifferentialFill>>,
    /// Border
    pub border: Option<Arc<DifferentialBorder>>,
    /// Number format
    pub number_format: Option<Arc<DifferentialNumberFormat>>,
}

impl Style {
    /// Builds a style out of a differential format
    pub fn from_differential(dxf: &DifferentialFormat) -> Self {
        Style {
            font: dxf.font.clone().map(Arc::new),
            fill: dxf.fill.clone().map(Arc::new),
            border: dxf.border.clone().map(Arc::new),
            number_format: dxf.number_format.clone().map(Arc::new),
        }
    }

    /// Does this style change anything
    pub fn is_default(&self) -> bool {
        self.font.is_none()
            && self.fill.is_none()
            && self.border.is_none()
            && self.number_format.is_none()
    }
}
