// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Internal module providing handy function

macro_rules! from_err {
    ($from:ty, $to:tt, $var:tt) => {
        impl From<$from> for $to {
            fn from(e: $from) -> $to {
                $to::$var(e)
            }
        }
    };
}

/// Reads an OOXML boolean attribute value (`1`, `0`, `true`, `false`)
pub(crate) fn parse_bool(v: &[u8]) -> Option<bool> {
    match v {
        b"1" | b"true" => Some(true),
        b"0" | b"false" => Some(false),
        _ => None,
    }
}

/// Parses a finite float the way Excel writes it in xml attributes
pub(crate) fn parse_f64(v: &[u8]) -> Option<f64> {
    fast_float2::parse::<f64, _>(v).ok()
}
