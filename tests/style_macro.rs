//! `style!` expansions checked against the serializer.
#![cfg(feature = "macros")]

use gilt_cssinjs::css::{parse_style, ParseConfig};
use gilt_cssinjs::{style, CssObject, Interpolation};
use pretty_assertions::assert_eq;

fn css(object: CssObject) -> String {
    parse_style(&Interpolation::from(object), &ParseConfig::default()).css
}

#[test]
fn literal_object() {
    let object = style! {
        ".box" {
            font-size: 14;
            border: 1px solid #1677ff;
            line-height: 1.5;
            "&:hover" { opacity: 0.8; }
        }
    };
    insta::assert_snapshot!(
        css(object),
        @".box{font-size:14px;border:1px solid #1677ff;line-height:1.5;}.box:hover{opacity:0.8;}"
    );
}

#[test]
fn expressions_and_negative_numbers() {
    let color = String::from("#5c21ff");
    let object = style! {
        ".a" {
            color: (color.as_str());
            margin-top: -2;
        }
    };
    assert_eq!(css(object), ".a{color:#5c21ff;margin-top:-2px;}");
}

#[test]
fn matches_builder_output() {
    let from_macro = style! { ".a" { color: red; } };
    let built = CssObject::new().nest(".a", CssObject::new().prop("color", "red"));
    assert_eq!(css(from_macro), css(built));
}
