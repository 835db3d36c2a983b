//! English braille rules.
//!
//! These rules emit braille cells plus the layout markers the
//! two-dimensional renderer consumes. Leaf text is expected to be braille
//! already; translation tables are out of scope.

use super::RuleSet;

pub(super) fn default_rules() -> RuleSet {
    rule_set! {
        locale: "en",
        modality: "braille",
        domain: "default",
        rules: [
            {
                name: "number",
                query: "self::number",
                action: r#"[t] text()"#,
            },
            {
                name: "identifier",
                query: "self::identifier",
                action: r#"[t] text()"#,
            },
            {
                name: "punctuation",
                query: "self::punctuation",
                action: r#"[t] text() (annotation:punctuation)"#,
            },
            {
                name: "punctuated",
                query: "self::punctuated",
                action: r#"[m] children/*"#,
            },
            {
                name: "fraction",
                query: "self::fraction",
                action: r#"[t] "⠹" (layout:beginfraction); [n] children/*[1] (layout:numerator); [t] "⠌"; [n] children/*[2] (layout:denominator); [t] "⠼" (layout:endfraction)"#,
            },
            {
                name: "relation",
                query: "self::relation",
                action: r#"[t] text() (layout:rel)"#,
            },
            {
                name: "relseq",
                query: "self::relseq",
                action: r#"[m] children/* (sepFunc:CTXFcontentIterator)"#,
            },
            {
                name: "matrix",
                query: "self::matrix",
                action: r#"[m] children/* (layout:matrix)"#,
            },
            {
                name: "table",
                query: "self::table",
                action: r#"[m] children/* (layout:table)"#,
            },
            {
                name: "cases",
                query: "self::cases",
                action: r#"[m] children/* (layout:cases)"#,
            },
            {
                name: "cayley",
                query: "self::cayley",
                action: r#"[m] children/* (layout:cayley)"#,
            },
            {
                name: "row",
                query: "self::row",
                action: r#"[m] children/* (layout:row)"#,
            },
            {
                name: "cell",
                query: "self::cell",
                action: r#"[m] children/* (layout:cell)"#,
            },
        ],
    }
}
