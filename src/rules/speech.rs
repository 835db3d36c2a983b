//! English speech rules.
//!
//! `default_rules` is the baseline wording; `clearmath_rules` is a second
//! domain with more explicit phrasing, including a `verbose` style variant.

use super::RuleSet;

pub(super) fn default_rules() -> RuleSet {
    rule_set! {
        locale: "en",
        modality: "speech",
        domain: "default",
        rules: [
            {
                name: "number",
                query: "self::number",
                action: r#"[t] text() (annotation:number)"#,
            },
            {
                name: "identifier",
                query: "self::identifier",
                action: r#"[t] text()"#,
            },
            {
                name: "fraction",
                query: "self::fraction",
                action: r#"[t] "the fraction"; [n] children/*[1] (pitch:0.3); [t] "over"; [n] children/*[2] (pitch:0.3); [p] (pause:400)"#,
            },
            {
                name: "fraction-vulgar",
                query: r#"self::fraction[@role="vulgar"]"#,
                action: r#"[n] children/*[1]; [t] "over"; [n] children/*[2]"#,
            },
            {
                name: "superscript",
                query: "self::superscript",
                action: r#"[n] children/*[1]; [t] "super"; [n] children/*[2] (pitch:0.35); [p] (pause:300)"#,
            },
            {
                name: "sqrt",
                query: "self::sqrt",
                action: r#"[t] "square root of" (pitch:0.3); [n] children/*[1]; [p] (pause:200)"#,
            },
            {
                name: "relseq",
                query: "self::relseq",
                action: r#"[m] children/* (sepFunc:CTXFcontentIterator)"#,
            },
            {
                name: "sequence",
                query: "self::sequence",
                action: r#"[m] children/* (ctxtFunc:CTXFnodeCounter, context:"item", pause:200)"#,
            },
            {
                name: "punctuated",
                query: "self::punctuated",
                action: r#"[m] children/* (sepFunc:CTXFpauseSeparator, separator:"short")"#,
            },
            {
                name: "matrix",
                query: "self::matrix",
                action: r#"[t] "matrix"; [m] children/* (ctxtFunc:CTXFnodeCounter, context:"row", pause:200)"#,
            },
            {
                name: "row",
                query: "self::row",
                action: r#"[m] children/* (ctxtFunc:CTXFnodeCounter, context:"column", pause:100)"#,
            },
            {
                name: "cell",
                query: "self::cell",
                action: r#"[m] children/*"#,
            },
        ],
    }
}

pub(super) fn clearmath_rules() -> RuleSet {
    rule_set! {
        locale: "en",
        modality: "speech",
        domain: "clearmath",
        rules: [
            {
                name: "fraction",
                query: "self::fraction",
                action: r#"[n] children/*[1]; [t] "divided by"; [n] children/*[2]"#,
            },
            {
                name: "fraction",
                style: "verbose",
                query: "self::fraction",
                action: r#"[t] "the fraction with numerator"; [n] children/*[1]; [t] "and denominator"; [n] children/*[2]"#,
            },
            {
                name: "superscript",
                query: "self::superscript",
                action: r#"[n] children/*[1]; [t] "to the power"; [n] children/*[2]"#,
            },
        ],
    }
}
