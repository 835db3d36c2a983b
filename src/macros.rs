#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Declares a rule table for one `(locale, modality, domain)` triple.
///
/// Each entry carries the rule name, a style (the fourth constraint axis), a
/// structural query, optional extra boolean constraints, and the textual
/// action grammar. Declaration order determines rank.
#[macro_export]
macro_rules! rule_set {
    (
        locale: $locale:literal,
        modality: $modality:literal,
        domain: $domain:literal,
        rules: [
            $( {
                name: $name:literal,
                $(style: $style:literal,)?
                query: $query:literal
                $(, cstr: [ $($cstr:literal),* $(,)? ])?
                , action: $action:literal
                $(,)?
            } ),* $(,)?
        ] $(,)?
    ) => {{
        $crate::rules::RuleSet {
            locale: $locale,
            modality: $modality,
            domain: $domain,
            defs: vec![
                $( $crate::rules::RuleDef {
                    name: $name,
                    style: { let mut _s = "default"; $( _s = $style; )? _s },
                    query: $query,
                    cstr: &[ $($($cstr),*)? ],
                    action: $action,
                } ),*
            ],
        }
    }};
}
