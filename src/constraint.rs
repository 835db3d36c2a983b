//! Constraint model.
//!
//! An output preference is a tuple of axis values — locale, modality, domain,
//! style — in that fixed order. Rules are registered under a concrete
//! [`DynamicConstraint`]; at lookup time the engine widens the request into
//! per-axis value sets ([`DynamicProperties`]) and ranks candidate rules with
//! a [`Comparator`] built from the active request.
//!
//! The comparator orders by distance from the reference on earlier axes
//! before later axes; on each axis an exact match beats a fallback-set match,
//! which beats a mismatch. The fixed degradation order (domain, then
//! modality, then locale) is enforced by the engine's constraint update, not
//! here; this module only supplies the primitives.

use std::cmp::Ordering;

use crate::{Result, SynthesisError};

/// One dimension of the output preference tuple. The order of the variants
/// is the fixed axis order shared by all constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Locale,
    Modality,
    Domain,
    Style,
}

impl Axis {
    pub const ORDER: [Axis; 4] = [Axis::Locale, Axis::Modality, Axis::Domain, Axis::Style];

    pub fn name(&self) -> &'static str {
        match self {
            Axis::Locale => "locale",
            Axis::Modality => "modality",
            Axis::Domain => "domain",
            Axis::Style => "style",
        }
    }

    pub fn from_name(name: &str) -> Option<Axis> {
        Axis::ORDER.into_iter().find(|a| a.name() == name)
    }

    pub fn default_value(&self) -> &'static str {
        match self {
            Axis::Locale => "en",
            Axis::Modality => "speech",
            Axis::Domain => "default",
            Axis::Style => "default",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// A concrete assignment across all axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicConstraint {
    values: [String; 4],
    /// When set, a single axis value is treated as colon-separated
    /// alternatives (locale-preference variants).
    preference: bool,
}

impl DynamicConstraint {
    pub fn new(locale: &str, modality: &str, domain: &str, style: &str) -> DynamicConstraint {
        DynamicConstraint {
            values: [locale.to_string(), modality.to_string(), domain.to_string(), style.to_string()],
            preference: false,
        }
    }

    /// Parse a dotted constraint string, e.g. `en.speech.default.default`.
    pub fn parse(input: &str) -> Result<DynamicConstraint> {
        let parts: Vec<&str> = input.split('.').collect();
        if parts.len() != Axis::ORDER.len() {
            return Err(SynthesisError::RuleSyntax(format!(
                "dynamic constraint needs {} axis values: {input}",
                Axis::ORDER.len()
            )));
        }
        Ok(DynamicConstraint::new(parts[0], parts[1], parts[2], parts[3]))
    }

    pub fn defaults() -> DynamicConstraint {
        DynamicConstraint::new(
            Axis::Locale.default_value(),
            Axis::Modality.default_value(),
            Axis::Domain.default_value(),
            Axis::Style.default_value(),
        )
    }

    pub fn value(&self, axis: Axis) -> &str {
        &self.values[axis.index()]
    }

    pub fn set_value(&mut self, axis: Axis, value: &str) {
        self.values[axis.index()] = value.to_string();
    }

    pub fn set_preference(&mut self, preference: bool) {
        self.preference = preference;
    }

    pub fn preference(&self) -> bool {
        self.preference
    }

    /// Axis values in axis order (the trie path of a rule).
    pub fn ordered_values(&self) -> [&str; 4] {
        [
            self.value(Axis::Locale),
            self.value(Axis::Modality),
            self.value(Axis::Domain),
            self.value(Axis::Style),
        ]
    }
}

impl std::fmt::Display for DynamicConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.values.join("."))
    }
}

/// Per-axis ordered value sets used for fallback. Earlier entries are
/// preferred; the engine appends the axis default unless running strict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicProperties {
    values: [Vec<String>; 4],
}

impl DynamicProperties {
    pub fn new() -> DynamicProperties {
        DynamicProperties::default()
    }

    pub fn set(&mut self, axis: Axis, values: Vec<String>) {
        self.values[axis.index()] = values;
    }

    pub fn get(&self, axis: Axis) -> &[String] {
        &self.values[axis.index()]
    }

    /// Value sets in axis order, as consumed by the trie lookup.
    pub fn ordered(&self) -> [&[String]; 4] {
        [
            self.get(Axis::Locale),
            self.get(Axis::Modality),
            self.get(Axis::Domain),
            self.get(Axis::Style),
        ]
    }
}

/// Orders candidate constraints against a reference request.
#[derive(Debug, Clone)]
pub struct Comparator {
    reference: DynamicConstraint,
    fallback: DynamicProperties,
}

impl Comparator {
    pub fn new(reference: DynamicConstraint, fallback: DynamicProperties) -> Comparator {
        Comparator { reference, fallback }
    }

    /// True when every axis value of `candidate` is allowed by the
    /// reference: either equal to the reference value or contained in the
    /// fallback set for that axis.
    pub fn matches(&self, candidate: &DynamicConstraint) -> bool {
        Axis::ORDER.into_iter().all(|axis| {
            let value = candidate.value(axis);
            value == self.reference.value(axis)
                || self.fallback.get(axis).iter().any(|v| v == value)
        })
    }

    /// Compare two candidates. `Ordering::Less` means `a` is the better
    /// match. Earlier axes dominate later axes; on each axis, equality with
    /// the reference beats position in the fallback set, which beats a
    /// mismatch.
    pub fn compare(&self, a: &DynamicConstraint, b: &DynamicConstraint) -> Ordering {
        let mut ignore = false;
        for axis in Axis::ORDER {
            let value1 = a.value(axis);
            let value2 = b.value(axis);
            if !ignore {
                let reference = self.reference.value(axis);
                if reference == value1 && reference != value2 {
                    return Ordering::Less;
                }
                if reference == value2 && reference != value1 {
                    return Ordering::Greater;
                }
                if reference == value1 && reference == value2 {
                    continue;
                }
                ignore = true;
            }
            // Position in the fallback set; missing values sort first, as in
            // the observed behavior this port preserves.
            let position = |value: &str| -> i64 {
                self.fallback
                    .get(axis)
                    .iter()
                    .position(|v| v == value)
                    .map(|p| p as i64)
                    .unwrap_or(-1)
            };
            match position(value1).cmp(&position(value2)) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(locale: &[&str], modality: &[&str], domain: &[&str], style: &[&str]) -> DynamicProperties {
        let mut p = DynamicProperties::new();
        let to_vec = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        p.set(Axis::Locale, to_vec(locale));
        p.set(Axis::Modality, to_vec(modality));
        p.set(Axis::Domain, to_vec(domain));
        p.set(Axis::Style, to_vec(style));
        p
    }

    #[test]
    fn parse_round_trips() {
        let cstr = DynamicConstraint::parse("en.braille.default.ordinal").unwrap();
        assert_eq!(cstr.value(Axis::Modality), "braille");
        assert_eq!(cstr.to_string(), "en.braille.default.ordinal");
    }

    #[test]
    fn parse_rejects_short_constraints() {
        assert!(DynamicConstraint::parse("en.speech").is_err());
    }

    #[test]
    fn exact_match_beats_fallback() {
        let reference = DynamicConstraint::parse("en.speech.clearmath.verbose").unwrap();
        let comparator = Comparator::new(
            reference,
            props(&["en"], &["speech"], &["clearmath", "default"], &["verbose", "default"]),
        );
        let exact = DynamicConstraint::parse("en.speech.clearmath.verbose").unwrap();
        let fallback = DynamicConstraint::parse("en.speech.clearmath.default").unwrap();
        assert_eq!(comparator.compare(&exact, &fallback), Ordering::Less);
        assert_eq!(comparator.compare(&fallback, &exact), Ordering::Greater);
        assert_eq!(comparator.compare(&exact, &exact), Ordering::Equal);
    }

    #[test]
    fn earlier_axes_dominate() {
        // A style hit on the wrong domain loses to a domain hit with default
        // style: the domain axis comes first.
        let reference = DynamicConstraint::parse("en.speech.clearmath.verbose").unwrap();
        let comparator = Comparator::new(
            reference,
            props(&["en"], &["speech"], &["clearmath", "default"], &["verbose", "default"]),
        );
        let domain_hit = DynamicConstraint::parse("en.speech.clearmath.default").unwrap();
        let style_hit = DynamicConstraint::parse("en.speech.default.verbose").unwrap();
        assert_eq!(comparator.compare(&domain_hit, &style_hit), Ordering::Less);
    }

    #[test]
    fn match_requires_membership_per_axis() {
        let reference = DynamicConstraint::parse("en.speech.default.default").unwrap();
        let comparator =
            Comparator::new(reference, props(&["en"], &["speech"], &["default"], &["default"]));
        assert!(comparator.matches(&DynamicConstraint::parse("en.speech.default.default").unwrap()));
        assert!(!comparator.matches(&DynamicConstraint::parse("fr.speech.default.default").unwrap()));
    }
}
