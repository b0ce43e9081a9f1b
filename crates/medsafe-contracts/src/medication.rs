//! Medication entries and sig (dose/frequency/route) normalization.
//!
//! A `Medication` carries the name exactly as supplied. Whether two entries
//! are "the same drug" is decided by the name resolver, never by comparing
//! these structs directly.

use serde::{Deserialize, Serialize};

/// One medication as it appears on a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    /// Name exactly as supplied (brand, generic, or free text).
    #[serde(default, deserialize_with = "crate::lenient::text")]
    pub name: String,
    /// Canonical generic name, filled in by the name resolver.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::lenient::string")]
    pub normalized_name: Option<String>,
    /// External code such as an RxNorm CUI.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::lenient::string")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::lenient::string")]
    pub dose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::lenient::string")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::lenient::string")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::lenient::string")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::lenient::string")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::lenient::string")]
    pub end_date: Option<String>,
    /// Which list this entry came from, e.g. `home`, `discharge`.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::lenient::string")]
    pub source: Option<String>,
}

impl Medication {
    /// Convenience constructor with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style dose setter.
    pub fn with_dose(mut self, dose: impl Into<String>, unit: impl Into<String>) -> Self {
        self.dose = Some(dose.into());
        self.unit = Some(unit.into());
        self
    }

    pub fn with_frequency(mut self, frequency: impl Into<String>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// True if dose amount and unit are equivalent.
    ///
    /// Numeric doses compare numerically ("500" == "500.0"); anything else
    /// compares case-insensitively after trimming. Units compare after
    /// synonym folding ("milligrams" == "mg").
    pub fn same_dose(&self, other: &Medication) -> bool {
        let dose_equal = match (self.dose.as_deref(), other.dose.as_deref()) {
            (None, None) => true,
            (Some(a), Some(b)) => match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                (Ok(x), Ok(y)) => (x - y).abs() < 1e-9,
                _ => a.trim().eq_ignore_ascii_case(b.trim()),
            },
            _ => false,
        };
        let unit_equal = self.unit.as_deref().map(normalize_unit)
            == other.unit.as_deref().map(normalize_unit);
        dose_equal && unit_equal
    }

    pub fn parsed_frequency(&self) -> Option<Frequency> {
        self.frequency.as_deref().map(Frequency::parse)
    }

    pub fn parsed_route(&self) -> Option<Route> {
        self.route.as_deref().map(Route::parse)
    }
}

/// Fold common unit spellings onto one abbreviation.
pub fn normalize_unit(unit: &str) -> String {
    let u = unit.trim().to_lowercase();
    match u.as_str() {
        "milligram" | "milligrams" | "mgs" => "mg".to_string(),
        "microgram" | "micrograms" | "mcg" | "ug" | "µg" => "mcg".to_string(),
        "gram" | "grams" | "gm" => "g".to_string(),
        "milliliter" | "milliliters" | "millilitre" | "millilitres" => "ml".to_string(),
        "unit" | "units" | "iu" => "units".to_string(),
        _ => u,
    }
}

/// Dosing frequency after folding sig abbreviations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    OnceDaily,
    TwiceDaily,
    ThreeTimesDaily,
    FourTimesDaily,
    EveryHours(u32),
    AtBedtime,
    Weekly,
    AsNeeded,
    Other(String),
}

impl Frequency {
    pub fn parse(s: &str) -> Self {
        let f = s.trim().to_lowercase().replace('.', "");
        let f = f.split_whitespace().collect::<Vec<_>>().join(" ");
        match f.as_str() {
            "qd" | "od" | "daily" | "once daily" | "once a day" | "1x daily" | "every day"
            | "qam" | "every morning" => Frequency::OnceDaily,
            "bid" | "twice daily" | "twice a day" | "2x daily" | "every 12 hours" | "q12h" => {
                Frequency::TwiceDaily
            }
            "tid" | "three times daily" | "three times a day" | "3x daily" | "every 8 hours"
            | "q8h" => Frequency::ThreeTimesDaily,
            "qid" | "four times daily" | "four times a day" | "4x daily" | "every 6 hours"
            | "q6h" => Frequency::FourTimesDaily,
            "qhs" | "hs" | "at bedtime" | "nightly" | "every night" => Frequency::AtBedtime,
            "weekly" | "once weekly" | "qw" | "qweek" | "once a week" => Frequency::Weekly,
            "prn" | "as needed" | "when required" => Frequency::AsNeeded,
            other => Self::parse_interval(other).unwrap_or_else(|| Frequency::Other(other.to_string())),
        }
    }

    /// `q4h` / `every 4 hours`.
    fn parse_interval(f: &str) -> Option<Self> {
        let hours = if let Some(rest) = f.strip_prefix('q').and_then(|r| r.strip_suffix('h')) {
            rest.parse::<u32>().ok()?
        } else {
            let rest = f.strip_prefix("every ")?;
            let rest = rest
                .strip_suffix(" hours")
                .or_else(|| rest.strip_suffix(" hrs"))
                .or_else(|| rest.strip_suffix(" hour"))?;
            rest.trim().parse::<u32>().ok()?
        };
        (hours > 0).then_some(Frequency::EveryHours(hours))
    }

    /// Scheduled doses per day, where that is well defined.
    pub fn doses_per_day(&self) -> Option<f64> {
        match self {
            Frequency::OnceDaily | Frequency::AtBedtime => Some(1.0),
            Frequency::TwiceDaily => Some(2.0),
            Frequency::ThreeTimesDaily => Some(3.0),
            Frequency::FourTimesDaily => Some(4.0),
            Frequency::EveryHours(h) => Some(24.0 / f64::from(*h)),
            Frequency::Weekly => Some(1.0 / 7.0),
            Frequency::AsNeeded | Frequency::Other(_) => None,
        }
    }
}

/// Route of administration after folding abbreviations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Oral,
    Intravenous,
    Intramuscular,
    Subcutaneous,
    Topical,
    Inhaled,
    Sublingual,
    Rectal,
    Transdermal,
    Other(String),
}

impl Route {
    pub fn parse(s: &str) -> Self {
        let r = s.trim().to_lowercase().replace('.', "");
        match r.as_str() {
            "po" | "oral" | "by mouth" | "orally" => Route::Oral,
            "iv" | "intravenous" | "intravenously" => Route::Intravenous,
            "im" | "intramuscular" => Route::Intramuscular,
            "sc" | "sq" | "subq" | "subcut" | "subcutaneous" => Route::Subcutaneous,
            "top" | "topical" | "topically" => Route::Topical,
            "inh" | "inhaled" | "inhalation" | "neb" => Route::Inhaled,
            "sl" | "sublingual" => Route::Sublingual,
            "pr" | "rectal" => Route::Rectal,
            "td" | "transdermal" | "patch" => Route::Transdermal,
            _ => Route::Other(r),
        }
    }
}
