//! JSON encoding of floats that keeps non-finite values.
//!
//! JSON has no literal for NaN or the infinities: `serde_json` writes them
//! as `null` and cannot read `null` back as an `f64`. Finite values stay
//! plain numbers here, non-finite ones are written as the strings `"NaN"`,
//! `"inf"` and `"-inf"`.
//!
//! Used through `#[serde(with = "crate::float")]` on single values and
//! `#[serde(with = "crate::float::vec")]` on float columns.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Repr {
    Finite(f64),
    NonFinite(NonFinite),
}

#[derive(Clone, Copy, Serialize, Deserialize)]
enum NonFinite {
    #[serde(rename = "NaN")]
    Nan,
    #[serde(rename = "inf")]
    Infinity,
    #[serde(rename = "-inf")]
    NegInfinity,
}

impl From<f64> for Repr {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Self::NonFinite(NonFinite::Nan)
        } else if value.is_infinite() {
            if value.is_sign_positive() {
                Self::NonFinite(NonFinite::Infinity)
            } else {
                Self::NonFinite(NonFinite::NegInfinity)
            }
        } else {
            Self::Finite(value)
        }
    }
}

impl From<Repr> for f64 {
    fn from(repr: Repr) -> Self {
        match repr {
            Repr::Finite(value) => value,
            Repr::NonFinite(NonFinite::Nan) => Self::NAN,
            Repr::NonFinite(NonFinite::Infinity) => Self::INFINITY,
            Repr::NonFinite(NonFinite::NegInfinity) => Self::NEG_INFINITY,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    Repr::from(*value).serialize(serializer)
}

pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Repr::deserialize(deserializer).map(f64::from)
}

/// The same encoding for a whole float column.
pub(crate) mod vec {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Repr;

    pub(crate) fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|&value| Repr::from(value)))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<f64>, D::Error> {
        Vec::<Repr>::deserialize(deserializer)
            .map(|values| values.into_iter().map(f64::from).collect())
    }
}
