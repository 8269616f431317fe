//! Serde helpers that keep non-finite floats intact.
//!
//! `serde_json` writes NaN and infinities as `null`, which then fails to
//! deserialize into `f64`. Rows that reached storage with such values must
//! still export verbatim, so finite values stay JSON numbers and the rest
//! are written as the strings `"NaN"`, `"+Inf"` and `"-Inf"`.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

const NAN: &str = "NaN";
const POS_INF: &str = "+Inf";
const NEG_INF: &str = "-Inf";

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Number(f64),
    Special(String),
}

/// `#[serde(with = "lossless")]` for a single `f64`.
pub mod lossless {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_sign_positive() {
            serializer.serialize_str(POS_INF)
        } else {
            serializer.serialize_str(NEG_INF)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Special(s) => match s.as_str() {
                NAN => Ok(f64::NAN),
                POS_INF => Ok(f64::INFINITY),
                NEG_INF => Ok(f64::NEG_INFINITY),
                other => Err(de::Error::invalid_value(
                    de::Unexpected::Str(other),
                    &"a number, \"NaN\", \"+Inf\" or \"-Inf\"",
                )),
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct Lossless(#[serde(with = "lossless")] f64);

/// `#[serde(with = "lossless_vec")]` for a `Vec<f64>`.
pub mod lossless_vec {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| Lossless(*v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Lossless>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "super::lossless")]
        x: f64,
        #[serde(with = "super::lossless_vec")]
        v: Vec<f64>,
    }

    #[test]
    fn finite_values_stay_numbers() {
        let json = serde_json::to_string(&Sample { x: 1.5, v: vec![0.0, -2.0] }).unwrap();
        assert_eq!(json, r#"{"x":1.5,"v":[0.0,-2.0]}"#);
    }

    #[test]
    fn non_finite_values_survive() {
        let sample = Sample {
            x: f64::NAN,
            v: vec![f64::INFINITY, 3.0, f64::NEG_INFINITY],
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(json, r#"{"x":"NaN","v":["+Inf",3.0,"-Inf"]}"#);

        let back: Sample = serde_json::from_str(&json).unwrap();
        assert!(back.x.is_nan());
        assert_eq!(back.v[0], f64::INFINITY);
        assert_eq!(back.v[1], 3.0);
        assert_eq!(back.v[2], f64::NEG_INFINITY);
    }

    #[test]
    fn integers_parse_as_floats() {
        let back: Sample = serde_json::from_str(r#"{"x":2,"v":[1]}"#).unwrap();
        assert_eq!(back.x, 2.0);
        assert_eq!(back.v, vec![1.0]);
    }

    #[test]
    fn unknown_strings_are_rejected() {
        assert!(serde_json::from_str::<Sample>(r#"{"x":"big","v":[]}"#).is_err());
    }
}
