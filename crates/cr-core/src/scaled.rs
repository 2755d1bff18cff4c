//! Magnitudes with an explicit scale keyword.
//!
//! The engine reads a bare number as a base-10 logarithm and a number followed by
//! `linear` as a plain value. User input is parsed into [`ScaledValue`] and
//! re-rendered, so a configuration can never inject extra tokens into a script.

use std::fmt;
use std::str::FromStr;

use crate::numeric::{Real, fmt_real};
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scale {
    #[default]
    Log,
    Linear,
}

impl Scale {
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Linear => "linear",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct ScaledValue {
    pub magnitude: Real,
    pub scale: Scale,
}

impl ScaledValue {
    pub const fn log(magnitude: Real) -> Self {
        Self {
            magnitude,
            scale: Scale::Log,
        }
    }

    pub const fn linear(magnitude: Real) -> Self {
        Self {
            magnitude,
            scale: Scale::Linear,
        }
    }

    /// Base-10 logarithm of the represented quantity, if it has one.
    pub fn log10(&self) -> Option<Real> {
        match self.scale {
            Scale::Log => Some(self.magnitude),
            Scale::Linear if self.magnitude > 0.0 => Some(self.magnitude.log10()),
            Scale::Linear => None,
        }
    }

    pub fn parse(input: &str) -> CoreResult<Self> {
        let invalid = |reason| CoreError::InvalidScaledValue {
            input: input.to_string(),
            reason,
        };

        let mut tokens = input.split_whitespace();
        let magnitude: Real = tokens
            .next()
            .ok_or_else(|| invalid("empty value"))?
            .parse()
            .map_err(|_| invalid("magnitude is not a number"))?;
        if !magnitude.is_finite() {
            return Err(invalid("magnitude is not finite"));
        }

        let scale = match tokens.next() {
            None => Scale::Log,
            Some(word) if word.eq_ignore_ascii_case("linear") => Scale::Linear,
            Some(word) if word.eq_ignore_ascii_case("log") => Scale::Log,
            Some(_) => return Err(invalid("scale keyword must be 'linear' or 'log'")),
        };

        if tokens.next().is_some() {
            return Err(invalid("unexpected trailing tokens"));
        }

        Ok(Self { magnitude, scale })
    }
}

impl FromStr for ScaledValue {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ScaledValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scale {
            Scale::Log => f.write_str(&fmt_real(self.magnitude)),
            Scale::Linear => write!(f, "{} linear", fmt_real(self.magnitude)),
        }
    }
}

impl TryFrom<String> for ScaledValue {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ScaledValue> for String {
    fn from(value: ScaledValue) -> Self {
        value.to_string()
    }
}
