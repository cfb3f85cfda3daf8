// Package cache provides the facade admission policies.

use rand::rngs::OsRng;
use rand::Rng;

use crate::config::{AdmissionKind, Config};

/// AdmissionPolicy gates every write before it reaches an engine.
/// The closed set of variants is dispatched by match, and the frequency
/// gate of the W-TinyLFU engine runs separately after this one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdmissionPolicy {
    Always,
    Never,
    Probabilistic(f64),
}

impl AdmissionPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        match cfg.admission_policy {
            AdmissionKind::Always => Self::Always,
            AdmissionKind::Never => Self::Never,
            AdmissionKind::Probabilistic => Self::Probabilistic(cfg.admission_probability),
        }
    }

    /// Decides whether a write may proceed. The probabilistic variant
    /// draws from the operating system's entropy source and admits when
    /// the draw lands below the configured probability.
    pub fn admit(&self) -> bool {
        match *self {
            Self::Always => true,
            Self::Never => false,
            Self::Probabilistic(p) => {
                if p <= 0.0 {
                    return false;
                }
                if p >= 1.0 {
                    return true;
                }
                OsRng.gen::<f64>() < p
            }
        }
    }
}
