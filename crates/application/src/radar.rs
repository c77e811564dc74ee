//! Radar Area Scorer
//!
//! A score vector is drawn as a polygon with vertex `i` at angle `2πi/n` and
//! radius `score[i]`; its shoelace area summarises the vector. Reported
//! scores are areas relative to a reference polygon, in percent.

use audio_ifeval_domain::{round_to, MetricRecord};
use indexmap::IndexMap;
use std::f64::consts::PI;
use tracing::{debug, instrument, warn};

use crate::RadarError;

/// Rescaling applied before the vertices are placed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RadarScale {
    /// Use the scores as radii
    #[default]
    Raw,
    /// Divide by the vector's own maximum
    OwnMax,
    /// Divide by a fixed maximum
    Max(f64),
}

impl RadarScale {
    fn apply(&self, values: &[f64]) -> Result<Vec<f64>, RadarError> {
        let max = match self {
            Self::Raw => return Ok(values.to_vec()),
            Self::OwnMax => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Max(max) => *max,
        };
        if max == 0.0 {
            return Err(RadarError::ZeroMaxValue);
        }
        Ok(values.iter().map(|v| v / max).collect())
    }
}

/// Area of the radar polygon; zero for fewer than three scores.
pub fn polygon_area(values: &[f64], scale: RadarScale) -> Result<f64, RadarError> {
    let n = values.len();
    if n < 3 {
        return Ok(0.0);
    }
    let radii = scale.apply(values)?;
    let points: Vec<(f64, f64)> = radii
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let theta = 2.0 * PI * i as f64 / n as f64;
            (r * theta.cos(), r * theta.sin())
        })
        .collect();

    let twice_area: f64 = (0..n)
        .map(|i| {
            let (x0, y0) = points[i];
            let (x1, y1) = points[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum();
    Ok(0.5 * twice_area.abs())
}

/// `area / reference * 100`, one decimal.
pub fn area_ratio(area: f64, reference: f64) -> Result<f64, RadarError> {
    if reference == 0.0 {
        return Err(RadarError::ZeroReferenceArea);
    }
    Ok(round_to(area / reference * 100.0, 1))
}

/// Values of `labels` in order; `None` if any is missing or not applicable.
pub fn radar_vector(record: &MetricRecord, labels: &[String]) -> Option<Vec<f64>> {
    labels.iter().map(|label| record.value(label)).collect()
}

/// Scores a set of vectors against one reference polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarAreaScorer {
    reference: Vec<f64>,
    scale: RadarScale,
    reference_area: Result<f64, RadarError>,
}

impl RadarAreaScorer {
    /// Scorer with an explicit reference vector and scale.
    pub fn new(reference: Vec<f64>, scale: RadarScale) -> Self {
        let reference_area = polygon_area(&reference, scale);
        Self {
            reference,
            scale,
            reference_area,
        }
    }

    /// Raw IFR vectors: every label at 100, both sides divided by 100.
    pub fn ifr(labels: usize) -> Self {
        Self::new(vec![100.0; labels], RadarScale::Max(100.0))
    }

    /// Normalised vectors: every label at 1, no rescale.
    pub fn normalized(labels: usize) -> Self {
        Self::new(vec![1.0; labels], RadarScale::Raw)
    }

    /// Area of the reference polygon.
    pub fn reference_area(&self) -> Result<f64, RadarError> {
        self.reference_area
    }

    /// Relative area of one vector.
    pub fn score(&self, values: &[f64]) -> Result<f64, RadarError> {
        if values.len() != self.reference.len() {
            warn!(
                expected = self.reference.len(),
                got = values.len(),
                "Vector length differs from the reference"
            );
        }
        area_ratio(polygon_area(values, self.scale)?, self.reference_area?)
    }

    /// Relative areas of many vectors, keeping their order.
    #[instrument(skip(self, vectors), fields(models = vectors.len()))]
    pub fn score_all(&self, vectors: &IndexMap<String, Vec<f64>>) -> Result<IndexMap<String, f64>, RadarError> {
        let reference = self.reference_area?;
        let mut out = IndexMap::with_capacity(vectors.len());
        for (model, values) in vectors {
            let score = area_ratio(polygon_area(values, self.scale)?, reference)?;
            debug!(model = %model, score, "Area computed");
            out.insert(model.clone(), score);
        }
        Ok(out)
    }
}
