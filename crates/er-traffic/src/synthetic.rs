//! Seeded synthetic training data.
//!
//! Samples draw calendar, weather, route and incident fields at random and
//! derive the target multiplier from them:
//!
//! | Condition                         | Factor       |
//! |-----------------------------------|--------------|
//! | rush hour                         | U(1.5, 2.5)  |
//! | night (not rush hour)             | U(0.7, 0.9)  |
//! | rain                              | U(1.2, 1.8)  |
//! | rain intensity > 5                | U(1.3, 2.0)  |
//! | weekend, not rush hour            | U(0.8, 1.1)  |
//! | holiday                           | U(0.6, 0.9)  |
//! | major incident                    | U(1.5, 2.5)  |
//! | accident, no major incident       | U(1.2, 1.6)  |
//! | construction                      | U(1.1, 1.4)  |
//! | noise                             | U(0.9, 1.1)  |
//!
//! `historical_traffic_ratio` is a noisy copy of the time-of-day factor
//! only.  Copying the full target into it would let every model read the
//! answer straight off one feature.

use er_core::{ContextualInfo, SeededRng};

use crate::features::FeatureVector;
use crate::{TrafficError, TrafficResult};

#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub features: Vec<FeatureVector>,
    pub targets: Vec<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Shuffled train / evaluation partition.
#[derive(Clone, Debug, Default)]
pub struct Split {
    pub train: Dataset,
    pub eval: Dataset,
}

/// Generate `n` samples.  Identical `(n, seed)` gives identical data.
pub fn generate(n: usize, seed: u64) -> Dataset {
    let mut rng = SeededRng::new(seed);
    let mut data = Dataset {
        features: Vec::with_capacity(n),
        targets: Vec::with_capacity(n),
    };
    for _ in 0..n {
        let (fv, target) = sample(&mut rng);
        data.features.push(fv);
        data.targets.push(target);
    }
    data
}

fn sample(rng: &mut SeededRng) -> (FeatureVector, f64) {
    let hour = rng.gen_range(0..24u32) as f64;
    let day_of_week = rng.gen_range(0..7u8);
    let month = rng.gen_range(1..=12u8);
    let is_holiday = rng.gen_bool(0.05);
    let calendar = ContextualInfo::from_parts(hour, day_of_week, month, is_holiday);

    let mut fv = FeatureVector::default();
    fv.set_calendar(&calendar);

    fv.temperature = rng.normal(25.0, 8.0);
    fv.humidity = rng.uniform(40.0, 90.0);
    fv.pressure = rng.normal(1013.0, 10.0);
    fv.is_raining = rng.gen_bool(0.2);
    fv.rain_intensity = if fv.is_raining { rng.exponential(2.0) } else { 0.0 };
    fv.visibility = if fv.is_raining { rng.uniform(5.0, 10.0) } else { 10.0 };
    fv.wind_speed = rng.exponential(3.0);
    fv.temp_trend = rng.normal(0.0, 1.0);
    fv.rain_forecast_6h = fv.is_raining || rng.gen_bool(0.1);

    fv.distance_km = rng.uniform(2.0, 25.0);
    fv.duration_normal_min = fv.distance_km * rng.uniform(2.0, 4.0);

    fv.num_accidents = rng.poisson(0.1);
    fv.num_construction = rng.poisson(0.05);
    fv.major_incident_nearby = fv.num_accidents > 0 && rng.gen_bool(0.3);

    let time_factor = if fv.is_rush_hour {
        rng.uniform(1.5, 2.5)
    } else if fv.is_night {
        rng.uniform(0.7, 0.9)
    } else {
        1.0
    };
    let mut m = time_factor;
    if fv.is_raining {
        m *= rng.uniform(1.2, 1.8);
        if fv.rain_intensity > 5.0 {
            m *= rng.uniform(1.3, 2.0);
        }
    }
    if fv.is_weekend && !fv.is_rush_hour {
        m *= rng.uniform(0.8, 1.1);
    }
    if fv.is_holiday {
        m *= rng.uniform(0.6, 0.9);
    }
    if fv.major_incident_nearby {
        m *= rng.uniform(1.5, 2.5);
    } else if fv.num_accidents > 0 {
        m *= rng.uniform(1.2, 1.6);
    }
    if fv.num_construction > 0 {
        m *= rng.uniform(1.1, 1.4);
    }
    m *= rng.uniform(0.9, 1.1);

    fv.historical_traffic_ratio = time_factor * rng.uniform(0.9, 1.1);
    (fv, m)
}

/// Shuffle with `seed` and hold out `round(len * test_fraction)` rows
/// (at least one of each side).
pub fn train_test_split(data: &Dataset, test_fraction: f64, seed: u64) -> TrafficResult<Split> {
    let n = data.len();
    if data.targets.len() != n {
        return Err(TrafficError::ShapeMismatch {
            what: "dataset targets",
            expected: n,
            got: data.targets.len(),
        });
    }
    if n < 2 {
        return Err(TrafficError::Training(format!("cannot split {n} rows")));
    }
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(TrafficError::Training(format!("test fraction {test_fraction} outside [0, 1)")));
    }

    let mut order: Vec<usize> = (0..n).collect();
    SeededRng::new(seed).shuffle(&mut order);
    let n_eval = ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1);

    let mut split = Split::default();
    for (k, &i) in order.iter().enumerate() {
        let side = if k < n_eval { &mut split.eval } else { &mut split.train };
        side.features.push(data.features[i].clone());
        side.targets.push(data.targets[i]);
    }
    Ok(split)
}
