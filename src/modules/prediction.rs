pub(crate) mod predictor;
pub(crate) mod rate;
pub(crate) mod regression;

pub(crate) use predictor::predict;
pub(crate) use rate::{derive_rate, EventRates};
