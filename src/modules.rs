pub(crate) mod catalog;
pub(crate) mod prediction;
pub(crate) mod ratelimit;
pub(crate) mod scheduler;
pub(crate) mod stats;
pub(crate) mod trackers;
pub(crate) mod tracking;
