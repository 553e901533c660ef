// Domain services shared by the sync pipeline and the CLI commands

pub mod distribution;

pub use distribution::{DistributionAreaCalculator, ZoneRule};
