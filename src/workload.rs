//! Workload Module
//!
//! Source of logical operations for the benchmark driver.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One logical operation: which key, and whether it is a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadOp {
    pub key: u64,
    pub is_read: bool,
}

/// An infinite, non-restartable stream of operations.
pub trait Workload: Send {
    fn next(&mut self) -> WorkloadOp;
}

// == Workload Kind ==
/// YCSB core read/write mixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    /// 50% reads
    YcsbA,
    /// 95% reads
    YcsbB,
    /// read only
    YcsbC,
}

impl WorkloadKind {
    pub fn read_ratio(&self) -> f64 {
        match self {
            WorkloadKind::YcsbA => 0.5,
            WorkloadKind::YcsbB => 0.95,
            WorkloadKind::YcsbC => 1.0,
        }
    }
}

impl FromStr for WorkloadKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "YCSB-A" | "A" => Ok(WorkloadKind::YcsbA),
            "YCSB-B" | "B" => Ok(WorkloadKind::YcsbB),
            "YCSB-C" | "C" => Ok(WorkloadKind::YcsbC),
            other => Err(format!("unknown workload '{}'", other)),
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkloadKind::YcsbA => "YCSB-A",
            WorkloadKind::YcsbB => "YCSB-B",
            WorkloadKind::YcsbC => "YCSB-C",
        };
        f.write_str(name)
    }
}

// == YCSB Workload ==
/// Uniform keys over `[0, key_space)` with the kind's read ratio.
#[derive(Debug, Clone)]
pub struct YcsbWorkload {
    kind: WorkloadKind,
    key_space: u64,
    rng: StdRng,
}

impl YcsbWorkload {
    pub fn new(kind: WorkloadKind, key_space: u64) -> Self {
        Self::with_rng(kind, key_space, StdRng::from_entropy())
    }

    /// Reproducible stream for tests.
    pub fn seeded(kind: WorkloadKind, key_space: u64, seed: u64) -> Self {
        Self::with_rng(kind, key_space, StdRng::seed_from_u64(seed))
    }

    fn with_rng(kind: WorkloadKind, key_space: u64, rng: StdRng) -> Self {
        Self {
            kind,
            key_space: key_space.max(1),
            rng,
        }
    }
}

impl Workload for YcsbWorkload {
    fn next(&mut self) -> WorkloadOp {
        WorkloadOp {
            key: self.rng.gen_range(0..self.key_space),
            is_read: self.rng.gen_bool(self.kind.read_ratio()),
        }
    }
}
