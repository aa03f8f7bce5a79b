//! Mock sensor packets
//!
//! A packet carries a measured pole angle and cart position, written as
//! `"<theta>, <x>"`. Injecting one overwrites the simulated state and
//! zeroes both velocities, which seeds a scenario from a single reading.

use std::str::FromStr;

use thiserror::Error;

use crate::StateVector;

/// Packet parse errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PacketError {
    #[error("expected 2 comma-separated fields, got {0}")]
    FieldCount(usize),
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
}

/// Measured pole angle and cart position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorPacket {
    /// Pole angle [rad]
    pub theta: f64,
    /// Cart position [m]
    pub x: f64,
}

impl SensorPacket {
    pub fn new(theta: f64, x: f64) -> Self {
        Self { theta, x }
    }

    /// State with the measured positions and zero velocities
    pub fn to_state(&self) -> StateVector {
        StateVector::new(self.theta, 0.0, self.x, 0.0)
    }
}

impl FromStr for SensorPacket {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        if fields.len() != 2 {
            return Err(PacketError::FieldCount(fields.len()));
        }

        let parse = |field: &str| -> Result<f64, PacketError> {
            field
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| PacketError::InvalidNumber(field.to_string()))
        };

        Ok(Self {
            theta: parse(fields[0])?,
            x: parse(fields[1])?,
        })
    }
}
