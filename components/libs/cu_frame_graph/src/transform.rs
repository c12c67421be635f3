use cu29_clock::CuTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;

/// 6x6 covariance over (x, y, z, roll, pitch, yaw).
pub type Covariance = [[f64; 6]; 6];

/// The spatial relationship carried by an edge of the graph: where the target frame
/// sits in the source frame.
/// This is a plain value holder, it does not compose nor invert.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub translation: [f64; 3],
    /// Unit quaternion as (x, y, z, w).
    #[serde(default = "identity_rotation")]
    pub rotation: [f64; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covariance: Option<Covariance>,
    /// Time of validity, if the transform is not static.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<CuTime>,
}

fn identity_rotation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: identity_rotation(),
            covariance: None,
            time: None,
        }
    }

    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            translation: [x, y, z],
            ..Self::identity()
        }
    }

    pub fn with_rotation(mut self, rotation: [f64; 4]) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_covariance(mut self, covariance: Covariance) -> Self {
        self.covariance = Some(covariance);
        self
    }

    pub fn with_time(mut self, time: CuTime) -> Self {
        self.time = Some(time);
        self
    }

    pub fn is_static(&self) -> bool {
        self.time.is_none()
    }
}

impl Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z] = self.translation;
        let [qx, qy, qz, qw] = self.rotation;
        if let Some(time) = self.time {
            write!(f, "{time} ")?;
        }
        // {:?} prints every significant digit, and "1.0" rather than "1"
        write!(
            f,
            "t: ({x:?} {y:?} {z:?}) r: ({qx:?} {qy:?} {qz:?} {qw:?})"
        )
    }
}
