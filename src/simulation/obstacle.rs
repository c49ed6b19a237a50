use thiserror::Error;

use crate::math::{normalize_or, right_perpendicular, Vec2};

#[derive(Debug, Error)]
pub enum ObstacleError {
    #[error("Obstacle endpoints must be finite")]
    NonFiniteEndpoint,

    #[error("Obstacle endpoints coincide at ({}, {})", .0.x, .0.y)]
    ZeroLength(Vec2),
}

/// A static line segment particles bounce off.
///
/// Everything derived from the endpoints is computed once on construction,
/// the segment never changes afterwards.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LineObstacle {
    start: Vec2,
    end: Vec2,
    direction: Vec2,
    length: f32,
    normal: Vec2,
}

impl LineObstacle {
    pub fn new(start: Vec2, end: Vec2) -> Result<Self, ObstacleError> {
        let finite = |v: Vec2| v.x.is_finite() && v.y.is_finite();
        if !finite(start) || !finite(end) {
            return Err(ObstacleError::NonFiniteEndpoint);
        }

        let span = end - start;
        let length = span.norm();
        if length <= f32::EPSILON {
            return Err(ObstacleError::ZeroLength(start));
        }
        let direction = span / length;

        Ok(Self {
            start,
            end,
            direction,
            length,
            normal: right_perpendicular(direction),
        })
    }

    pub fn start(&self) -> Vec2 {
        self.start
    }

    pub fn end(&self) -> Vec2 {
        self.end
    }

    /// Unit vector from `start` toward `end`.
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    /// The static unit normal, `(-direction.y, direction.x)`.
    pub fn normal(&self) -> Vec2 {
        self.normal
    }

    /// The point on the segment closest to `point`.
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        let projection = (point - self.start)
            .dot(&self.direction)
            .max(0.0)
            .min(self.length);
        self.start + self.direction * projection
    }

    /// Test a circle against the segment, padded by `half_thickness`.
    ///
    /// Returns the contact normal pointing from the segment toward the
    /// circle's center. When the center sits exactly on the segment there is
    /// no such direction and the static normal is used instead.
    pub fn check_collision(
        &self,
        center: Vec2,
        radius: f32,
        half_thickness: f32,
    ) -> Option<Vec2> {
        let offset = center - self.closest_point(center);
        let reach = radius + half_thickness;
        if offset.norm_squared() < reach * reach {
            Some(normalize_or(offset, self.normal))
        } else {
            None
        }
    }
}
