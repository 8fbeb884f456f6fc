mod aabb;
mod bounding_sphere;
mod collision_pair;
mod convex_support;
mod manifold;
mod quaternion;
mod ray;
mod simplex;

pub use aabb::*;
pub use bounding_sphere::*;
pub use collision_pair::*;
pub use convex_support::*;
pub use manifold::*;
pub use quaternion::*;
pub use ray::*;
pub use simplex::*;

#[cfg(test)]
mod manifold_tests;
