use crate::models::{CollisionManifold3D, ConvexSupport3D, Simplex, SupportPoint};
use crate::utils::{
    add_scaled, add_vectors, cross_product, dot_product, magnitude_squared, negate_vector, normalize_or, perpendicular_vector,
    scale_vector, subtract_vectors, vector_magnitude, PhysicsError, Vector3, ZERO_VECTOR,
};

//==============================================================================
// CONSTANTS
//==============================================================================

pub const DEFAULT_GJK_MAX_ITERATIONS: usize = 32;
pub const DEFAULT_EPA_MAX_ITERATIONS: usize = 48;
pub const MIN_GJK_ITERATIONS: usize = 4;

/// Squared length below which a direction is treated as zero
const EPSILON: f64 = 1e-9;

/// EPA stops once the polytope grows by less than this along the closest face normal
const EPA_TOLERANCE: f64 = 1e-6;

/// Growth relative to the penetration depth that also counts as converged, for curved supports
const EPA_RELATIVE_TOLERANCE: f64 = 1e-4;

/// Relative progress below which the distance query is considered converged
const DISTANCE_TOLERANCE: f64 = 1e-10;

//==============================================================================
// TYPES
//==============================================================================

/// Closest features of two separated convex shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GjkSeparation {
    /// Euclidean gap between the shapes
    pub distance: f64,
    /// Unit direction from shape A toward shape B
    pub normal: Vector3,
    /// Closest point on shape A
    pub point_a: Vector3,
    /// Closest point on shape B
    pub point_b: Vector3,
}

/// A face of the EPA polytope, wound so that `normal` points away from the interior.
#[derive(Debug, Clone, Copy)]
struct EpaFace {
    indices: [usize; 3],
    normal: Vector3,
    distance: f64,
}

/// Gilbert-Johnson-Keerthi queries over support mappings, with EPA penetration recovery.
///
/// The Minkowski difference is taken as `A - B`, so every normal produced here points from A to B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gjk3D {
    max_iterations: usize,
    epa_max_iterations: usize,
}

impl Default for Gjk3D {
    fn default() -> Self {
        Self { max_iterations: DEFAULT_GJK_MAX_ITERATIONS, epa_max_iterations: DEFAULT_EPA_MAX_ITERATIONS }
    }
}

impl Gjk3D {
    /// # Errors
    /// `InvalidArgument` if either budget is below 4.
    pub fn new(max_iterations: usize, epa_max_iterations: usize) -> Result<Self, PhysicsError> {
        if max_iterations < MIN_GJK_ITERATIONS {
            return Err(PhysicsError::invalid_argument(format!(
                "max_iterations must be >= {}, got {}", MIN_GJK_ITERATIONS, max_iterations
            )));
        }
        if epa_max_iterations < MIN_GJK_ITERATIONS {
            return Err(PhysicsError::invalid_argument(format!(
                "epa_max_iterations must be >= {}, got {}", MIN_GJK_ITERATIONS, epa_max_iterations
            )));
        }
        Ok(Self { max_iterations, epa_max_iterations })
    }

    /// Budget already known to be valid; values below the minimum are raised to it.
    pub(crate) fn with_clamped_iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(MIN_GJK_ITERATIONS),
            epa_max_iterations: DEFAULT_EPA_MAX_ITERATIONS,
        }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn epa_max_iterations(&self) -> usize {
        self.epa_max_iterations
    }

    /// True when the shapes overlap. Non-convergence within the budget reports `false`.
    pub fn intersects<A, B>(&self, a: &A, b: &B) -> bool
    where
        A: ConvexSupport3D + ?Sized,
        B: ConvexSupport3D + ?Sized,
    {
        self.run_gjk(a, b).is_some()
    }

    /// Penetration normal (unit, A toward B) and depth for overlapping shapes.
    ///
    /// # Returns
    /// `None` when the shapes are separated or the expansion does not converge.
    pub fn intersects_with_manifold<A, B>(&self, a: &A, b: &B) -> Option<CollisionManifold3D>
    where
        A: ConvexSupport3D + ?Sized,
        B: ConvexSupport3D + ?Sized,
    {
        let simplex = self.run_gjk(a, b)?;
        if simplex.size() < 4 {
            return None;
        }
        epa_penetration(a, b, &simplex, self.epa_max_iterations)
    }

    /// Closest distance between two shapes.
    ///
    /// # Returns
    /// `None` when the shapes touch or overlap; otherwise the gap, the separating normal
    /// and the closest points. Hitting the iteration budget returns the best estimate so far.
    pub fn distance<A, B>(&self, a: &A, b: &B) -> Option<GjkSeparation>
    where
        A: ConvexSupport3D + ?Sized,
        B: ConvexSupport3D + ?Sized,
    {
        let initial = initial_direction(a, b);
        let mut simplex: Vec<SupportPoint> = vec![minkowski_support(a, b, initial)];
        let mut closest = simplex[0].point;
        let mut weights = vec![1.0];

        for _ in 0..self.max_iterations {
            let v_sq = magnitude_squared(closest);
            if v_sq <= EPSILON * EPSILON {
                return None;
            }

            let w = minkowski_support(a, b, negate_vector(closest));
            if v_sq - dot_product(closest, w.point) <= DISTANCE_TOLERANCE * v_sq.max(1.0) {
                break;
            }
            if simplex.iter().any(|p| magnitude_squared(subtract_vectors(p.point, w.point)) <= EPSILON * EPSILON) {
                break;
            }

            simplex.push(w);
            let (point, reduced) = closest_on_simplex(&simplex)?;
            let (kept, kept_weights): (Vec<SupportPoint>, Vec<f64>) =
                reduced.into_iter().map(|(i, weight)| (simplex[i], weight)).unzip();
            simplex = kept;
            weights = kept_weights;
            closest = point;
        }

        let distance = vector_magnitude(closest);
        if distance <= EPSILON {
            return None;
        }
        let mut point_a = ZERO_VECTOR;
        let mut point_b = ZERO_VECTOR;
        for (p, w) in simplex.iter().zip(weights.iter()) {
            point_a = add_scaled(point_a, p.point_a, *w);
            point_b = add_scaled(point_b, p.point_b, *w);
        }
        Some(GjkSeparation {
            distance,
            normal: scale_vector(negate_vector(closest), 1.0 / distance),
            point_a,
            point_b,
        })
    }

    /// Runs the boolean GJK search and returns the enclosing tetrahedron on overlap.
    fn run_gjk<A, B>(&self, a: &A, b: &B) -> Option<Simplex>
    where
        A: ConvexSupport3D + ?Sized,
        B: ConvexSupport3D + ?Sized,
    {
        let mut direction = (1.0, 0.0, 0.0);
        let mut simplex = Simplex::new();

        let first = minkowski_support(a, b, direction);
        simplex.add(first);
        direction = negate_vector(first.point);
        if magnitude_squared(direction) <= EPSILON {
            direction = (0.0, 1.0, 0.0);
        }

        for _ in 0..self.max_iterations {
            let point = minkowski_support(a, b, direction);
            if dot_product(point.point, direction) <= 0.0 {
                return None;
            }
            simplex.add(point);
            if do_simplex(&mut simplex, &mut direction) {
                return Some(simplex);
            }
        }
        None
    }
}

/// Shorthand for `Gjk3D::default().intersects(a, b)`.
pub fn gjk_intersects<A, B>(a: &A, b: &B) -> bool
where
    A: ConvexSupport3D + ?Sized,
    B: ConvexSupport3D + ?Sized,
{
    Gjk3D::default().intersects(a, b)
}

/// Support point of the Minkowski difference `A - B` in the given direction.
pub fn minkowski_support<A, B>(a: &A, b: &B, direction: Vector3) -> SupportPoint
where
    A: ConvexSupport3D + ?Sized,
    B: ConvexSupport3D + ?Sized,
{
    let point_a = a.support(direction);
    let point_b = b.support(negate_vector(direction));
    SupportPoint { point: subtract_vectors(point_a, point_b), point_a, point_b }
}

fn initial_direction<A, B>(a: &A, b: &B) -> Vector3
where
    A: ConvexSupport3D + ?Sized,
    B: ConvexSupport3D + ?Sized,
{
    let d = subtract_vectors(a.center(), b.center());
    if magnitude_squared(d) <= EPSILON {
        (1.0, 0.0, 0.0)
    } else {
        d
    }
}

//==============================================================================
// SIMPLEX EVOLUTION
//==============================================================================

/// Updates the simplex toward the origin. Returns true once a tetrahedron encloses it.
fn do_simplex(simplex: &mut Simplex, direction: &mut Vector3) -> bool {
    match simplex.size() {
        2 => handle_line_case(simplex, direction),
        3 => handle_triangle_case(simplex, direction),
        4 => handle_tetrahedron_case(simplex, direction),
        _ => false,
    }
}

fn triple_product(a: Vector3, b: Vector3, c: Vector3) -> Vector3 {
    cross_product(cross_product(a, b), c)
}

fn direction_toward_origin_from_edge(edge: Vector3, ao: Vector3) -> Vector3 {
    let d = triple_product(edge, ao, edge);
    if magnitude_squared(d) <= EPSILON {
        perpendicular_vector(edge)
    } else {
        d
    }
}

pub fn handle_line_case(simplex: &mut Simplex, direction: &mut Vector3) -> bool {
    let a = simplex.get_a();
    let b = simplex.get_b();
    let ab = subtract_vectors(b.point, a.point);
    let ao = negate_vector(a.point);

    if dot_product(ab, ao) > 0.0 {
        *direction = direction_toward_origin_from_edge(ab, ao);
    } else {
        simplex.set_a(a);
        *direction = ao;
    }
    false
}

pub fn handle_triangle_case(simplex: &mut Simplex, direction: &mut Vector3) -> bool {
    let a = simplex.get_a();
    let b = simplex.get_b();
    let c = simplex.get_c();

    let ab = subtract_vectors(b.point, a.point);
    let ac = subtract_vectors(c.point, a.point);
    let ao = negate_vector(a.point);
    let abc = cross_product(ab, ac);

    if dot_product(cross_product(ab, abc), ao) > 0.0 {
        simplex.set_ab(a, b);
        *direction = direction_toward_origin_from_edge(ab, ao);
        return false;
    }

    if dot_product(cross_product(abc, ac), ao) > 0.0 {
        simplex.set_ab(a, c);
        *direction = direction_toward_origin_from_edge(ac, ao);
        return false;
    }

    if dot_product(abc, ao) > 0.0 {
        *direction = abc;
    } else {
        simplex.set_abc(a, c, b);
        *direction = negate_vector(abc);
    }
    false
}

pub fn handle_tetrahedron_case(simplex: &mut Simplex, direction: &mut Vector3) -> bool {
    let a = simplex.get_a();
    let b = simplex.get_b();
    let c = simplex.get_c();
    let d = simplex.get_d();
    let ao = negate_vector(a.point);

    let faces = [(b, c, d), (c, d, b), (d, b, c)];
    for (p, q, opposite) in faces {
        let normal = outward_normal(a.point, p.point, q.point, opposite.point);
        if dot_product(normal, ao) > 0.0 {
            simplex.set_abc(a, p, q);
            return handle_triangle_case(simplex, direction);
        }
    }
    true
}

fn outward_normal(a: Vector3, b: Vector3, c: Vector3, opposite: Vector3) -> Vector3 {
    let normal = cross_product(subtract_vectors(b, a), subtract_vectors(c, a));
    if dot_product(normal, subtract_vectors(opposite, a)) > 0.0 {
        negate_vector(normal)
    } else {
        normal
    }
}

//==============================================================================
// CLOSEST POINT ON SIMPLEX (distance query)
//==============================================================================

/// Closest point of the simplex hull to the origin with the barycentric weights of the
/// supporting vertices. `None` when the origin lies inside a tetrahedron.
fn closest_on_simplex(points: &[SupportPoint]) -> Option<(Vector3, Vec<(usize, f64)>)> {
    match points.len() {
        1 => Some((points[0].point, vec![(0, 1.0)])),
        2 => Some(closest_on_segment(points, 0, 1)),
        3 => Some(closest_on_triangle(points, 0, 1, 2)),
        _ => closest_on_tetrahedron(points),
    }
}

fn closest_on_segment(points: &[SupportPoint], i: usize, j: usize) -> (Vector3, Vec<(usize, f64)>) {
    let a = points[i].point;
    let ab = subtract_vectors(points[j].point, a);
    let denom = magnitude_squared(ab);
    if denom <= EPSILON * EPSILON {
        return (a, vec![(i, 1.0)]);
    }
    let t = (dot_product(negate_vector(a), ab) / denom).clamp(0.0, 1.0);
    if t <= 0.0 {
        (a, vec![(i, 1.0)])
    } else if t >= 1.0 {
        (points[j].point, vec![(j, 1.0)])
    } else {
        (add_scaled(a, ab, t), vec![(i, 1.0 - t), (j, t)])
    }
}

/// Voronoi-region walk of the triangle `i j k` (Ericson, Real-Time Collision Detection 5.1.5).
fn closest_on_triangle(points: &[SupportPoint], i: usize, j: usize, k: usize) -> (Vector3, Vec<(usize, f64)>) {
    let a = points[i].point;
    let b = points[j].point;
    let c = points[k].point;
    let ab = subtract_vectors(b, a);
    let ac = subtract_vectors(c, a);
    let ap = negate_vector(a);

    let d1 = dot_product(ab, ap);
    let d2 = dot_product(ac, ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (a, vec![(i, 1.0)]);
    }

    let bp = negate_vector(b);
    let d3 = dot_product(ab, bp);
    let d4 = dot_product(ac, bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (b, vec![(j, 1.0)]);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (add_scaled(a, ab, v), vec![(i, 1.0 - v), (j, v)]);
    }

    let cp = negate_vector(c);
    let d5 = dot_product(ab, cp);
    let d6 = dot_product(ac, cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (c, vec![(k, 1.0)]);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (add_scaled(a, ac, w), vec![(i, 1.0 - w), (k, w)]);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        let bc = subtract_vectors(c, b);
        return (add_scaled(b, bc, w), vec![(j, 1.0 - w), (k, w)]);
    }

    let sum = va + vb + vc;
    if sum.abs() <= f64::MIN_POSITIVE {
        // degenerate triangle, fall back to its longest edge
        return closest_on_segment(points, i, j);
    }
    let denom = 1.0 / sum;
    let v = vb * denom;
    let w = vc * denom;
    (add_scaled(add_scaled(a, ab, v), ac, w), vec![(i, 1.0 - v - w), (j, v), (k, w)])
}

fn closest_on_tetrahedron(points: &[SupportPoint]) -> Option<(Vector3, Vec<(usize, f64)>)> {
    let faces = [(0, 1, 2, 3), (0, 1, 3, 2), (0, 2, 3, 1), (1, 2, 3, 0)];
    let mut best: Option<(Vector3, Vec<(usize, f64)>)> = None;
    let mut best_sq = f64::INFINITY;
    let mut outside_any = false;

    for (i, j, k, opposite) in faces {
        let normal = outward_normal(points[i].point, points[j].point, points[k].point, points[opposite].point);
        // origin on the outer side of this face plane
        if dot_product(normal, negate_vector(points[i].point)) > 0.0 {
            outside_any = true;
            let candidate = closest_on_triangle(points, i, j, k);
            let sq = magnitude_squared(candidate.0);
            if sq < best_sq {
                best_sq = sq;
                best = Some(candidate);
            }
        }
    }

    if outside_any {
        best
    } else {
        None
    }
}

//==============================================================================
// EPA
//==============================================================================

fn epa_penetration<A, B>(a: &A, b: &B, simplex: &Simplex, max_iterations: usize) -> Option<CollisionManifold3D>
where
    A: ConvexSupport3D + ?Sized,
    B: ConvexSupport3D + ?Sized,
{
    let mut points: Vec<Vector3> = simplex.points.iter().map(|p| p.point).collect();
    let interior = scale_vector(
        points.iter().fold(ZERO_VECTOR, |acc, p| add_vectors(acc, *p)),
        0.25,
    );

    let mut faces = vec![
        make_face(0, 1, 2, &points, interior),
        make_face(0, 3, 1, &points, interior),
        make_face(0, 2, 3, &points, interior),
        make_face(1, 3, 2, &points, interior),
    ];

    let mut closest = *faces.iter().min_by(|x, y| x.distance.total_cmp(&y.distance))?;
    for _ in 0..max_iterations {
        let support = minkowski_support(a, b, closest.normal).point;
        let support_distance = dot_product(support, closest.normal);
        let tolerance = EPA_TOLERANCE.max(EPA_RELATIVE_TOLERANCE * support_distance.abs());

        if support_distance - closest.distance <= tolerance {
            return face_manifold(&closest, support_distance);
        }

        let support_index = points.len();
        points.push(support);

        let face_count = faces.len();
        let mut boundary: Vec<(usize, usize)> = Vec::new();
        faces.retain(|face| {
            let visible = dot_product(face.normal, subtract_vectors(support, points[face.indices[0]])) > EPSILON;
            if visible {
                let [i, j, k] = face.indices;
                add_boundary_edge(&mut boundary, (i, j));
                add_boundary_edge(&mut boundary, (j, k));
                add_boundary_edge(&mut boundary, (k, i));
            }
            !visible
        });
        if faces.len() == face_count {
            // the polytope cannot grow any further
            return face_manifold(&closest, closest.distance);
        }

        for (from, to) in boundary {
            faces.push(make_face(from, to, support_index, &points, interior));
        }

        closest = *faces.iter().min_by(|x, y| x.distance.total_cmp(&y.distance))?;
    }
    // budget exhausted: the closest face is the best lower bound found
    face_manifold(&closest, closest.distance)
}

fn face_manifold(face: &EpaFace, depth: f64) -> Option<CollisionManifold3D> {
    let normal = normalize_or(face.normal, (1.0, 0.0, 0.0), 1e-12);
    CollisionManifold3D::new(normal, depth.max(0.0)).ok()
}

/// Edges shared by two removed faces cancel out; the rest form the horizon.
fn add_boundary_edge(boundary: &mut Vec<(usize, usize)>, edge: (usize, usize)) {
    if let Some(position) = boundary.iter().position(|&(from, to)| from == edge.1 && to == edge.0) {
        boundary.remove(position);
    } else {
        boundary.push(edge);
    }
}

fn make_face(i: usize, j: usize, k: usize, points: &[Vector3], interior: Vector3) -> EpaFace {
    let a = points[i];
    let normal = cross_product(subtract_vectors(points[j], a), subtract_vectors(points[k], a));
    let mut normal = if magnitude_squared(normal) <= EPSILON * EPSILON {
        (1.0, 0.0, 0.0)
    } else {
        normalize_or(normal, (1.0, 0.0, 0.0), 0.0)
    };
    let mut indices = [i, j, k];
    if dot_product(normal, subtract_vectors(a, interior)) < 0.0 {
        normal = negate_vector(normal);
        indices = [i, k, j];
    }
    EpaFace { indices, normal, distance: dot_product(normal, a).max(0.0) }
}
