use crate::mesh::{ElementType, Mesh};

/// Structured mesh generator for tests and demos
pub struct MeshGenerator;

impl MeshGenerator {
    /// Rectangle `[0, lx] x [0, ly]` split into `2 * nx * ny` triangles
    ///
    /// Node `(i, j)` has index `j * (nx + 1) + i`. Triangles are counter-clockwise.
    pub fn rectangle_tri(nx: usize, ny: usize, lx: f64, ly: f64) -> Mesh {
        let dx = lx / nx as f64;
        let dy = ly / ny as f64;

        let mut positions = Vec::with_capacity((nx + 1) * (ny + 1) * 2);
        for j in 0..=ny {
            for i in 0..=nx {
                positions.push(i as f64 * dx);
                positions.push(j as f64 * dy);
            }
        }

        let node = |i: usize, j: usize| j * (nx + 1) + i;
        let mut tris = Vec::with_capacity(nx * ny * 6);
        for j in 0..ny {
            for i in 0..nx {
                tris.extend_from_slice(&[node(i, j), node(i + 1, j), node(i + 1, j + 1)]);
                tris.extend_from_slice(&[node(i, j), node(i + 1, j + 1), node(i, j + 1)]);
            }
        }

        Mesh::from_parts(2, positions, ElementType::Tri3, tris)
    }

    /// Box `[0, lx] x [0, ly] x [0, lz]`, each cell split into 6 tetrahedra
    ///
    /// Uses the Kuhn subdivision around the main cell diagonal so that faces
    /// of neighboring cells match. All tetrahedra are positively oriented.
    pub fn cube_tet(nx: usize, ny: usize, nz: usize, lx: f64, ly: f64, lz: f64) -> Mesh {
        let (dx, dy, dz) = (lx / nx as f64, ly / ny as f64, lz / nz as f64);

        let mut positions = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1) * 3);
        for k in 0..=nz {
            for j in 0..=ny {
                for i in 0..=nx {
                    positions.push(i as f64 * dx);
                    positions.push(j as f64 * dy);
                    positions.push(k as f64 * dz);
                }
            }
        }

        let node = |i: usize, j: usize, k: usize| (k * (ny + 1) + j) * (nx + 1) + i;
        // axis orderings of the six Kuhn paths from corner 000 to 111
        let paths = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        let mut tets = Vec::with_capacity(nx * ny * nz * 24);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    for path in &paths {
                        let mut c = [i, j, k];
                        let mut tet = [node(i, j, k), 0, 0, node(i + 1, j + 1, k + 1)];
                        for (step, &axis) in path.iter().take(2).enumerate() {
                            c[axis] += 1;
                            tet[step + 1] = node(c[0], c[1], c[2]);
                        }
                        if signed_volume(&positions, &tet) < 0.0 {
                            tet.swap(1, 2);
                        }
                        tets.extend_from_slice(&tet);
                    }
                }
            }
        }

        Mesh::from_parts(3, positions, ElementType::Tet4, tets)
    }
}

fn signed_volume(positions: &[f64], tet: &[usize; 4]) -> f64 {
    let p = |n: usize, d: usize| positions[tet[n] * 3 + d];
    let a = [p(1, 0) - p(0, 0), p(1, 1) - p(0, 1), p(1, 2) - p(0, 2)];
    let b = [p(2, 0) - p(0, 0), p(2, 1) - p(0, 1), p(2, 2) - p(0, 2)];
    let c = [p(3, 0) - p(0, 0), p(3, 1) - p(0, 1), p(3, 2) - p(0, 2)];
    (a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
        + a[2] * (b[0] * c[1] - b[1] * c[0]))
        / 6.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangle_counts() {
        let mesh = MeshGenerator::rectangle_tri(4, 3, 1.0, 1.0);
        assert_eq!(mesh.num_nodes(), 20);
        assert_eq!(mesh.num_elements(), 24);
    }

    #[test]
    fn test_cube_volume() {
        let mesh = MeshGenerator::cube_tet(2, 2, 2, 1.0, 2.0, 3.0);
        assert_eq!(mesh.num_nodes(), 27);
        assert_eq!(mesh.num_elements(), 48);

        let mut total = 0.0;
        for elem in mesh.element_iter() {
            let tet = [elem[0], elem[1], elem[2], elem[3]];
            let vol = signed_volume(mesh.positions(), &tet);
            assert!(vol > 0.0);
            total += vol;
        }
        assert_relative_eq!(total, 6.0, epsilon = 1e-12);
    }
}
