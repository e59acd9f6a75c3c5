use approx::assert_relative_eq;
use femlinsys::{
    linalg::SolverUtils, Error, HasVectorField, MeshGenerator, PhysicsModel, Pbd, SolidLinearEigen, TopologyUpdate,
};

#[test]
fn test_pbd_rigid_translation_is_preserved() {
    let mut pbd = Pbd::with_mesh(MeshGenerator::rectangle_tri(2, 2, 1.0, 1.0)).unwrap();
    pbd.dt = 0.1;
    for ip in 0..pbd.velocity().n_nodes() {
        pbd.velocity_mut().node_mut(ip).copy_from_slice(&[1.0, -0.5]);
    }
    let start = pbd.value().clone();
    for _ in 0..4 {
        pbd.step_time().unwrap();
    }
    for ip in 0..start.n_nodes() {
        assert_relative_eq!(pbd.value().get(ip, 0), start.get(ip, 0) + 0.4, epsilon = 1e-10);
        assert_relative_eq!(pbd.value().get(ip, 1), start.get(ip, 1) - 0.2, epsilon = 1e-10);
        assert_relative_eq!(pbd.velocity().get(ip, 0), 1.0, epsilon = 1e-8);
    }
}

#[test]
fn test_pbd_fixed_nodes_stay() {
    let mut pbd = Pbd::with_mesh(MeshGenerator::cube_tet(2, 1, 1, 2.0, 1.0, 1.0)).unwrap();
    pbd.fix_node(0).unwrap();
    for ip in 0..pbd.velocity().n_nodes() {
        pbd.velocity_mut().node_mut(ip).copy_from_slice(&[0.0, 0.0, -1.0]);
    }
    for _ in 0..3 {
        pbd.step_time().unwrap();
    }
    assert_eq!(pbd.value().node(0), &[0.0, 0.0, 0.0]);
    assert_eq!(pbd.velocity().node(0), &[0.0, 0.0, 0.0]);
    assert!(pbd.vector_field().is_finite());
}

#[test]
fn test_pbd_fix_node_checks_range() {
    let mut unbound = Pbd::new();
    assert!(matches!(unbound.fix_node(0), Err(Error::NoTopology)));

    let mut pbd = Pbd::with_mesh(MeshGenerator::rectangle_tri(1, 1, 1.0, 1.0)).unwrap();
    assert!(matches!(pbd.fix_node(4), Err(Error::ShapeMismatch { .. })));
    pbd.fix_node(3).unwrap();
    assert_eq!(pbd.bc, vec![0, 0, 0, 1]);
}

#[test]
fn test_eigenmode_is_mass_orthogonal_to_rigid_motion() {
    let mut model = SolidLinearEigen::new();
    model
        .updated_topology(MeshGenerator::cube_tet(3, 1, 1, 3.0, 1.0, 1.0), TopologyUpdate::default())
        .unwrap();
    for _ in 0..3 {
        model.step_time().unwrap();
    }

    // back to mass-scaled coordinates: y = sqrt(m) * mode
    let s_inv = model.mass_lumped_sqrt_inv();
    let mode = model.mode();
    let mut y = Vec::with_capacity(mode.as_slice().len());
    for (ip, &s) in s_inv.iter().enumerate() {
        y.extend(mode.node(ip).iter().map(|u| u / s));
    }
    let norm = SolverUtils::norm(&y);
    assert!(norm > 0.0);
    for k in model.rigid_modes() {
        assert!(SolverUtils::dot(&y, k).abs() < 1e-9 * norm);
    }
}

#[test]
fn test_eigen_same_seed_same_start() {
    let mesh = MeshGenerator::cube_tet(2, 1, 1, 2.0, 1.0, 1.0);
    let mut a = SolidLinearEigen::new();
    let mut b = SolidLinearEigen::new();
    a.updated_topology(mesh.clone(), TopologyUpdate::default()).unwrap();
    b.updated_topology(mesh, TopologyUpdate::default()).unwrap();
    assert_eq!(a.eigenvector().unwrap(), b.eigenvector().unwrap());
}
