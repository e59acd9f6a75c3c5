use approx::assert_relative_eq;
use femlinsys::{
    Cloth, Diffuse, ElementType, FieldRegistry, HasScalarField, HasVectorField, InterpolationMap, Mesh,
    MeshGenerator, ModelState, NodalField, PhysicsModel, Poisson, SolidLinearDynamic, SolidLinearStatic,
    TopologyUpdate,
};

fn left_edge(mesh: &Mesh) -> Vec<usize> {
    (0..mesh.num_nodes()).filter(|&ip| mesh.position(ip)[0] < 1e-9).collect()
}

fn assert_unchanged(after: &NodalField, before: &NodalField, nodes: &[usize]) {
    for &ip in nodes {
        assert_eq!(after.node(ip), before.node(ip), "fixed node {} moved", ip);
    }
}

/// Unit square split into four triangles around a new center node 4
fn square_with_center() -> (Mesh, InterpolationMap) {
    let positions = vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.5, 0.5];
    let tris = vec![0, 1, 4, 1, 3, 4, 3, 2, 4, 2, 0, 4];
    let mesh = Mesh::from_arrays(2, positions, ElementType::Tri3, tris).unwrap();
    let mut map = InterpolationMap::new(4);
    map.push(vec![(0, 0.25), (1, 0.25), (2, 0.25), (3, 0.25)]);
    (mesh, map)
}

#[test]
fn test_fixed_dofs_hold_for_diffusion() {
    let mesh = MeshGenerator::rectangle_tri(4, 4, 1.0, 1.0);
    let fixed = left_edge(&mesh);
    let mut model = Diffuse::new();
    model.source = 1.0;
    model.updated_topology(mesh, TopologyUpdate::default()).unwrap();
    for &ip in &fixed {
        model.linsys_mut().unwrap().fix_node(ip, &[0]).unwrap();
        model.value_mut().set(ip, 0, 0.5);
    }
    let before = model.value().clone();
    for _ in 0..3 {
        model.step_time().unwrap();
    }
    assert_unchanged(model.value(), &before, &fixed);
    assert!(model.velocity().is_finite());
    assert_eq!(model.field_names(), vec!["value", "velocity"]);
}

#[test]
fn test_fixed_dofs_hold_for_solids() {
    let mesh = MeshGenerator::rectangle_tri(6, 2, 3.0, 1.0);
    let fixed = left_edge(&mesh);

    let mut stat = SolidLinearStatic::new([0.0, -1.0, 0.0]);
    stat.updated_topology(mesh.clone(), TopologyUpdate::default()).unwrap();
    let mut dynamic = SolidLinearDynamic::new([0.0, -1.0, 0.0]);
    dynamic.updated_topology(mesh, TopologyUpdate::default()).unwrap();
    for &ip in &fixed {
        stat.linsys_mut().unwrap().fix_node(ip, &[0, 1]).unwrap();
        dynamic.linsys_mut().unwrap().fix_node(ip, &[0, 1]).unwrap();
    }

    stat.solve().unwrap();
    let zeros = NodalField::zeros(stat.value().n_nodes(), 2);
    assert_unchanged(stat.value(), &zeros, &fixed);
    assert!(stat.value().is_finite());

    for _ in 0..3 {
        dynamic.step_time().unwrap();
    }
    assert_unchanged(dynamic.value(), &zeros, &fixed);
    assert_unchanged(dynamic.velocity(), &zeros, &fixed);
    assert_unchanged(dynamic.acceleration(), &zeros, &fixed);
    assert!(dynamic.vector_field().is_finite());
}

#[test]
fn test_fixed_dofs_hold_for_cloth() {
    let mesh = MeshGenerator::rectangle_tri(4, 4, 1.0, 1.0);
    let fixed = left_edge(&mesh);
    let mut cloth = Cloth::new();
    cloth.updated_topology(mesh, TopologyUpdate::default()).unwrap();
    for &ip in &fixed {
        cloth.linsys_mut().unwrap().fix_node(ip, &[0, 1, 2]).unwrap();
    }
    let before = cloth.value().clone();
    for _ in 0..2 {
        cloth.step_time().unwrap();
    }
    assert_unchanged(cloth.value(), &before, &fixed);
    assert!(cloth.value().is_finite());
}

#[test]
fn test_poisson_remap_after_refinement() {
    let mesh = MeshGenerator::rectangle_tri(1, 1, 1.0, 1.0);
    let mut model = Poisson::default();
    model.updated_topology(mesh, TopologyUpdate::default()).unwrap();
    for (ip, v) in [0.0, 1.0, 2.0, 5.0].into_iter().enumerate() {
        model.scalar_field_mut().set(ip, 0, v);
    }

    let (mesh, map) = square_with_center();
    model.updated_topology(mesh, TopologyUpdate::with_mapper(&map)).unwrap();
    assert_eq!(model.state(), ModelState::TopologyBound);
    assert_eq!(model.value().shape(), (5, 1));
    assert_relative_eq!(model.value().get(3, 0), 5.0);
    assert_relative_eq!(model.value().get(4, 0), 2.0);
    assert_eq!(model.linsys().unwrap().np(), 5);

    let ls = model.linsys_mut().unwrap();
    ls.fix_node(0, &[0]).unwrap();
    model.solve().unwrap();
    assert!(model.value().is_finite());
    assert_relative_eq!(model.value().get(0, 0), 0.0);
}

#[test]
fn test_cloth_remap_after_refinement() {
    let mut cloth = Cloth::new();
    cloth
        .updated_topology(MeshGenerator::rectangle_tri(1, 1, 1.0, 1.0), TopologyUpdate::default())
        .unwrap();

    let (mesh, map) = square_with_center();
    cloth.updated_topology(mesh, TopologyUpdate::with_mapper(&map)).unwrap();
    assert_eq!(cloth.value().shape(), (5, 3));
    assert_eq!(cloth.value().node(4), &[0.5, 0.5, 0.0]);
    assert_eq!(cloth.velocity().shape(), (5, 3));
    // every interior edge of the fan has a bending quad
    assert_eq!(cloth.quads().len(), 4 * 4);

    let ls = cloth.linsys_mut().unwrap();
    ls.fix_node(0, &[0, 1, 2]).unwrap();
    ls.fix_node(1, &[0, 1, 2]).unwrap();
    cloth.step_time().unwrap();
    assert!(cloth.value().is_finite());
    assert!(cloth.velocity().is_finite());
}

#[test]
fn test_models_without_topology() {
    let mut diffuse = Diffuse::new();
    assert!(diffuse.step_time().is_err());
    let mut cloth = Cloth::new();
    assert!(cloth.step_time().is_err());
    assert!(cloth.mesh().is_none());
    assert_eq!(cloth.state(), ModelState::Uninitialized);
}
