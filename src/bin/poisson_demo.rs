use femlinsys::{FieldValueSetter, MeshGenerator, PhysicsModel, SimulationConfig, TopologyUpdate};

fn main() -> femlinsys::Result<()> {
    println!("=== Poisson Solver Demo ===\n");

    // -Δu = 0 on the unit square
    // BC: u = 1 at x = 0, u = 0 at x = 1, natural elsewhere
    // Exact solution: u = 1 - x

    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    };

    let (nx, ny) = (16, 16);
    println!("Generating mesh...");
    let mesh = MeshGenerator::rectangle_tri(nx, ny, 1.0, 1.0);
    println!("  Nodes: {}", mesh.num_nodes());
    println!("  Elements: {}", mesh.num_elements());

    let mut model = config.poisson();
    model.updated_topology(mesh.clone(), TopologyUpdate::default())?;

    println!("\nApplying boundary conditions...");
    let left: Vec<usize> = (0..mesh.num_nodes()).filter(|&ip| mesh.position(ip)[0] < 1e-9).collect();
    let right: Vec<usize> = (0..mesh.num_nodes()).filter(|&ip| mesh.position(ip)[0] > 1.0 - 1e-9).collect();
    {
        let ls = model.linsys_mut()?;
        config.solver.apply(ls);
        for &ip in left.iter().chain(&right) {
            ls.fix_node(ip, &[0])?;
        }
    }
    // the setter adds the expression to x, which is zero on the left edge
    let mut setter = FieldValueSetter::new("1", 0, left.clone(), 1.0)?;
    setter.step_time(&mesh, model.value_mut())?;
    println!("  Fixed u = 1: {} nodes", left.len());
    println!("  Fixed u = 0: {} nodes", right.len());

    println!("\nSolving...");
    model.solve()?;
    let hist = model.linsys()?.conv_hist();
    println!("  Iterations: {}", hist.len());
    println!("  Final relative residual: {:.3e}", hist.last().copied().unwrap_or(0.0));

    let max_err = (0..mesh.num_nodes())
        .map(|ip| (model.value().get(ip, 0) - (1.0 - mesh.position(ip)[0])).abs())
        .fold(0.0_f64, f64::max);
    println!("\nMax error vs. exact solution: {:.3e}", max_err);

    println!("\n=== Demo Complete ===");
    Ok(())
}
