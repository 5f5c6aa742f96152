use blockwise::{cut_mask, multicut_objective, Agglomerator, Error, GreedyAdditive, KernighanLin, LocalSolver};

// Small deterministic generator so the graphs are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

fn random_problem(seed: u64, n_nodes: usize, n_edges: usize) -> (Vec<(usize, usize)>, Vec<f64>) {
    let mut rng = Lcg(seed);
    let mut uv = Vec::new();
    let mut costs = Vec::new();
    while uv.len() < n_edges {
        let u = (rng.next() % n_nodes as u64) as usize;
        let v = (rng.next() % n_nodes as u64) as usize;
        if u == v || uv.contains(&(u.min(v), u.max(v))) {
            continue;
        }
        uv.push((u.min(v), u.max(v)));
        costs.push((rng.next() % 200) as f64 / 10.0 - 8.0);
    }
    (uv, costs)
}

#[test]
fn agglomerator_keys_resolve() {
    assert_eq!("multicut_kl".parse::<Agglomerator>().unwrap(), Agglomerator::KernighanLin);
    assert_eq!("multicut_gaec".parse::<Agglomerator>().unwrap(), Agglomerator::GreedyAdditive);
    assert_eq!(Agglomerator::KernighanLin.key(), "multicut_kl");
    assert!(matches!(
        "multicut_fancy".parse::<Agglomerator>(),
        Err(Error::InvalidConfiguration(_))
    ));
}

#[test]
fn cut_mask_matches_labels() {
    for seed in 0..5 {
        let (uv, costs) = random_problem(seed, 12, 30);
        for solver in [Agglomerator::GreedyAdditive, Agglomerator::KernighanLin] {
            let labels = solver.solve(12, &uv, &costs).unwrap();
            assert_eq!(labels.len(), 12);
            let mask = cut_mask(&uv, &labels).unwrap();
            assert_eq!(mask.len(), uv.len());
            for (&(u, v), &cut) in uv.iter().zip(&mask) {
                assert_eq!(cut, labels[u] != labels[v]);
            }
        }
    }
}

#[test]
fn attractive_edges_are_merged() {
    let uv = vec![(0, 1), (1, 2)];
    let labels = GreedyAdditive.solve(3, &uv, &[5.0, 5.0]).unwrap();
    assert_eq!(labels, vec![0, 0, 0]);

    let labels = GreedyAdditive.solve(2, &[(0, 1)], &[-3.0]).unwrap();
    assert_eq!(labels, vec![0, 1]);
}

#[test]
fn weakly_repulsive_edge_inside_attractive_triangle_is_kept() {
    let uv = vec![(0, 1), (1, 2), (0, 2)];
    let costs = vec![10.0, 10.0, -1.0];
    let labels = KernighanLin::default().solve(3, &uv, &costs).unwrap();
    assert_eq!(labels, vec![0, 0, 0]);
}

#[test]
fn node_moves_never_worsen_greedy_result() {
    for seed in 10..20 {
        let (uv, costs) = random_problem(seed, 15, 40);
        let greedy = GreedyAdditive.solve(15, &uv, &costs).unwrap();
        let refined = KernighanLin::default().solve(15, &uv, &costs).unwrap();
        let refined = multicut_objective(&refined, &uv, &costs).unwrap();
        let greedy = multicut_objective(&greedy, &uv, &costs).unwrap();
        assert!(refined <= greedy + 1e-9);
    }
}

#[test]
fn labels_are_dense_and_deterministic() {
    let (uv, costs) = random_problem(42, 20, 50);
    let a = Agglomerator::KernighanLin.solve(20, &uv, &costs).unwrap();
    let b = Agglomerator::KernighanLin.solve(20, &uv, &costs).unwrap();
    assert_eq!(a, b);
    let max = *a.iter().max().unwrap();
    for label in 0..=max {
        assert!(a.contains(&label));
    }
}

#[test]
fn mismatched_costs_are_rejected() {
    let err = GreedyAdditive.solve(3, &[(0, 1), (1, 2)], &[1.0]).unwrap_err();
    assert!(matches!(err, Error::InconsistentShape(_)));
    let err = GreedyAdditive.solve(2, &[(0, 2)], &[1.0]).unwrap_err();
    assert!(matches!(err, Error::InconsistentShape(_)));
}

#[test]
fn objective_checks_label_count() {
    let uv = vec![(0, 1), (1, 2)];
    assert_eq!(multicut_objective(&[0, 0, 1], &uv, &[4.0, -2.0]).unwrap(), -2.0);
    assert!(matches!(
        multicut_objective(&[0, 0], &uv, &[4.0, -2.0]),
        Err(Error::InconsistentShape(_))
    ));
}
