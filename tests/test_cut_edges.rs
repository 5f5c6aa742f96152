use blockwise::{
    aggregate, block_cut_edges, solve_scale, Agglomerator, Block, BlockNodes, CutEdgeSet, Error,
    MulticutProblem, RegionGraph, ScaleHierarchy, ScaleSolution, Subgraph,
};

fn scenario_problem() -> MulticutProblem {
    let graph = RegionGraph::new(4, vec![(0, 1), (1, 2), (2, 3)]).unwrap();
    MulticutProblem::new(graph, vec![5.0, 1.0, 5.0]).unwrap()
}

fn scenario_nodes() -> BlockNodes {
    [(0, vec![0, 1]), (1, vec![2, 3])].into_iter().collect()
}

#[test]
fn merge_is_commutative_and_idempotent() {
    let a: CutEdgeSet = [1, 5, 7].into_iter().collect();
    let b: CutEdgeSet = [5, 9].into_iter().collect();
    let c: CutEdgeSet = [2].into_iter().collect();

    let abc = aggregate([&a, &b, &c]);
    let cba = aggregate([&c, &b, &a]);
    let with_repeat = aggregate([&b, &a, &c, &a, &b]);
    assert_eq!(abc, cba);
    assert_eq!(abc, with_repeat);
    assert_eq!(abc.to_sorted_vec(), vec![1, 2, 5, 7, 9]);
    assert!(abc.contains(9));
    assert!(!abc.contains(3));
}

#[test]
fn block_contribution_is_cut_inner_plus_outer() {
    let sub = Subgraph {
        block_id: 0,
        nodes: vec![10, 11, 12],
        inner_edges: vec![3, 4],
        outer_edges: vec![8],
        local_uv: vec![(0, 1), (1, 2)],
    };
    let cut = block_cut_edges(&sub, &[0, 0, 1]).unwrap();
    assert_eq!(cut, vec![4, 8]);

    let err = block_cut_edges(&sub, &[0, 0]).unwrap_err();
    assert!(matches!(err, Error::InconsistentShape(_)));
}

#[test]
fn outer_edge_between_blocks_is_cut_at_scale_zero() {
    let problem = scenario_problem();
    let nodes = scenario_nodes();
    let blocks = vec![
        Block::new(0, [0, 0, 0], [1, 1, 1]),
        Block::new(1, [1, 0, 0], [2, 1, 1]),
    ];
    let solution = solve_scale(&problem, &blocks, &nodes, &Agglomerator::KernighanLin).unwrap();
    assert_eq!(solution.cut_edges.to_sorted_vec(), vec![1]);
    assert_eq!(solution.inner_edges.to_sorted_vec(), vec![0, 2]);
    assert!(solution.is_merged(0));
    assert!(!solution.is_merged(1));

    let reversed: Vec<Block> = blocks.into_iter().rev().collect();
    let again = solve_scale(&problem, &reversed, &nodes, &Agglomerator::KernighanLin).unwrap();
    assert_eq!(solution, again);
}

#[test]
fn hierarchy_stops_at_max_scale() {
    let nodes = scenario_nodes();
    let solver = Agglomerator::GreedyAdditive;
    let result = ScaleHierarchy::new([2, 1, 1], [1, 1, 1], &solver)
        .with_max_scale(0)
        .run(scenario_problem(), &nodes)
        .unwrap();
    assert_eq!(result.scales.len(), 1);
    assert_eq!(result.scales[0].n_blocks, 2);
    assert_eq!(result.scales[0].cut_edges, vec![1]);
}

#[test]
fn hierarchy_runs_until_single_block() {
    let nodes = scenario_nodes();
    let solver = Agglomerator::KernighanLin;
    let result = ScaleHierarchy::new([2, 1, 1], [1, 1, 1], &solver)
        .run(scenario_problem(), &nodes)
        .unwrap();

    assert_eq!(result.scales.len(), 2);
    assert_eq!(result.scales[0].cut_edges, vec![1]);
    assert_eq!(result.scales[1].n_blocks, 1);
    // the remaining edge is attractive, so the whole-volume solve keeps it
    assert!(result.scales[1].cut_edges.is_empty());

    let problem = &result.problem;
    assert_eq!(problem.graph.uv_ids(), &[(0, 1)]);
    assert_eq!(problem.costs, vec![1.0]);
    assert_eq!(problem.node_labeling, vec![0, 0, 1, 1]);
}

#[test]
fn contraction_sums_parallel_edges() {
    let graph = RegionGraph::new(4, vec![(0, 1), (0, 2), (1, 3), (2, 3)]).unwrap();
    let problem = MulticutProblem::new(graph, vec![4.0, -1.0, -2.0, 3.0]).unwrap();
    let solution = ScaleSolution {
        cut_edges: [1, 2].into_iter().collect(),
        inner_edges: [0, 1, 2, 3].into_iter().collect(),
    };
    let next = problem.contract(&solution).unwrap();
    assert_eq!(next.graph.uv_ids(), &[(0, 1)]);
    assert_eq!(next.costs, vec![-3.0]);
    assert_eq!(next.node_labeling, vec![0, 0, 1, 1]);
}

#[test]
fn bad_roi_fails_before_solving() {
    let nodes = scenario_nodes();
    let solver = Agglomerator::GreedyAdditive;
    let err = ScaleHierarchy::new([2, 1, 1], [1, 1, 1], &solver)
        .with_roi([0, 0, 0], [3, 1, 1])
        .run(scenario_problem(), &nodes)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

#[test]
fn edges_no_block_solved_are_never_contracted() {
    let graph = RegionGraph::new(3, vec![(0, 1), (1, 2)]).unwrap();
    let problem = MulticutProblem::new(graph, vec![2.0, 7.0]).unwrap();
    // edge 1 is neither cut nor seen as an inner edge
    let mut solution = ScaleSolution::new();
    solution.insert_block(&[0], &[]);
    let next = problem.contract(&solution).unwrap();
    assert_eq!(next.node_labeling, vec![0, 0, 1]);
    assert_eq!(next.graph.uv_ids(), &[(0, 1)]);
    assert_eq!(next.costs, vec![7.0]);
}

#[test]
fn roi_keeps_repulsive_edges_outside_of_it() {
    // one node per block along the first axis
    let graph = RegionGraph::new(4, vec![(0, 1), (1, 2), (2, 3)]).unwrap();
    let problem = MulticutProblem::new(graph, vec![5.0, 5.0, -100.0]).unwrap();
    let nodes: BlockNodes = (0..4).map(|id| (id, vec![id])).collect();
    let solver = Agglomerator::KernighanLin;

    let result = ScaleHierarchy::new([4, 1, 1], [1, 1, 1], &solver)
        .with_roi([0, 0, 0], [2, 1, 1])
        .with_max_scale(1)
        .run(problem, &nodes)
        .unwrap();

    assert_eq!(result.scales.len(), 2);
    assert_eq!(result.scales[0].n_blocks, 2);
    assert_eq!(result.scales[0].cut_edges, vec![0, 1]);
    assert_eq!(result.scales[1].n_blocks, 1);
    assert_eq!(result.scales[1].cut_edges, vec![1]);

    let problem = &result.problem;
    assert_eq!(problem.node_labeling, vec![0, 1, 2, 3]);
    assert_eq!(problem.costs, vec![5.0, 5.0, -100.0]);
}
