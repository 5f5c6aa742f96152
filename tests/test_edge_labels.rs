use blockwise::{edge_labels, Error, IGNORE_EDGE};

#[test]
fn edges_between_different_objects_are_cut() {
    let node_labels = [0, 3, 3, 7];
    let uv = [(0, 1), (1, 2), (2, 3)];

    assert_eq!(edge_labels(&node_labels, &uv, false).unwrap(), vec![1, 0, 1]);
    assert_eq!(edge_labels(&node_labels, &uv, true).unwrap(), vec![IGNORE_EDGE, 0, 1]);
}

#[test]
fn unknown_node_is_rejected() {
    let err = edge_labels(&[1, 2], &[(0, 2)], false).unwrap_err();
    assert!(matches!(err, Error::InconsistentShape(_)));
}
