use std::collections::BTreeSet;

use blockwise::{blocks, scaled_block_shape, Blocking, Error};

#[test]
fn blocks_tile_volume_with_clipped_boundary() {
    let shape = [10, 10, 10];
    let all = blocks(shape, [4, 4, 4], None, None).unwrap();
    assert_eq!(all.len(), 27);

    assert_eq!(all[0].id, 0);
    assert_eq!(all[0].begin, [0, 0, 0]);
    assert_eq!(all[0].end, [4, 4, 4]);

    let last = all.last().unwrap();
    assert_eq!(last.id, 26);
    assert_eq!(last.begin, [8, 8, 8]);
    assert_eq!(last.end, [10, 10, 10]);

    let covered: usize = all.iter().map(|b| b.nvoxels()).sum();
    assert_eq!(covered, 1000);
    for (idx, b) in all.iter().enumerate() {
        assert_eq!(b.id, idx as u64);
    }
}

#[test]
fn blocks_are_deterministic() {
    let a = blocks([17, 9, 5], [4, 3, 2], None, None).unwrap();
    let b = blocks([17, 9, 5], [4, 3, 2], None, None).unwrap();
    assert_eq!(a, b);
}

#[test]
fn block_shape_doubles_per_scale() {
    assert_eq!(scaled_block_shape([4, 3, 2], 0).unwrap(), [4, 3, 2]);
    assert_eq!(scaled_block_shape([4, 3, 2], 2).unwrap(), [16, 12, 8]);

    let blocking = Blocking::at_scale([16, 16, 16], [4, 4, 4], 2).unwrap();
    assert_eq!(blocking.block_shape(), [16, 16, 16]);
    assert_eq!(blocking.n_blocks(), 1);
}

#[test]
fn invalid_configuration_is_rejected() {
    assert!(matches!(
        blocks([8, 8, 8], [0, 4, 4], None, None),
        Err(Error::InvalidConfiguration(_))
    ));
    assert!(matches!(
        blocks([8, 8, 8], [4, 4, 4], Some([0, 0, 0]), Some([4, 4, 9])),
        Err(Error::InvalidConfiguration(_))
    ));
    assert!(matches!(
        blocks([8, 8, 8], [4, 4, 4], Some([4, 0, 0]), Some([4, 4, 4])),
        Err(Error::InvalidConfiguration(_))
    ));
}

#[test]
fn roi_selects_intersecting_blocks() {
    let selected = blocks([8, 8, 8], [4, 4, 4], Some([0, 0, 0]), Some([4, 4, 8])).unwrap();
    let ids: Vec<u64> = selected.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![0, 1]);
}

#[test]
fn neighbors_and_lower_faces() {
    let blocking = Blocking::new([4, 4, 4], [2, 2, 2]).unwrap();
    assert_eq!(blocking.neighbor(0, 2, false), Some(1));
    assert_eq!(blocking.neighbor(0, 0, true), None);
    assert_eq!(blocking.neighbor(7, 0, true), Some(3));

    let none = BTreeSet::new();
    let faces = blocking.faces(7, true, &none).unwrap();
    let lower: Vec<u64> = faces.iter().map(|f| f.block_a).collect();
    assert_eq!(lower, vec![3, 5, 6]);
    assert!(faces.iter().all(|f| f.block_b == 7));
    assert!(faces.iter().all(|f| f.area() == 4));

    let empty: BTreeSet<u64> = [3].into_iter().collect();
    assert_eq!(blocking.faces(7, true, &empty).unwrap().len(), 2);

    assert_eq!(blocking.faces(0, false, &none).unwrap().len(), 3);
    assert!(blocking.faces(0, true, &none).unwrap().is_empty());
}

#[test]
fn coarse_block_encloses_nested_fine_blocks() {
    let fine = Blocking::new([8, 8, 8], [2, 2, 2]).unwrap();
    let coarse = Blocking::at_scale([8, 8, 8], [2, 2, 2], 1).unwrap();
    let nested = coarse.nested_block_ids(0, &fine).unwrap();
    assert_eq!(nested, vec![0, 1, 4, 5, 16, 17, 20, 21]);

    let outer = coarse.block(0).unwrap();
    for id in nested {
        assert!(outer.encloses(&fine.block(id).unwrap()));
    }
}
