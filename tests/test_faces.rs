use ndarray::Array3;

use blockwise::{
    block_faces_job, match_blocks, BlockFace, Blocking, Error, InMemoryVolume, JobDescriptor,
    LabelOffsets, LabelUnionFind, LabelVolume, Result,
};

/// Two blocks along the first axis. Block-local labels are 1 and 2 in both
/// blocks; only label 2 of block 0 touches label 1 of block 1.
fn two_block_volume() -> (InMemoryVolume, Blocking) {
    let data = Array3::from_shape_fn((4, 2, 1), |(x, _, _)| match x {
        0 => 1,
        1 => 2,
        2 => 1,
        _ => 2,
    });
    let blocking = Blocking::new([4, 2, 1], [2, 2, 1]).unwrap();
    (InMemoryVolume::new(data), blocking)
}

fn offsets() -> LabelOffsets {
    LabelOffsets {
        offsets: [(0, 0), (1, 2)].into_iter().collect(),
        empty_blocks: Default::default(),
        n_labels: 5,
    }
}

#[test]
fn touching_labels_yield_one_pair_and_one_class() {
    let (volume, blocking) = two_block_volume();
    assert_eq!(blocking.n_blocks(), 2);

    let pairs = match_blocks(&volume, &blocking, 0, 1, &offsets()).unwrap();
    assert_eq!(pairs, vec![(2, 3)]);

    let mut union_find = LabelUnionFind::new(5);
    union_find.union_pairs(&pairs).unwrap();
    let equivalences = union_find.finalize();
    assert_eq!(equivalences.representative(2), equivalences.representative(3));
    assert_eq!(equivalences.representative(3), 2);
}

#[test]
fn matching_is_symmetric_in_block_order() {
    let data = Array3::from_shape_fn((4, 3, 2), |(x, y, z)| (x * 7 + y * 3 + z) as u64 % 5);
    let volume = InMemoryVolume::new(data);
    let blocking = Blocking::new([4, 3, 2], [2, 3, 2]).unwrap();
    let offsets = LabelOffsets {
        offsets: [(0, 0), (1, 5)].into_iter().collect(),
        empty_blocks: Default::default(),
        n_labels: 10,
    };
    let ab = match_blocks(&volume, &blocking, 0, 1, &offsets).unwrap();
    let ba = match_blocks(&volume, &blocking, 1, 0, &offsets).unwrap();
    assert!(!ab.is_empty());
    assert_eq!(ab, ba);
    assert!(ab.iter().all(|&(a, b)| a <= b));
}

#[test]
fn background_never_matches() {
    let data = Array3::from_shape_fn((4, 2, 1), |(x, y, _)| if x == 2 && y == 0 { 0 } else { 1 });
    let volume = InMemoryVolume::new(data);
    let blocking = Blocking::new([4, 2, 1], [2, 2, 1]).unwrap();
    let pairs = match_blocks(&volume, &blocking, 0, 1, &offsets()).unwrap();
    assert_eq!(pairs, vec![(1, 3)]);

    let empty = InMemoryVolume::new(Array3::zeros((4, 2, 1)));
    let pairs = match_blocks(&empty, &blocking, 0, 1, &offsets()).unwrap();
    assert!(pairs.is_empty());
}

#[test]
fn missing_offset_is_fatal() {
    let (volume, blocking) = two_block_volume();
    let partial = LabelOffsets {
        offsets: [(0, 0)].into_iter().collect(),
        empty_blocks: Default::default(),
        n_labels: 5,
    };
    let err = match_blocks(&volume, &blocking, 0, 1, &partial).unwrap_err();
    assert!(matches!(err, Error::MissingBlockData { block_id: 1, .. }));
}

#[test]
fn non_adjacent_blocks_have_no_face() {
    let blocking = Blocking::new([4, 4, 1], [2, 2, 1]).unwrap();
    let a = blocking.block(0).unwrap();
    let d = blocking.block(3).unwrap();
    assert!(matches!(
        BlockFace::between(&a, &d),
        Err(Error::InvalidConfiguration(_))
    ));
}

/// Volume that drops the last row of every region it reads.
struct Truncating(InMemoryVolume);

impl LabelVolume for Truncating {
    fn shape(&self) -> [usize; 3] {
        self.0.shape()
    }

    fn read_region(&self, begin: [usize; 3], mut end: [usize; 3]) -> Result<Array3<u64>> {
        end[1] -= 1;
        self.0.read_region(begin, end)
    }
}

#[test]
fn mismatched_slices_are_rejected() {
    let (volume, blocking) = two_block_volume();
    let err = match_blocks(&Truncating(volume), &blocking, 0, 1, &offsets()).unwrap_err();
    assert!(matches!(err, Error::InconsistentShape(_)));
}

#[test]
fn empty_blocks_and_their_faces_are_skipped() {
    // 2x2 grid of blocks; block 1 holds only background
    let data = Array3::from_shape_fn((4, 4, 1), |(x, y, _)| if x < 2 && y >= 2 { 0 } else { 1 });
    let volume = InMemoryVolume::new(data);
    let blocking = Blocking::new([4, 4, 1], [2, 2, 1]).unwrap();
    // no offset recorded for the empty block
    let offsets = LabelOffsets {
        offsets: [(0, 0), (2, 1), (3, 2)].into_iter().collect(),
        empty_blocks: [1].into_iter().collect(),
        n_labels: 4,
    };
    let job = JobDescriptor {
        job_id: 0,
        block_ids: vec![0, 1, 2, 3],
    };

    let pairs = block_faces_job(&job, &blocking, &volume, &offsets).unwrap();
    assert_eq!(pairs, vec![(1, 2), (2, 3)]);

    let only_empty = JobDescriptor {
        job_id: 1,
        block_ids: vec![1],
    };
    assert!(block_faces_job(&only_empty, &blocking, &volume, &offsets)
        .unwrap()
        .is_empty());

    // without the empty marker block 1 needs an offset
    let unmarked = LabelOffsets {
        empty_blocks: Default::default(),
        ..offsets
    };
    let err = block_faces_job(&job, &blocking, &volume, &unmarked).unwrap_err();
    assert!(matches!(err, Error::MissingBlockData { block_id: 1, .. }));
}
