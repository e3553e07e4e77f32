//! property tests: every path recomputes the current root

use mixer_merkle::{hash_siblings, Accumulator, Hash, MerkleRoot, ZERO_LEAF};
use proptest::prelude::*;

fn padded_root(leaves: &[Hash], depth: usize) -> MerkleRoot {
    let mut level = vec![ZERO_LEAF; 1 << depth];
    level[..leaves.len()].copy_from_slice(leaves);
    while level.len() > 1 {
        level = level
            .chunks_exact(2)
            .map(|pair| hash_siblings(&pair[0], &pair[1]))
            .collect();
    }
    MerkleRoot(level[0])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_path_recomputes_root(
        depth in 1usize..=6,
        seeds in prop::collection::vec(any::<[u8; 32]>(), 0..=64),
    ) {
        let capacity = 1usize << depth;
        let leaves: Vec<Hash> = seeds.into_iter().take(capacity).collect();

        let mut tree = Accumulator::new(depth, 4).unwrap();
        for (i, l) in leaves.iter().enumerate() {
            prop_assert_eq!(tree.insert(*l).unwrap(), i as u64);
        }

        let root = tree.current_root();
        prop_assert_eq!(root, padded_root(&leaves, depth));

        for (i, l) in leaves.iter().enumerate() {
            let (path, path_root) = tree.path(i as u64).unwrap();
            prop_assert_eq!(path_root, root);
            prop_assert_eq!(path.compute_root(l), root);
        }
    }

    #[test]
    fn anchors_stay_known_within_window(
        inserts_after in 0usize..10,
        window in 1usize..12,
    ) {
        let mut tree = Accumulator::new(8, window).unwrap();
        tree.insert([1u8; 32]).unwrap();
        let anchor = tree.current_root();

        for i in 0..inserts_after {
            tree.insert([i as u8 + 2; 32]).unwrap();
        }

        // the anchor plus `inserts_after` newer roots must fit in the window
        prop_assert_eq!(tree.is_known_root(&anchor), inserts_after < window);
    }
}
