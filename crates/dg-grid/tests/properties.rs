use std::collections::BTreeMap;

use dg_columns::SortKey;
use dg_grid::{Calculation, Calculations, Grid, RowMap, calculate};
use dg_groupby::Reducer;
use dg_types::Scalar;
use proptest::prelude::*;

const CHAIN: [(&str, &str); 4] = [
    ("b", "{a} + 1"),
    ("c", "{b} * 2"),
    ("d", "{c} - {a}"),
    ("e", "{d} + {b}"),
];

fn chained(order: &[usize]) -> Calculations {
    let mut calculations = Calculations::new();
    for &idx in order {
        let (name, formula) = CHAIN[idx];
        calculations.insert(name, Calculation::formula(formula).expect("formula"));
    }
    calculations
}

fn keyed_rows(pairs: &[(i64, i64)]) -> Vec<Vec<Scalar>> {
    pairs
        .iter()
        .map(|(key, value)| vec![Scalar::Int64(*key), Scalar::Int64(*value)])
        .collect()
}

fn labels() -> Vec<String> {
    vec!["key".to_owned(), "value".to_owned()]
}

proptest! {
    #[test]
    fn calculation_results_do_not_depend_on_definition_order(
        a in -1000i64..1000,
        order in Just(vec![0usize, 1, 2, 3]).prop_shuffle(),
    ) {
        let seed = RowMap::from([("a".to_owned(), Scalar::Int64(a))]);

        let mut expected = seed.clone();
        calculate(&mut expected, &chained(&[0, 1, 2, 3])).expect("canonical order");
        let mut actual = seed;
        calculate(&mut actual, &chained(&order)).expect("shuffled order");

        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn row_sorting_is_stable_in_both_directions(
        pairs in proptest::collection::vec((0i64..4, -50i64..50), 1..40),
        descending in any::<bool>(),
    ) {
        // The second column records input position so ties can be checked.
        let tagged: Vec<(i64, i64)> = pairs
            .iter()
            .enumerate()
            .map(|(pos, (key, _))| (*key, pos as i64))
            .collect();
        let key = if descending { SortKey::desc("key") } else { SortKey::asc("key") };
        let tree = Grid::new(keyed_rows(&tagged), labels())
            .with_sortby(key)
            .build_tree()
            .expect("tree");

        let mut expected = tagged.clone();
        if descending {
            expected.sort_by(|left, right| right.0.cmp(&left.0));
        } else {
            expected.sort_by_key(|pair| pair.0);
        }
        let actual: Vec<Vec<Scalar>> = tree
            .body
            .leaf_rows()
            .iter()
            .map(|row| row.to_vec())
            .collect();
        prop_assert_eq!(actual, keyed_rows(&expected));
    }

    #[test]
    fn group_summaries_equal_the_reducer_over_their_members(
        pairs in proptest::collection::vec((0i64..5, -1000i64..1000), 1..60),
    ) {
        let tree = Grid::new(keyed_rows(&pairs), labels())
            .with_groupby("key")
            .with_aggregate("value", Reducer::Sum)
            .build_tree()
            .expect("tree");

        let mut sums: BTreeMap<i64, i64> = BTreeMap::new();
        for (key, value) in &pairs {
            *sums.entry(*key).or_default() += value;
        }

        let groups = tree.body.groups();
        prop_assert_eq!(groups.len(), sums.len());
        for node in groups {
            let Scalar::Int64(key) = node.key else {
                return Err(TestCaseError::fail("group key should stay an integer"));
            };
            prop_assert_eq!(&node.summary[1], &Scalar::Int64(sums[&key]));
            let members = pairs.iter().filter(|(k, _)| *k == key).count();
            prop_assert_eq!(node.body.leaf_rows().len(), members);
        }
        prop_assert_eq!(&tree.summary[1], &Scalar::Int64(sums.values().sum()));
    }

    #[test]
    fn suppressing_detail_keeps_every_summary(
        pairs in proptest::collection::vec((0i64..5, -1000i64..1000), 1..60),
    ) {
        let grid = Grid::new(keyed_rows(&pairs), labels())
            .with_groupby("key")
            .with_aggregate("value", Reducer::Sum);
        let detailed = grid.clone().build_tree().expect("detailed");
        let suppressed = grid.with_suppress_detail(true).build_tree().expect("suppressed");

        prop_assert_eq!(&detailed.summary, &suppressed.summary);
        let summaries = |tree: &dg_grid::GroupTree| -> Vec<Vec<Scalar>> {
            tree.body.groups().iter().map(|node| node.summary.clone()).collect()
        };
        prop_assert_eq!(summaries(&detailed), summaries(&suppressed));
        prop_assert!(suppressed.body.leaf_rows().is_empty());
    }
}
