use proptest::prelude::*;
use tidy_ingest::{CombineRule, FlattenOptions, HeaderBlock, flatten_header};

fn expected_single_row_name(idx: usize, cell: &str) -> String {
    let trimmed = cell.trim();
    if cell == "None" || trimmed.is_empty() {
        format!("column_{}", idx + 1)
    } else {
        trimmed.to_string()
    }
}

proptest! {
    #[test]
    fn single_row_header_degenerates_to_clean_names(
        cells in proptest::collection::vec("[a-z ]{0,6}", 1..10),
    ) {
        let block = HeaderBlock::from_text([cells.clone()]);
        let names = flatten_header(&block, cells.len(), &FlattenOptions::default()).unwrap();
        let expected: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| expected_single_row_name(idx, cell))
            .collect();
        prop_assert_eq!(names, expected);
    }

    #[test]
    fn single_row_ignores_the_combine_rule(
        cells in proptest::collection::vec("[a-c]{1,2}", 1..8),
    ) {
        let block = HeaderBlock::from_text([cells.clone()]);
        let underscore = FlattenOptions {
            combine: CombineRule::Underscore,
            ..FlattenOptions::default()
        };
        let a = flatten_header(&block, cells.len(), &FlattenOptions::default()).unwrap();
        let b = flatten_header(&block, cells.len(), &underscore).unwrap();
        prop_assert_eq!(&a, &cells);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn one_name_per_column(
        rows in (1usize..6).prop_flat_map(|width| {
            proptest::collection::vec(
                proptest::collection::vec(prop_oneof!["", "None", "[A-C]{1,2}"], width),
                1..4,
            )
        }),
    ) {
        let width = rows[0].len();
        let block = HeaderBlock::from_text(rows);
        let names = flatten_header(&block, width, &FlattenOptions::default()).unwrap();
        prop_assert_eq!(names.len(), width);
    }

    #[test]
    fn width_mismatch_is_rejected(width in 1usize..6, extra in 1usize..3) {
        let block = HeaderBlock::from_text([vec!["x"; width]]);
        prop_assert!(flatten_header(&block, width + extra, &FlattenOptions::default()).is_err());
    }
}
