use proptest::prelude::*;
use rangefetch::plan_ranges;

fn size_and_count() -> impl Strategy<Value = (u64, usize)> {
    (1u64..=1_000_000).prop_flat_map(|size| {
        let max_count = size.min(512) as usize;
        (Just(size), 1..=max_count)
    })
}

proptest! {
    #[test]
    fn ranges_cover_the_resource_without_gaps((size, count) in size_and_count()) {
        let ranges = plan_ranges(size, count).unwrap();

        prop_assert_eq!(ranges.len(), count);
        prop_assert_eq!(ranges[0].start, 0);
        prop_assert_eq!(ranges.last().unwrap().end, size - 1);

        for pair in ranges.windows(2) {
            prop_assert_eq!(pair[1].start, pair[0].end + 1);
        }
        for (i, r) in ranges.iter().enumerate() {
            prop_assert_eq!(r.index, i);
            prop_assert!(r.start <= r.end);
        }

        let covered: u64 = ranges.iter().map(|r| r.len()).sum();
        prop_assert_eq!(covered, size);
    }

    #[test]
    fn last_range_absorbs_the_remainder((size, count) in size_and_count()) {
        let ranges = plan_ranges(size, count).unwrap();
        let chunk_size = size / count as u64;
        let remainder = size % count as u64;

        for r in &ranges[..ranges.len() - 1] {
            prop_assert_eq!(r.len(), chunk_size);
        }

        let last = ranges.last().unwrap();
        prop_assert_eq!(last.len(), chunk_size + remainder);
        if remainder != 0 {
            prop_assert!(last.len() > chunk_size);
        }
    }

    #[test]
    fn planning_is_deterministic((size, count) in size_and_count()) {
        prop_assert_eq!(plan_ranges(size, count).unwrap(), plan_ranges(size, count).unwrap());
    }

    #[test]
    fn zero_chunks_always_rejected(size in 0u64..=u64::MAX) {
        prop_assert!(plan_ranges(size, 0).is_err());
    }
}
