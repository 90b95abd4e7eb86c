//! Property-based tests for the visibility map against a per-line model.

use proptest::prelude::*;
use textflow::event::EditEvent;
use textflow::view::VisibilityMap;

#[derive(Clone, Debug)]
enum Op {
    Hide(usize, usize),
    Show(usize, usize),
    Narrow(usize, usize),
    InsertLines { at: usize, count: usize },
    RemoveLines { at: usize, count: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Hide(a, b)),
        3 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Show(a, b)),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Narrow(a, b)),
        2 => (any::<usize>(), 1usize..5).prop_map(|(at, count)| Op::InsertLines { at, count }),
        2 => (any::<usize>(), 1usize..5).prop_map(|(at, count)| Op::RemoveLines { at, count }),
    ]
}

fn ordered(a: usize, b: usize, len: usize) -> (usize, usize) {
    let (a, b) = (a % len, b % len);
    (a.min(b), a.max(b))
}

/// Apply `op` to the map and to the model of one flag per line.
fn apply(map: &mut VisibilityMap, model: &mut Vec<bool>, op: &Op) {
    let len = model.len();
    match *op {
        Op::Hide(a, b) | Op::Show(a, b) => {
            let visible = matches!(op, Op::Show(..));
            let (start, end) = ordered(a, b, len);
            if visible {
                map.show(start, end).unwrap();
            } else {
                map.hide(start, end).unwrap();
            }
            model[start..=end].fill(visible);
        }
        Op::Narrow(a, b) => {
            let (start, end) = ordered(a, b, len);
            map.narrow(start, end).unwrap();
            for (line, flag) in model.iter_mut().enumerate() {
                *flag = (start..=end).contains(&line);
            }
        }
        Op::InsertLines { at, count } => {
            let start = at % len;
            map.apply_edit(&EditEvent::insert(start, 0, count, count));
            let flag = model[start];
            model.splice(start + 1..start + 1, std::iter::repeat_n(flag, count));
        }
        Op::RemoveLines { at, count } => {
            if len == 1 {
                return;
            }
            let start = at % (len - 1);
            let count = count.min(len - 1 - start);
            map.apply_edit(&EditEvent::remove(start, 0, count, count));
            model.drain(start + 1..=start + count);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Visibility follows boundary parity and matches the model.
    #[test]
    fn parity_matches_model(
        lines in 1usize..40,
        ops in prop::collection::vec(op(), 0..30),
    ) {
        let mut map = VisibilityMap::new(lines);
        let mut model = vec![true; lines];
        for op in &ops {
            apply(&mut map, &mut model, op);
            prop_assert_eq!(map.line_count(), model.len());
            let boundaries = map.boundaries();
            prop_assert!(boundaries.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(boundaries.iter().all(|&b| b < model.len()));
            for (line, &expected) in model.iter().enumerate() {
                let parity = boundaries.iter().filter(|&&b| b <= line).count() % 2 == 0;
                prop_assert_eq!(parity, expected);
                prop_assert_eq!(map.is_visible(line).unwrap(), expected, "line {}", line);
            }
        }
    }

    /// next/prev visible agree with a linear scan of the model.
    #[test]
    fn navigation_matches_scan(
        lines in 1usize..40,
        ops in prop::collection::vec(op(), 0..20),
    ) {
        let mut map = VisibilityMap::new(lines);
        let mut model = vec![true; lines];
        for op in &ops {
            apply(&mut map, &mut model, op);
        }
        prop_assert_eq!(map.first_visible(), model.iter().position(|&v| v));
        prop_assert_eq!(map.last_visible(), model.iter().rposition(|&v| v));
        for line in 0..model.len() {
            let next = (line + 1..model.len()).find(|&l| model[l]);
            let prev = (0..line).rev().find(|&l| model[l]);
            prop_assert_eq!(map.next_visible(line).unwrap(), next);
            prop_assert_eq!(map.prev_visible(line).unwrap(), prev);
            if model[line] {
                if let Some(prev) = prev {
                    prop_assert_eq!(map.next_visible(prev).unwrap(), Some(line));
                }
            }
        }
    }

    /// Hidden ranges are maximal and exactly the hidden lines.
    #[test]
    fn hidden_ranges_are_maximal(
        lines in 1usize..40,
        ops in prop::collection::vec(op(), 0..20),
    ) {
        let mut map = VisibilityMap::new(lines);
        let mut model = vec![true; lines];
        for op in &ops {
            apply(&mut map, &mut model, op);
        }
        let mut rebuilt = vec![true; model.len()];
        let mut last_end: Option<usize> = None;
        for (start, end) in map.hidden_ranges() {
            prop_assert!(start <= end);
            if let Some(last_end) = last_end {
                prop_assert!(start > last_end + 1, "ranges should not touch");
            }
            rebuilt[start..=end].fill(false);
            last_end = Some(end);
        }
        prop_assert_eq!(rebuilt, model);
    }
}
