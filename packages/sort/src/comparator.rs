use crate::error::SortResult;
use crate::natural::natural_compare;
use crate::options::{nested, position, OrderItem, SortMethod, StorySortOptions, WILDCARD};
use std::cmp::Ordering;

/// Anything that can be placed in the sidebar
pub trait Sortable {
    fn title(&self) -> &str;
    fn name(&self) -> &str;
}

impl<T: Sortable + ?Sized> Sortable for &T {
    fn title(&self) -> &str {
        (**self).title()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

fn segments(title: &str) -> Vec<&str> {
    title
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Compare two entries by title path, walking segments depth-first
pub fn compare<T: Sortable + ?Sized>(a: &T, b: &T, options: &StorySortOptions) -> Ordering {
    if !options.include_names && a.title() == b.title() {
        return Ordering::Equal;
    }

    let mut left = segments(a.title());
    let mut right = segments(b.title());
    if options.include_names {
        left.push(a.name());
        right.push(b.name());
    }

    let mut order: &[OrderItem] = &options.order;
    for depth in 0.. {
        match (left.get(depth), right.get(depth)) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l != r => return compare_segments(l, r, order, options),
            (Some(l), Some(_)) => order = nested(order, l),
        }
    }
    Ordering::Equal
}

/// Weights, then the active order list, then the configured method
fn compare_segments(
    left: &str,
    right: &str,
    order: &[OrderItem],
    options: &StorySortOptions,
) -> Ordering {
    let weight_left = options.weights.get(left);
    let weight_right = options.weights.get(right);
    if weight_left.is_some() || weight_right.is_some() {
        let weight_left = weight_left.copied().unwrap_or(0.0);
        let weight_right = weight_right.copied().unwrap_or(0.0);
        match weight_right.partial_cmp(&weight_left) {
            Some(Ordering::Equal) | None => {}
            Some(ordering) => return ordering,
        }
    }

    let index_left = position(order, left);
    let index_right = position(order, right);
    if index_left.is_some() || index_right.is_some() {
        let unlisted = position(order, WILDCARD).unwrap_or(order.len());
        return index_left
            .unwrap_or(unlisted)
            .cmp(&index_right.unwrap_or(unlisted));
    }

    match options.method {
        SortMethod::Configure => Ordering::Equal,
        SortMethod::Alphabetical => natural_compare(left, right),
    }
}

/// Stable sort that tolerates comparators which are not a strict total order
pub fn sort_entries<T: Sortable>(entries: Vec<T>, options: &StorySortOptions) -> SortResult<Vec<T>> {
    options.validate()?;
    Ok(merge_sort(entries, &|a: &T, b: &T| compare(a, b, options)))
}

fn merge_sort<T, F>(mut items: Vec<T>, cmp: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }

    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, cmp);
    let right = merge_sort(right, cmp);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        // Ties take from the left run
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => cmp(r, l) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Entry(&'static str, &'static str);

    impl Sortable for Entry {
        fn title(&self) -> &str {
            self.0
        }

        fn name(&self) -> &str {
            self.1
        }
    }

    #[test]
    fn test_same_title_is_equal_without_names() {
        let options = StorySortOptions::alphabetical();
        assert_eq!(
            compare(&Entry("A/B", "One"), &Entry("A/B", "Two"), &options),
            Ordering::Equal
        );
    }

    #[test]
    fn test_whitespace_around_separators_is_ignored() {
        let options = StorySortOptions::alphabetical();
        assert_eq!(
            compare(&Entry(" A / B ", "x"), &Entry("A/B", "x"), &options),
            Ordering::Equal
        );
    }

    #[test]
    fn test_shorter_path_first() {
        let options = StorySortOptions::alphabetical();
        assert_eq!(
            compare(&Entry("A", "x"), &Entry("A/B", "x"), &options),
            Ordering::Less
        );
    }

    #[test]
    fn test_heavier_weight_first() {
        let options = StorySortOptions::alphabetical()
            .with_weight("Zed", 10.0)
            .with_weight("Deprecated", -1.0);
        assert_eq!(
            compare(&Entry("Zed", "x"), &Entry("Alpha", "x"), &options),
            Ordering::Less
        );
        assert_eq!(
            compare(&Entry("Deprecated", "x"), &Entry("Alpha", "x"), &options),
            Ordering::Greater
        );
    }

    #[test]
    fn test_merge_sort_is_stable() {
        let items = vec![(1, 'a'), (0, 'b'), (1, 'c'), (0, 'd')];
        let sorted = merge_sort(items, &|a: &(i32, char), b: &(i32, char)| a.0.cmp(&b.0));
        assert_eq!(sorted, vec![(0, 'b'), (0, 'd'), (1, 'a'), (1, 'c')]);
    }
}
