//! Top-level declaration ordering for targets without hoisting.
//!
//! Python and C++ need a class defined before a module-level statement
//! constructs it. Statements are partitioned into buckets and emitted
//! bucket by bucket; order within a bucket is preserved.

/// Reordering buckets, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    /// Variables whose initializer constructs nothing.
    PlainVariable,
    Function,
    Type,
    /// Variables whose initializer constructs a type somewhere inside it.
    ConstructingVariable,
    Other,
}

/// Stable partition of `items` by bucket.
pub fn reorder<T>(mut items: Vec<T>, bucket: impl Fn(&T) -> Bucket) -> Vec<T> {
    items.sort_by_key(|item| bucket(item));
    items
}

/// Order classes so each base precedes its subclasses, keeping source order
/// otherwise. `base_of` names an item's base class; bases not in `items`
/// are ignored.
pub fn bases_first<T>(
    items: Vec<T>,
    name_of: impl Fn(&T) -> &str,
    base_of: impl Fn(&T) -> Option<&str>,
) -> Vec<T> {
    let names: Vec<String> = items.iter().map(|item| name_of(item).to_string()).collect();
    let bases: Vec<Option<usize>> = items
        .iter()
        .map(|item| base_of(item).and_then(|base| names.iter().position(|n| n == base)))
        .collect();

    let mut placed = vec![false; items.len()];
    let mut order = Vec::with_capacity(items.len());
    // Marking before recursing also terminates cyclic inheritance.
    fn place(i: usize, bases: &[Option<usize>], placed: &mut [bool], order: &mut Vec<usize>) {
        if placed[i] {
            return;
        }
        placed[i] = true;
        if let Some(base) = bases[i] {
            place(base, bases, placed, order);
        }
        order.push(i);
    }
    for i in 0..items.len() {
        place(i, &bases, &mut placed, &mut order);
    }

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_are_stable() {
        let items = vec![
            ("x", Bucket::ConstructingVariable),
            ("A", Bucket::Type),
            ("f", Bucket::Function),
            ("n", Bucket::PlainVariable),
            ("main()", Bucket::Other),
            ("m", Bucket::PlainVariable),
        ];
        let ordered: Vec<_> = reorder(items, |(_, b)| *b)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(ordered, ["n", "m", "f", "A", "x", "main()"]);
    }

    #[test]
    fn test_bases_precede_subclasses() {
        let classes = vec![("Derived", Some("Base")), ("Other", None), ("Base", Some("External"))];
        let ordered: Vec<_> = bases_first(classes, |(n, _)| *n, |(_, b)| *b)
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(ordered, ["Base", "Derived", "Other"]);
    }
}
