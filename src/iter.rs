/// Splits `iter` into consecutive runs. A new run begins at every item for
/// which `starts_run` holds; the first item always opens a run, whatever
/// the predicate says about it.
pub fn iter_runs<T, I, FS>(iter: I, starts_run: FS) -> impl Iterator<Item = Vec<T>>
where
    I: Iterator<Item = T>,
    FS: Fn(&T) -> bool,
{
    let mut iter = iter.peekable();
    std::iter::from_fn(move || {
        let first = iter.next()?;
        let mut run = vec![first];
        while let Some(next) = iter.next_if(|next| !starts_run(next)) {
            run.push(next);
        }
        Some(run)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_runs() {
        let v = vec![0, 1, 2, 0, 5, 0, 0, 7];
        let mut iter = iter_runs(v.into_iter(), |x| *x == 0);
        assert_eq!(iter.next(), Some(vec![0, 1, 2]));
        assert_eq!(iter.next(), Some(vec![0, 5]));
        assert_eq!(iter.next(), Some(vec![0]));
        assert_eq!(iter.next(), Some(vec![0, 7]));
        assert_eq!(iter.next(), None);

        let v = vec![3, 4, 0, 1];
        let mut iter = iter_runs(v.into_iter(), |x| *x == 0);
        assert_eq!(iter.next(), Some(vec![3, 4]));
        assert_eq!(iter.next(), Some(vec![0, 1]));
        assert_eq!(iter.next(), None);

        let v = Vec::<i32>::new();
        let mut iter = iter_runs(v.into_iter(), |x| *x == 0);
        assert_eq!(iter.next(), None);
    }
}
