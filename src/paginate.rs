use anyhow::Result;

use crate::normalize::{RowOutcome, SkipTally, keep_parsed};

/// Explicit end-of-data marker a page may carry. When present it wins over the
/// empty-page rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSignal {
    More,
    Last,
}

#[derive(Debug)]
pub struct LegPage<T> {
    pub rows: Vec<RowOutcome<T>>,
    pub signal: Option<PageSignal>,
}

impl<T> LegPage<T> {
    pub fn from_rows(rows: Vec<RowOutcome<T>>) -> Self {
        Self { rows, signal: None }
    }

    pub fn with_signal(mut self, signal: PageSignal) -> Self {
        self.signal = Some(signal);
        self
    }
}

#[derive(Debug)]
pub struct Paginated<T> {
    pub records: Vec<T>,
    pub pages_fetched: usize,
    pub skipped: SkipTally,
    /// The leg cap stopped the loop before the site said it was done.
    pub capped: bool,
}

/// Fetch legs `1, 2, 3, …` until a page has no usable rows (or says it is the
/// last one), returning records in leg-then-page order.
///
/// The site has no last-leg marker, so an empty page is the end of data. A
/// mid-sequence page that is temporarily empty ends the loop too.
pub fn paginate_legs<T, F>(max_legs: u32, mut fetch_leg: F) -> Result<Paginated<T>>
where
    F: FnMut(u32) -> Result<LegPage<T>>,
{
    let mut out = Paginated {
        records: Vec::new(),
        pages_fetched: 0,
        skipped: SkipTally::default(),
        capped: false,
    };

    let mut leg = 1;
    loop {
        if leg > max_legs {
            tracing::warn!(max_legs, "leg cap reached before end of data");
            out.capped = true;
            break;
        }

        let page = fetch_leg(leg)?;
        out.pages_fetched += 1;
        let kept = keep_parsed(page.rows, &mut out.skipped);
        let done = match page.signal {
            Some(PageSignal::Last) => true,
            Some(PageSignal::More) => false,
            None => kept.is_empty(),
        };
        tracing::debug!(leg, rows = kept.len(), done, "leg page");
        out.records.extend(kept);
        if done {
            break;
        }
        leg += 1;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::normalize::SkipReason;

    fn page(rows: &[Result<u32, SkipReason>]) -> LegPage<u32> {
        LegPage::from_rows(rows.to_vec())
    }

    #[test]
    fn stops_on_first_empty_page() {
        let mut fetched = Vec::new();
        let out = paginate_legs(16, |leg| {
            fetched.push(leg);
            Ok(match leg {
                1 => page(&[Ok(10), Ok(11)]),
                2 => page(&[Ok(20)]),
                3 => page(&[]),
                _ => return Err(anyhow!("leg {leg} should not be fetched")),
            })
        })
        .unwrap();
        assert_eq!(out.records, vec![10, 11, 20]);
        assert_eq!(fetched, vec![1, 2, 3]);
        assert_eq!(out.pages_fetched, 3);
        assert!(!out.capped);
    }

    #[test]
    fn page_of_only_malformed_rows_ends_pagination() {
        let out = paginate_legs(16, |leg| {
            Ok(match leg {
                1 => page(&[Ok(1), Err(SkipReason::Missing("time"))]),
                2 => page(&[Err(SkipReason::Missing("time"))]),
                _ => return Err(anyhow!("unexpected leg {leg}")),
            })
        })
        .unwrap();
        assert_eq!(out.records, vec![1]);
        assert_eq!(out.skipped.total, 2);
    }

    #[test]
    fn explicit_signal_takes_precedence() {
        let out = paginate_legs(16, |leg| {
            Ok(match leg {
                1 => page(&[]).with_signal(PageSignal::More),
                2 => page(&[Ok(2)]).with_signal(PageSignal::Last),
                _ => return Err(anyhow!("unexpected leg {leg}")),
            })
        })
        .unwrap();
        assert_eq!(out.records, vec![2]);
        assert_eq!(out.pages_fetched, 2);
    }

    #[test]
    fn cap_bounds_the_loop() {
        let out = paginate_legs(3, |leg| Ok(page(&[Ok(leg)]))).unwrap();
        assert_eq!(out.records, vec![1, 2, 3]);
        assert!(out.capped);
    }

    #[test]
    fn fetch_error_propagates() {
        let res: Result<Paginated<u32>> = paginate_legs(16, |_| Err(anyhow!("boom")));
        assert!(res.is_err());
    }
}
