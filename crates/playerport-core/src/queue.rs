// Bounded async work queue used for commit loops.
//
// Items start in input order with at most `concurrency` calls in flight. With
// a limit of 1 the queue is strictly sequential: item n+1 does not start until
// item n has completed and its completion callback has run. Cancellation is
// checked as each item is about to start; items that never start are reported
// as skipped, calls already in flight run to completion.

use std::future::Future;

use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T, E> {
    Done(T),
    Failed(E),
    Skipped,
}

impl<T, E> Outcome<T, E> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }
}

/// Run `work` over `items`, calling `on_complete(index, &outcome)` as each item
/// finishes. Returns every outcome paired with its input index, sorted by
/// index.
pub async fn run_queue<I, T, E, F, Fut, C>(
    items: Vec<I>,
    concurrency: usize,
    cancel: &CancellationToken,
    work: F,
    mut on_complete: C,
) -> Vec<(usize, Outcome<T, E>)>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: FnMut(usize, &Outcome<T, E>),
{
    let limit = concurrency.max(1);
    let work = &work;

    let mut pending = stream::iter(items.into_iter().enumerate())
        .map(|(idx, item)| {
            let call = (!cancel.is_cancelled()).then(|| work(item));
            async move {
                let outcome = match call {
                    None => Outcome::Skipped,
                    Some(call) => match call.await {
                        Ok(value) => Outcome::Done(value),
                        Err(err) => Outcome::Failed(err),
                    },
                };
                (idx, outcome)
            }
        })
        .buffer_unordered(limit);

    let mut results = Vec::new();
    while let Some((idx, outcome)) = pending.next().await {
        on_complete(idx, &outcome);
        results.push((idx, outcome));
    }

    results.sort_by_key(|(idx, _)| *idx);
    results
}
