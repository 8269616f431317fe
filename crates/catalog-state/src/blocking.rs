//! Index-driven blocking reads.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::StateResult;
use crate::watch::WatchSet;

/// Run `query` until it reports an index above `min_index`.
///
/// Each pass gets a fresh [`WatchSet`]; the query is re-run whenever one of
/// its registrations fires. Gives up when `timeout` elapses and returns the
/// latest result. A `min_index` of 0 never blocks. A timeout too large to
/// form a deadline waits without one.
pub async fn blocking_query<T, F>(
    min_index: u64,
    timeout: Duration,
    mut query: F,
) -> StateResult<(u64, T)>
where
    F: FnMut(&mut WatchSet) -> StateResult<(u64, T)>,
{
    let deadline = Instant::now().checked_add(timeout);
    loop {
        let mut ws = WatchSet::new();
        let (index, result) = query(&mut ws)?;
        if min_index == 0 || index > min_index {
            return Ok((index, result));
        }
        match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() || !ws.wait_timeout(remaining).await {
                    return Ok((index, result));
                }
            }
            None => ws.wait().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StateStore;
    use crate::types::{Coordinate, CoordinateEntry, Node};

    #[tokio::test]
    async fn zero_min_index_returns_immediately() {
        let store = StateStore::open_in_memory().unwrap();
        let (idx, all) = blocking_query(0, Duration::from_secs(60), |ws| {
            store.coordinates(Some(ws), None)
        })
        .await
        .unwrap();
        assert_eq!(idx, 0);
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn returns_once_index_passes_minimum() {
        let store = StateStore::open_in_memory().unwrap();
        store.ensure_node(1, &Node::new("node1", "10.0.0.1")).unwrap();
        store.ensure_node(2, &Node::new("node2", "10.0.0.2")).unwrap();

        let writer = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            // Rejected entry: index moves, no row changes, no wakeup.
            writer
                .coordinate_batch_update(3, &[CoordinateEntry::new("ghost", "", Coordinate::new(2))])
                .unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer
                .coordinate_batch_update(4, &[CoordinateEntry::new("node1", "", Coordinate::new(2))])
                .unwrap();
        });

        let (idx, set) = blocking_query(2, Duration::from_secs(5), |ws| {
            store.coordinate(Some(ws), "node1", None)
        })
        .await
        .unwrap();
        assert_eq!(idx, 4);
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn unbounded_timeout_still_wakes_on_change() {
        let store = StateStore::open_in_memory().unwrap();
        store.ensure_node(1, &Node::new("node1", "10.0.0.1")).unwrap();

        let writer = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer
                .coordinate_batch_update(6, &[CoordinateEntry::new("node1", "", Coordinate::new(2))])
                .unwrap();
        });

        let query = blocking_query(5, Duration::from_secs(u64::MAX), |ws| {
            store.coordinates(Some(ws), None)
        });
        let (idx, all) = tokio::time::timeout(Duration::from_secs(5), query)
            .await
            .expect("blocking query should wake on the write")
            .unwrap();
        assert_eq!(idx, 6);
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn timeout_returns_latest_result() {
        let store = StateStore::open_in_memory().unwrap();
        store.ensure_node(1, &Node::new("node1", "10.0.0.1")).unwrap();
        store
            .coordinate_batch_update(2, &[CoordinateEntry::new("node1", "", Coordinate::new(2))])
            .unwrap();

        let (idx, set) = blocking_query(2, Duration::from_millis(30), |ws| {
            store.coordinate(Some(ws), "node1", None)
        })
        .await
        .unwrap();
        assert_eq!(idx, 2);
        assert_eq!(set.len(), 1);
    }
}
