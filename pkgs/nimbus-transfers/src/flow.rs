//! Stream helpers: state containers, conflation and combine-latest

use futures::stream::{self, BoxStream, Stream, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio_stream::wrappers::WatchStream;

/// Observable value with last-value replay for new subscribers
#[derive(Debug, Clone)]
pub struct StateFlow<T> {
    sender: Arc<watch::Sender<T>>,
}

impl<T> StateFlow<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn value(&self) -> T {
        self.sender.borrow().clone()
    }

    /// Replace the current value; subscribers are woken even without receivers alive
    pub fn set(&self, value: T) {
        self.sender.send_replace(value);
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.sender.send_modify(f);
    }

    /// Stream that yields the current value first, then every later change
    pub fn subscribe(&self) -> BoxStream<'static, T> {
        WatchStream::new(self.sender.subscribe()).boxed()
    }
}

struct ConflatedSlot<T> {
    latest: Option<T>,
    done: bool,
}

/// Keep only the most recent unconsumed item when the consumer is slower than the producer.
///
/// The upstream is drained on its own task so it never waits on the consumer.
pub fn conflate<S>(upstream: S) -> impl Stream<Item = S::Item> + Send + 'static
where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
{
    let slot = Arc::new(Mutex::new(ConflatedSlot {
        latest: None,
        done: false,
    }));
    let notify = Arc::new(Notify::new());

    let producer = {
        let slot = slot.clone();
        let notify = notify.clone();
        tokio::spawn(async move {
            let mut upstream = Box::pin(upstream);
            while let Some(item) = upstream.next().await {
                slot.lock().latest = Some(item);
                notify.notify_one();
            }
            slot.lock().done = true;
            notify.notify_one();
        })
    };
    let guard = AbortOnDrop(producer);

    stream::unfold((slot, notify, guard), |(slot, notify, guard)| async move {
        loop {
            {
                let mut state = slot.lock();
                if let Some(item) = state.latest.take() {
                    drop(state);
                    return Some((item, (slot, notify, guard)));
                }
                if state.done {
                    return None;
                }
            }
            notify.notified().await;
        }
    })
}

struct AbortOnDrop(tokio::task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Emit the latest value of every input each time any of them emits.
///
/// Nothing is emitted until every input has produced at least one value.
/// The combined stream ends once all inputs end.
pub fn combine_latest<T>(inputs: Vec<BoxStream<'static, T>>) -> BoxStream<'static, Vec<T>>
where
    T: Clone + Send + 'static,
{
    let len = inputs.len();
    let indexed = stream::select_all(
        inputs
            .into_iter()
            .enumerate()
            .map(|(index, input)| input.map(move |value| (index, value)).boxed()),
    );
    let latest: Vec<Option<T>> = vec![None; len];

    indexed
        .scan(latest, |latest, (index, value)| {
            latest[index] = Some(value);
            let snapshot: Option<Vec<T>> = latest.iter().cloned().collect();
            futures::future::ready(Some(snapshot))
        })
        .filter_map(futures::future::ready)
        .boxed()
}

/// Pair the latest values of two differently typed streams
pub fn combine_latest2<A, B>(
    left: BoxStream<'static, A>,
    right: BoxStream<'static, B>,
) -> BoxStream<'static, (A, B)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
{
    enum Side<L, R> {
        Left(L),
        Right(R),
    }

    stream::select(left.map(Side::Left), right.map(Side::Right))
        .scan((None, None), |latest: &mut (Option<A>, Option<B>), side| {
            match side {
                Side::Left(value) => latest.0 = Some(value),
                Side::Right(value) => latest.1 = Some(value),
            }
            let pair = match latest {
                (Some(a), Some(b)) => Some((a.clone(), b.clone())),
                _ => None,
            };
            futures::future::ready(Some(pair))
        })
        .filter_map(futures::future::ready)
        .boxed()
}
