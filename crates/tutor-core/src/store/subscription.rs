use futures::Stream;
use tokio::sync::watch;

/// Cancellable handle delivering full ordered snapshots.
///
/// The first call to [`next`](Self::next) yields the snapshot current at
/// subscription time; later calls wait for the next change. Intermediate
/// snapshots may be coalesced, the latest one is never lost.
pub struct Subscription<T> {
    rx: Option<watch::Receiver<T>>,
    primed: bool,
}

impl<T: Clone> Subscription<T> {
    pub(crate) fn new(rx: watch::Receiver<T>) -> Self {
        Self {
            rx: Some(rx),
            primed: true,
        }
    }

    /// Wait for the next snapshot. `None` once cancelled or the source is gone.
    pub async fn next(&mut self) -> Option<T> {
        let rx = self.rx.as_mut()?;
        if self.primed {
            self.primed = false;
            return Some(rx.borrow_and_update().clone());
        }
        match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => {
                self.rx = None;
                None
            }
        }
    }

    /// Most recent snapshot without waiting.
    pub fn latest(&self) -> Option<T> {
        self.rx.as_ref().map(|rx| rx.borrow().clone())
    }

    pub fn cancel(&mut self) {
        self.rx = None;
    }

    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }

    pub fn into_stream(self) -> impl Stream<Item = T>
    where
        T: Send + Sync + 'static,
    {
        futures::stream::unfold(self, |mut sub| async move {
            let item = sub.next().await?;
            Some((item, sub))
        })
    }
}
