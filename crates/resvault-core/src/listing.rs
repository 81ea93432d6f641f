//! Read-only enumeration of everything held in the object store.

use futures::stream::{self, BoxStream};
use futures::{StreamExt, future};

use crate::error::AppError;
use crate::models::InventoryItem;
use crate::progress::{ListingEvent, ProgressReporter};
use crate::traits::ObjectStore;

/// Totals gathered while walking the inventory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListingSummary {
    pub buckets: usize,
    pub objects: usize,
    pub total_bytes: u64,
}

/// Service listing buckets and their objects.
///
/// Never writes to the store.
pub struct ListingService<S: ObjectStore> {
    store: S,
}

impl<S: ObjectStore> Clone for ListingService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: ObjectStore> ListingService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Streams every bucket, each followed by its objects.
    ///
    /// Object pages are only requested once the consumer reaches them. An
    /// error ends neither the stream nor the listing of other buckets; it is
    /// yielded in place and the consumer decides.
    pub fn inventory(&self) -> BoxStream<'_, Result<InventoryItem, AppError>> {
        self.store
            .list_buckets()
            .flat_map(move |bucket| match bucket {
                Ok(bucket) => {
                    let name = bucket.name.clone();
                    let objects = self.store.list_objects(&name).map(move |object| {
                        object.map(|object| InventoryItem::Object {
                            bucket: name.clone(),
                            object,
                        })
                    });
                    stream::once(future::ready(Ok(InventoryItem::Bucket(bucket))))
                        .chain(objects)
                        .boxed()
                }
                Err(e) => stream::once(future::ready(Err(e))).boxed(),
            })
            .boxed()
    }

    /// Walks the inventory, reporting each entry.
    ///
    /// # Errors
    ///
    /// The first storage error stops the walk and is returned.
    pub async fn report<R: ProgressReporter>(
        &self,
        reporter: &R,
    ) -> Result<ListingSummary, AppError> {
        let mut summary = ListingSummary::default();
        let mut items = self.inventory();

        while let Some(item) = items.next().await {
            match item? {
                InventoryItem::Bucket(bucket) => {
                    summary.buckets += 1;
                    reporter.report_listing(ListingEvent::Bucket(&bucket));
                }
                InventoryItem::Object { bucket, object } => {
                    summary.objects += 1;
                    summary.total_bytes += object.size;
                    reporter.report_listing(ListingEvent::Object {
                        bucket: &bucket,
                        object: &object,
                    });
                }
            }
        }

        tracing::debug!(
            buckets = summary.buckets,
            objects = summary.objects,
            total_bytes = summary.total_bytes,
            "Listing finished"
        );
        Ok(summary)
    }
}
