//! Persistence interface used by the editor.

mod memory;

pub use memory::MemoryBackend;

use crate::element::{Element, ElementId};
use crate::model::{Drawing, DrawingId, DrawingPatch, ElementPatch, NewElement};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Backend errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not authorized")]
    Unauthorized,
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Backend error: {0}")]
    Other(String),
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Remote store of drawings and their elements.
///
/// Element writes are applied one operation at a time; `replace_elements`
/// swaps a drawing's whole element set atomically.
pub trait Backend: Send + Sync {
    /// Load a drawing record.
    fn fetch_drawing(&self, id: &DrawingId) -> BoxFuture<'_, BackendResult<Drawing>>;

    /// Load a drawing's elements in insertion order.
    fn fetch_elements(&self, drawing: &DrawingId) -> BoxFuture<'_, BackendResult<Vec<Element>>>;

    /// Create an element. The returned element carries its assigned id.
    fn create_element(&self, drawing: &DrawingId, element: NewElement) -> BoxFuture<'_, BackendResult<Element>>;

    /// Apply a partial update.
    fn update_element(&self, id: &ElementId, patch: ElementPatch) -> BoxFuture<'_, BackendResult<Element>>;

    /// Delete an element.
    fn delete_element(&self, id: &ElementId) -> BoxFuture<'_, BackendResult<()>>;

    /// Replace every element of a drawing. Ids are kept unless they are
    /// local placeholders.
    fn replace_elements(&self, drawing: &DrawingId, elements: Vec<Element>) -> BoxFuture<'_, BackendResult<Vec<Element>>>;

    /// Update drawing settings (view box, scale, grid).
    fn update_drawing(&self, id: &DrawingId, patch: DrawingPatch) -> BoxFuture<'_, BackendResult<Drawing>>;
}

/// Simple blocking executor for tests.
#[cfg(test)]
pub(crate) fn block_on<F: Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);

    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
}
