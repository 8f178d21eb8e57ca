use crate::document::Document;

///
/// DocumentObserver
///
/// Hooks a repository calls around the codec. `after_encode` sees each
/// document before it is registered for writing; `before_decode` sees each
/// stored document before its payload is turned back into an entity.
///

pub trait DocumentObserver<T>: Send + Sync {
    fn after_encode(&self, _view: &str, _document: &mut Document<T>) {}

    fn before_decode(&self, _view: &str, _document: &mut Document<T>) {}
}
