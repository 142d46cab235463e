//! Key assignment for collections whose callers don't supply ids.
//!
//! A [`KeyGenerator`] derives each new key from the last one it handed out and writes it
//! onto the document before the insert reaches the backend:
//!
//! ```ignore
//! let students = TypedCollection::<Student>::new(backend, filters)
//!     .with_key_generator(KeyGenerator::new(
//!         |last, _| last.map_or(1, |id| id + 1),
//!         |student, id| student.id = id,
//!     ));
//!
//! let stored = students.insert(vec![Student { id: 0, name: "Ann Lee".into() }]).await?;
//! assert_eq!(stored[0].id, 1);
//! ```

use std::fmt;

use mea::mutex::Mutex;

use crate::document::Document;

type NextKey<D> = Box<dyn Fn(Option<&<D as Document>::Id>, &D) -> <D as Document>::Id + Send + Sync>;
type SetKey<D> = Box<dyn Fn(&mut D, <D as Document>::Id) + Send + Sync>;

/// Hands out sequential keys for documents of type `D`.
pub struct KeyGenerator<D: Document> {
    last: Mutex<Option<D::Id>>,
    next_key: NextKey<D>,
    set_key: SetKey<D>,
}

impl<D: Document> KeyGenerator<D> {
    /// `next_key` receives the last generated key (`None` before the first) and the
    /// document being keyed; `set_key` stores the result on the document.
    pub fn new(
        next_key: impl Fn(Option<&D::Id>, &D) -> D::Id + Send + Sync + 'static,
        set_key: impl Fn(&mut D, D::Id) + Send + Sync + 'static,
    ) -> Self {
        Self {
            last: Mutex::new(None),
            next_key: Box::new(next_key),
            set_key: Box::new(set_key),
        }
    }

    /// Continues a sequence from `last`, e.g. the highest id already stored.
    pub fn starting_after(self, last: D::Id) -> Self {
        Self {
            last: Mutex::new(Some(last)),
            ..self
        }
    }

    /// Keys every document in order. Keys handed out stay used even if the insert fails.
    pub async fn assign(&self, documents: &mut [D]) {
        let mut last = self.last.lock().await;

        for document in documents {
            let key = (self.next_key)(last.as_ref(), document);
            (self.set_key)(document, key.clone());
            *last = Some(key);
        }
    }
}

impl<D: Document> fmt::Debug for KeyGenerator<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGenerator").finish_non_exhaustive()
    }
}
