//! Reader/writer access to a buffer from several threads.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::Buffer;
use crate::error::Result;
use crate::highlight::Token;

/// A [`Buffer`] behind a reader/writer lock.
///
/// Readers block while a mutation is in flight and keep new mutations out
/// while they hold the lock. Readers that need tokens use
/// [`Buffer::tokenize_detached`], which leaves the caches untouched.
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer {
    inner: Arc<RwLock<Buffer>>,
}

impl SharedBuffer {
    #[must_use]
    pub fn new(buffer: Buffer) -> Self {
        Self {
            inner: Arc::new(RwLock::new(buffer)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Buffer> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Buffer> {
        self.inner.write()
    }

    /// Tokens of `line` computed under a read lock.
    pub fn tokens_detached(&self, line: usize) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        self.read().tokenize_detached(line, &mut tokens)?;
        Ok(tokens)
    }

    pub fn insert(&self, offset: usize, text: &str) -> Result<()> {
        self.write().insert(offset, text).map(|_| ())
    }

    pub fn remove(&self, offset: usize, length: usize) -> Result<()> {
        self.write().remove(offset, length).map(|_| ())
    }
}
