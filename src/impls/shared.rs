/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::sync::{Arc, Mutex, MutexGuard};

use crate::traits::ByteStream;

/// A byte stream shared among several record streams.
///
/// Cloning a `SharedStream` yields another handle on the same stream. Every
/// positioned operation (a seek followed by the reads or writes depending on
/// it) must be performed while holding the guard returned by
/// [`lock`](SharedStream::lock), so that no other handle can move the cursor
/// in between.
///
/// The same `SharedStream` can serve as both the info stream and the data
/// stream of a record stream.
#[derive(Debug)]
pub struct SharedStream<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SharedStream<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ByteStream> SharedStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(stream)),
        }
    }

    /// Lock the stream for a positioned operation.
    ///
    /// A lock poisoned by a panicking holder is taken over: byte streams
    /// have no invariant a panic could break, and record metadata lives in
    /// the record streams.
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return whether `self` and `other` are handles on the same stream.
    pub fn same_stream(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Return the stream if this is the last handle, or `self` otherwise.
    pub fn into_inner(self) -> Result<S, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex
                .into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner())),
            Err(inner) => Err(Self { inner }),
        }
    }
}

impl<S: ByteStream> From<S> for SharedStream<S> {
    fn from(stream: S) -> Self {
        Self::new(stream)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_handles() -> std::io::Result<()> {
        let a = SharedStream::new(Cursor::new(Vec::new()));
        let b = a.clone();
        assert!(a.same_stream(&b));
        a.lock().write_u64(7)?;
        {
            let mut s = b.lock();
            s.seek_to(0)?;
            assert_eq!(s.read_u64()?, 7);
        }
        let a = a.into_inner().unwrap_err();
        drop(b);
        assert_eq!(a.into_inner().unwrap().into_inner().len(), 8);
        Ok(())
    }
}
