//! The buffer stack: scoped, nestable output capture.
//!
//! Every composite element of a form renders into its own scratch buffer.
//! [`BufferScope::with_scope`] pushes that buffer, runs the caller's work and
//! pops it again on every exit path, so the depth after a scope always equals
//! the depth before it, whether the work succeeded, returned an error or
//! panicked.

use crate::error::{FormError, FormResult};
use crate::html::SafeFragment;

/// One append-only accumulator of markup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buffer {
    contents: SafeFragment,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, fragment: &SafeFragment) {
        self.contents.push(fragment);
    }

    pub fn contents(&self) -> &SafeFragment {
        &self.contents
    }

    pub fn as_str(&self) -> &str {
        self.contents.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    fn into_fragment(self) -> SafeFragment {
        self.contents
    }
}

/// What a call site does with the content captured by a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Fold the captured content into the parent buffer
    Append,
    /// Hand the captured content back to the caller
    Return,
}

/// LIFO stack of output buffers with a permanent root buffer
#[derive(Debug, Clone, PartialEq)]
pub struct BufferStack {
    buffers: Vec<Buffer>,
}

impl Default for BufferStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Restores the stack to `base` depth when dropped, including during unwinding
struct ScopeGuard<'a, H: AsMut<BufferStack>> {
    host: &'a mut H,
    base: usize,
}

impl<H: AsMut<BufferStack>> Drop for ScopeGuard<'_, H> {
    fn drop(&mut self) {
        let stack = self.host.as_mut();
        if stack.buffers.len() > self.base {
            stack.buffers.truncate(self.base);
            tracing::debug!(depth = self.base, "discarded form buffer of failed scope");
        }
    }
}

impl AsMut<BufferStack> for BufferStack {
    fn as_mut(&mut self) -> &mut BufferStack {
        self
    }
}

/// Scoped capture for anything that owns a [`BufferStack`].
///
/// The work closure receives the host itself (the bare stack, or a whole
/// [`RenderSession`](crate::session::RenderSession)) so nested call sites can
/// keep rendering through it.
pub trait BufferScope: AsMut<BufferStack> + Sized {
    /// Run `work` against a fresh buffer and return its value together with
    /// everything it appended.
    ///
    /// The pushed buffer is popped before any error (or panic) from `work`
    /// reaches the caller; its content is discarded in that case. If `work`
    /// leaves the stack at a different depth than it received, the scope
    /// fails with [`FormError::UnbalancedStack`].
    fn with_scope<T, F>(&mut self, work: F) -> FormResult<(T, SafeFragment)>
    where
        F: FnOnce(&mut Self) -> FormResult<T>,
    {
        let base = self.as_mut().buffers.len();
        if base == 0 {
            return Err(FormError::EmptyStack);
        }
        let expected = base + 1;

        self.as_mut().buffers.push(Buffer::new());
        tracing::trace!(depth = expected, "pushed form buffer");

        let mut guard = ScopeGuard { host: self, base };
        let result = work(&mut *guard.host);

        let stack = guard.host.as_mut();
        let actual = stack.buffers.len();
        let captured = if actual == expected {
            stack.buffers.pop()
        } else {
            None
        };
        drop(guard);

        let value = result?;
        match captured {
            Some(buffer) => {
                tracing::trace!(depth = base, "popped form buffer");
                Ok((value, buffer.into_fragment()))
            }
            None => {
                tracing::warn!(expected, actual, "buffer stack left unbalanced by scope");
                Err(FormError::UnbalancedStack { expected, actual })
            }
        }
    }

    /// [`with_scope`](Self::with_scope) when only the captured content matters
    fn capture<F>(&mut self, work: F) -> FormResult<SafeFragment>
    where
        F: FnOnce(&mut Self) -> FormResult<()>,
    {
        self.with_scope(work).map(|((), captured)| captured)
    }

    /// Capture `work` and append the result to the parent buffer
    fn capture_and_append<F>(&mut self, work: F) -> FormResult<()>
    where
        F: FnOnce(&mut Self) -> FormResult<()>,
    {
        let captured = self.capture(work)?;
        self.as_mut().append(captured)
    }

    /// Capture `work` and return the result without touching the parent buffer
    fn capture_and_return<F>(&mut self, work: F) -> FormResult<SafeFragment>
    where
        F: FnOnce(&mut Self) -> FormResult<()>,
    {
        self.capture(work)
    }

    /// Capture `work` and merge it according to `policy`.
    ///
    /// Returns the captured content only for [`MergePolicy::Return`].
    fn capture_with<F>(&mut self, policy: MergePolicy, work: F) -> FormResult<Option<SafeFragment>>
    where
        F: FnOnce(&mut Self) -> FormResult<()>,
    {
        match policy {
            MergePolicy::Append => self.capture_and_append(work).map(|()| None),
            MergePolicy::Return => self.capture_and_return(work).map(Some),
        }
    }
}

impl BufferScope for BufferStack {}

impl BufferStack {
    /// A stack holding only the empty root buffer
    pub fn new() -> Self {
        BufferStack {
            buffers: vec![Buffer::new()],
        }
    }

    /// Number of buffers on the stack, root included
    pub fn depth(&self) -> usize {
        self.buffers.len()
    }

    /// True when only the root buffer is present
    pub fn is_idle(&self) -> bool {
        self.buffers.len() == 1
    }

    /// The buffer currently receiving appends
    pub fn current(&self) -> FormResult<&Buffer> {
        self.buffers.last().ok_or(FormError::EmptyStack)
    }

    /// Append a fragment to the top buffer
    pub fn append(&mut self, fragment: SafeFragment) -> FormResult<()> {
        let top = self.buffers.last_mut().ok_or(FormError::EmptyStack)?;
        top.push(&fragment);
        Ok(())
    }

    /// Close the stack and return the root buffer's contents.
    ///
    /// Anything other than exactly the root buffer left on the stack is an
    /// invariant violation.
    pub fn finish(mut self) -> FormResult<SafeFragment> {
        if self.buffers.len() != 1 {
            return Err(FormError::UnbalancedStack {
                expected: 1,
                actual: self.buffers.len(),
            });
        }
        self.buffers
            .pop()
            .map(Buffer::into_fragment)
            .ok_or(FormError::EmptyStack)
    }

    #[cfg(test)]
    pub(crate) fn push_unscoped(&mut self) {
        self.buffers.push(Buffer::new());
    }

    #[cfg(test)]
    pub(crate) fn pop_unscoped(&mut self) -> Option<Buffer> {
        self.buffers.pop()
    }
}
