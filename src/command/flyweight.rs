//! Flyweight pattern implementation for messages to and from the media driver.
use crate::concurrent::AtomicBuffer;
use crate::error::Result;
use crate::util::IndexT;
use std::marker::PhantomData;

/// Flyweight holder object. Wrapper around an underlying `AtomicBuffer` and
/// offset within that buffer that all future operations are relative to.
pub struct Flyweight<A, S>
where
    A: AtomicBuffer,
{
    pub(crate) buffer: A,
    base_offset: IndexT,
    _phantom: PhantomData<S>,
}

/// Marker struct for an uninitialized `Flyweight` object
pub struct Unchecked;

impl<A> Flyweight<A, Unchecked>
where
    A: AtomicBuffer,
{
    /// Create a new flyweight object. Performs a bounds check on initialization
    /// to ensure there is space available for `S`.
    #[allow(clippy::new_ret_no_self)]
    pub fn new<S>(buffer: A, offset: IndexT) -> Result<Flyweight<A, S>>
    where
        S: Sized,
    {
        buffer.overlay::<S>(offset)?;
        Ok(Flyweight {
            buffer,
            base_offset: offset,
            _phantom: PhantomData,
        })
    }
}

impl<A, S> Flyweight<A, S>
where
    A: AtomicBuffer,
    S: Sized,
{
    pub(crate) fn get_struct(&self) -> &S {
        // UNWRAP: Bounds check performed during initialization
        self.buffer.overlay::<S>(self.base_offset).unwrap()
    }

    pub(crate) fn get_struct_mut(&mut self) -> &mut S {
        // UNWRAP: Bounds check performed during initialization
        self.buffer.overlay_mut::<S>(self.base_offset).unwrap()
    }

    pub(crate) fn bytes_at(&self, offset: IndexT) -> Result<&[u8]> {
        let offset = (self.base_offset + offset) as usize;
        self.buffer.bounds_check(offset as IndexT, 0)?;
        Ok(&self.buffer[offset..])
    }

    pub(crate) fn string_get(&self, offset: IndexT) -> Result<&str> {
        self.buffer.get_string(self.base_offset + offset)
    }

    pub(crate) fn string_put(&mut self, offset: IndexT, value: &str) -> Result<i32> {
        self.buffer.put_string(self.base_offset + offset, value)
    }

    pub(crate) fn put_slice_at(&mut self, offset: IndexT, src: &[u8]) -> Result<()> {
        self.buffer.put_slice(self.base_offset + offset, src, 0, src.len() as IndexT)
    }

    /// Consume the flyweight and return the underlying buffer, useful once a
    /// command has been fully populated and is ready to be written verbatim.
    pub fn into_buffer(self) -> A {
        self.buffer
    }
}
