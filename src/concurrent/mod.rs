//! Module for handling safe interactions among the multiple clients making use
//! of a single Media Driver.

pub mod broadcast;
pub mod ring_buffer;

use std::mem::size_of;
use std::ops::{Deref, DerefMut};
use std::ptr::{read_volatile, write_volatile};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::{AeronError, Result};
use crate::util::IndexT;

use memmap::MmapMut;

fn bounds_check_slice(slice: &[u8], offset: IndexT, size: IndexT) -> Result<()> {
    if offset < 0 || size < 0 || slice.len() as IndexT - offset < size {
        Err(AeronError::OutOfBounds)
    } else {
        Ok(())
    }
}

/// Atomic operations on slices of memory. Implemented for owned buffers,
/// borrowed slices, and memory-mapped regions alike, so the ring buffer and
/// broadcast receiver types work the same whether they sit over a `Vec<u8>`
/// in a unit test or a `memmap::MmapMut` talking to the real media driver.
pub trait AtomicBuffer: Deref<Target = [u8]> + DerefMut<Target = [u8]> {
    /// Check that there are at least `size` bytes of memory available
    /// beginning at some offset.
    fn bounds_check(&self, offset: IndexT, size: IndexT) -> Result<()> {
        bounds_check_slice(self.deref(), offset, size)
    }

    /// Overlay a struct on a buffer.
    ///
    /// NOTE: Has the potential to cause undefined behavior if alignment is incorrect.
    fn overlay<T>(&self, offset: IndexT) -> Result<&T>
    where
        T: Sized,
    {
        self.bounds_check(offset, size_of::<T>() as IndexT).map(|_| {
            let offset_ptr = unsafe { self.as_ptr().offset(offset as isize) };
            unsafe { &*(offset_ptr as *const T) }
        })
    }

    /// Overlay a mutable value on the buffer.
    fn overlay_mut<T>(&mut self, offset: IndexT) -> Result<&mut T>
    where
        T: Sized,
    {
        self.bounds_check(offset, size_of::<T>() as IndexT).map(|_| {
            let offset_ptr = unsafe { self.as_mut_ptr().offset(offset as isize) };
            unsafe { &mut *(offset_ptr as *mut T) }
        })
    }

    /// Overlay a struct on a buffer, and perform a volatile read
    fn overlay_volatile<T>(&self, offset: IndexT) -> Result<T>
    where
        T: Copy,
    {
        self.bounds_check(offset, size_of::<T>() as IndexT).map(|_| {
            let offset_ptr = unsafe { self.as_ptr().offset(offset as isize) };
            unsafe { read_volatile(offset_ptr as *const T) }
        })
    }

    /// Perform a volatile write of a value over a buffer
    fn write_volatile<T>(&mut self, offset: IndexT, val: T) -> Result<()>
    where
        T: Copy,
    {
        self.bounds_check(offset, size_of::<T>() as IndexT).map(|_| {
            let offset_ptr = unsafe { self.as_mut_ptr().offset(offset as isize) };
            unsafe { write_volatile(offset_ptr as *mut T, val) };
        })
    }

    /// Perform an atomic fetch and add of a 64-bit value
    fn get_and_add_i64(&self, offset: IndexT, value: i64) -> Result<i64> {
        self.overlay::<AtomicI64>(offset)
            .map(|a| a.fetch_add(value, Ordering::SeqCst))
    }

    /// Perform an atomic Compare-And-Swap of a 64-bit value. Returns `Ok(true)`
    /// if the update was successful, and `Ok(false)` if the update failed.
    fn compare_and_set_i64(&self, offset: IndexT, expected: i64, update: i64) -> Result<bool> {
        self.overlay::<AtomicI64>(offset).map(|a| {
            a.compare_exchange(expected, update, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        })
    }

    /// Perform a volatile read of an `i64` value
    fn get_i64_volatile(&self, offset: IndexT) -> Result<i64> {
        self.overlay_volatile::<i64>(offset)
    }

    /// Read an `i64` value from the buffer without performing any synchronization
    fn get_i64(&self, offset: IndexT) -> Result<i64> {
        self.overlay::<i64>(offset).map(|i| *i)
    }

    /// Perform a volatile write of an `i64` value
    fn put_i64_ordered(&mut self, offset: IndexT, value: i64) -> Result<()> {
        self.write_volatile::<i64>(offset, value)
    }

    /// Write an `i64` value into the buffer without performing any synchronization
    fn put_i64(&mut self, offset: IndexT, value: i64) -> Result<()> {
        self.overlay_mut::<i64>(offset).map(|i| *i = value)
    }

    /// Write the contents of a byte slice to this buffer. Does not perform any synchronization
    fn put_slice(&mut self, index: IndexT, source: &[u8], source_index: IndexT, len: IndexT) -> Result<()> {
        self.bounds_check(index, len)?;
        bounds_check_slice(source, source_index, len)?;

        let index = index as usize;
        let source_index = source_index as usize;
        let len = len as usize;

        self[index..index + len].copy_from_slice(&source[source_index..source_index + len]);
        Ok(())
    }

    /// Write the contents of one buffer to another. Does not perform any synchronization
    fn put_bytes<B>(&mut self, index: IndexT, source: &B, source_index: IndexT, len: IndexT) -> Result<()>
    where
        B: AtomicBuffer,
    {
        self.bounds_check(index, len)?;
        source.bounds_check(source_index, len)?;

        let index = index as usize;
        let source_index = source_index as usize;
        let len = len as usize;

        self[index..index + len].copy_from_slice(&source[source_index..source_index + len]);
        Ok(())
    }

    /// Repeatedly write a value into an atomic buffer. Guaranteed to use `memset`.
    fn set_memory(&mut self, offset: IndexT, length: usize, value: u8) -> Result<()> {
        self.bounds_check(offset, length as IndexT).map(|_| unsafe {
            self.as_mut_ptr().offset(offset as isize).write_bytes(value, length)
        })
    }

    /// Perform a volatile read of an `i32` from the buffer
    fn get_i32_volatile(&self, offset: IndexT) -> Result<i32> {
        self.overlay_volatile::<i32>(offset)
    }

    /// Read an `i32` value from the buffer without performing any synchronization
    fn get_i32(&self, offset: IndexT) -> Result<i32> {
        self.overlay::<i32>(offset).map(|i| *i)
    }

    /// Perform a volatile write of an `i32` into the buffer
    fn put_i32_ordered(&mut self, offset: IndexT, value: i32) -> Result<()> {
        self.write_volatile::<i32>(offset, value)
    }

    /// Write an `i32` value into the buffer without performing any synchronization
    fn put_i32(&mut self, offset: IndexT, value: i32) -> Result<()> {
        self.overlay_mut::<i32>(offset).map(|i| *i = value)
    }

    /// Read a length-prefixed UTF-8 string at `offset`: a 4-byte little/native-endian
    /// length followed by that many bytes of UTF-8.
    fn get_string(&self, offset: IndexT) -> Result<&str> {
        let len = self.get_i32(offset)?;
        self.bounds_check(offset + 4, len)?;
        let start = (offset + 4) as usize;
        let end = start + len as usize;
        std::str::from_utf8(&self[start..end]).map_err(|_| AeronError::IllegalArgument)
    }

    /// Write a length-prefixed UTF-8 string at `offset`. Returns the total number
    /// of bytes occupied (4-byte length prefix plus payload).
    fn put_string(&mut self, offset: IndexT, value: &str) -> Result<i32> {
        let bytes = value.as_bytes();
        let len = bytes.len() as IndexT;
        self.put_i32(offset, len)?;
        self.put_slice(offset + 4, bytes, 0, len)?;
        Ok(len + 4)
    }

    /// Return the total number of bytes in this buffer
    fn capacity(&self) -> IndexT {
        self.len() as IndexT
    }
}

impl AtomicBuffer for Vec<u8> {}

impl AtomicBuffer for &mut [u8] {}

impl AtomicBuffer for MmapMut {}
