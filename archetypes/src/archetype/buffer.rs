use std::{any::type_name, marker::PhantomData};

use crate::{
    component::{Component, ComponentInfo},
    error::EcsError,
};

///
/// Buffer
///
/// Column of fixed-stride rows. Bytes live in `u64` words so that any row of a type
/// aligned to at most 8 bytes can be viewed in place.
///
#[derive(Clone, Debug)]
pub struct Buffer {
    info: ComponentInfo,
    words: Vec<u64>,
    rows: usize,
}

impl Buffer {
    pub fn new(info: ComponentInfo) -> Self {
        Buffer {
            info,
            words: Vec::new(),
            rows: 0,
        }
    }

    pub(crate) fn with_capacity(info: ComponentInfo, rows: usize) -> Self {
        let words = Vec::with_capacity((info.size() * rows).div_ceil(8));
        Buffer {
            info,
            words,
            rows: 0,
        }
    }

    pub fn info(&self) -> &ComponentInfo {
        &self.info
    }

    #[inline(always)]
    pub fn stride(&self) -> usize {
        self.info.size()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    #[inline]
    fn check<T: Component>(&self) -> Result<(), EcsError> {
        if self.info.matches::<T>() {
            Ok(())
        } else {
            Err(EcsError::TypeMismatch {
                expected: self.info.name(),
                found: type_name::<T>(),
            })
        }
    }

    #[inline(always)]
    fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.rows * self.stride()]
    }

    #[inline(always)]
    fn bytes_mut(&mut self) -> &mut [u8] {
        let used = self.rows * self.stride();
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..used]
    }

    /// Byte range of row `index`
    #[inline(always)]
    fn span(&self, index: usize) -> std::ops::Range<usize> {
        let start = index * self.stride();
        start..start + self.stride()
    }

    pub fn at<T: Component>(&self, index: usize) -> Result<&T, EcsError> {
        self.check::<T>()?;
        if index >= self.rows {
            return Err(EcsError::OutOfBounds);
        }
        let span = self.span(index);
        Ok(bytemuck::from_bytes(&self.bytes()[span]))
    }

    pub fn at_mut<T: Component>(&mut self, index: usize) -> Result<&mut T, EcsError> {
        self.check::<T>()?;
        if index >= self.rows {
            return Err(EcsError::OutOfBounds);
        }
        let span = self.span(index);
        Ok(bytemuck::from_bytes_mut(&mut self.bytes_mut()[span]))
    }

    /// Appends one row
    pub fn append<T: Component>(&mut self, item: T) -> Result<usize, EcsError> {
        self.check::<T>()?;
        Ok(self.append_bytes(bytemuck::bytes_of(&item)))
    }

    /// Removes row at `index` shifting all later rows left, so survivors keep their order.
    pub fn remove(&mut self, index: usize) -> Result<(), EcsError> {
        if index >= self.rows {
            return Err(EcsError::OutOfBounds);
        }
        let span = self.span(index);
        let stride = self.stride();
        let tail = self.rows * stride;
        let bytes = bytemuck::cast_slice_mut::<u64, u8>(&mut self.words);
        bytes.copy_within(span.end..tail, span.start);
        self.rows -= 1;
        self.words.truncate((self.rows * stride).div_ceil(8));
        Ok(())
    }

    /// Appends raw bytes of exactly one row and returns its index.
    pub(crate) fn append_bytes(&mut self, row: &[u8]) -> usize {
        debug_assert_eq!(row.len(), self.stride());
        let index = self.rows;
        let span = self.span(index);
        self.words.resize(span.end.div_ceil(8), 0);
        bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[span].copy_from_slice(row);
        self.rows += 1;
        index
    }

    /// Appends a copy of row `index` of `source`, which must hold the same type.
    pub(crate) fn append_from(&mut self, source: &Buffer, index: usize) -> Result<usize, EcsError> {
        if source.info != self.info {
            return Err(EcsError::TypeMismatch {
                expected: self.info.name(),
                found: source.info.name(),
            });
        }
        if index >= source.rows {
            return Err(EcsError::OutOfBounds);
        }
        Ok(self.append_bytes(&source.bytes()[source.span(index)]))
    }

    /// Moves every row of `source` to the end of this buffer, leaving `source` empty.
    pub(crate) fn drain_from(&mut self, source: &mut Buffer) -> Result<(), EcsError> {
        if source.info != self.info {
            return Err(EcsError::TypeMismatch {
                expected: self.info.name(),
                found: source.info.name(),
            });
        }
        let start = self.rows * self.stride();
        let end = start + source.rows * self.stride();
        self.words.resize(end.div_ceil(8), 0);
        bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[start..end]
            .copy_from_slice(source.bytes());
        self.rows += source.rows;
        source.truncate(0);
        Ok(())
    }

    /// Drops every row from `rows` onwards
    pub(crate) fn truncate(&mut self, rows: usize) {
        if rows < self.rows {
            self.rows = rows;
            self.words.truncate((rows * self.stride()).div_ceil(8));
        }
    }

    pub fn rows<T: Component>(&self) -> Result<Rows<'_, T>, EcsError> {
        self.check::<T>()?;
        Ok(Rows {
            bytes: self.bytes(),
            remaining: self.rows,
            _item: PhantomData,
        })
    }

    pub fn rows_mut<T: Component>(&mut self) -> Result<RowsMut<'_, T>, EcsError> {
        self.check::<T>()?;
        let remaining = self.rows;
        Ok(RowsMut {
            bytes: self.bytes_mut(),
            remaining,
            _item: PhantomData,
        })
    }
}

///
/// Rows
///
/// Row iterator yielding shared references. Works for zero-sized types too, where
/// every row is an empty span.
///
pub struct Rows<'a, T> {
    bytes: &'a [u8],
    remaining: usize,
    _item: PhantomData<fn() -> T>,
}

impl<'a, T: Component> Iterator for Rows<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let (row, rest) = self.bytes.split_at(size_of::<T>());
        self.bytes = rest;
        Some(bytemuck::from_bytes(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Component> ExactSizeIterator for Rows<'_, T> {}

///
/// RowsMut
///
pub struct RowsMut<'a, T> {
    bytes: &'a mut [u8],
    remaining: usize,
    _item: PhantomData<fn() -> T>,
}

impl<'a, T: Component> Iterator for RowsMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let bytes = std::mem::take(&mut self.bytes);
        let (row, rest) = bytes.split_at_mut(size_of::<T>());
        self.bytes = rest;
        Some(bytemuck::from_bytes_mut(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Component> ExactSizeIterator for RowsMut<'_, T> {}

///
/// Tests
///
#[cfg(test)]
mod test {
    use bytemuck::{Pod, Zeroable};
    use itertools::Itertools;

    use crate::{
        component::{ComponentId, ComponentInfo},
        error::EcsError,
    };

    use super::Buffer;

    #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Tag;

    fn position_buffer() -> Buffer {
        Buffer::new(ComponentInfo::of::<Position>(ComponentId::new(0)))
    }

    fn xs(buffer: &Buffer) -> Vec<f32> {
        buffer.rows::<Position>().unwrap().map(|p| p.x).collect_vec()
    }

    #[test]
    fn append_at() {
        let mut buffer = position_buffer();
        assert!(buffer.is_empty());
        assert_eq!(0, buffer.append(Position { x: 1., y: 2. }).unwrap());
        assert_eq!(1, buffer.append(Position { x: 3., y: 4. }).unwrap());
        assert_eq!(2, buffer.len());
        assert_eq!(8, buffer.stride());
        assert_eq!(&Position { x: 3., y: 4. }, buffer.at::<Position>(1).unwrap());

        buffer.at_mut::<Position>(0).unwrap().y = 7.;
        assert_eq!(7., buffer.at::<Position>(0).unwrap().y);
        assert_eq!(Err(EcsError::OutOfBounds), buffer.at::<Position>(2).map(|_| ()));
    }

    #[test]
    fn type_mismatch() {
        let mut buffer = position_buffer();
        buffer.append(Position { x: 1., y: 2. }).unwrap();
        // same size, different type
        assert!(matches!(
            buffer.at::<u64>(0),
            Err(EcsError::TypeMismatch { .. })
        ));
        assert!(matches!(
            buffer.append(1u32),
            Err(EcsError::TypeMismatch { .. })
        ));
        assert!(buffer.rows::<[f32; 2]>().is_err());
        assert_eq!(1, buffer.len());
    }

    #[test]
    fn remove_keeps_order() {
        let mut buffer = position_buffer();
        for i in 0..6 {
            buffer.append(Position { x: i as f32, y: 0. }).unwrap();
        }
        buffer.remove(0).unwrap();
        assert_eq!(vec![1., 2., 3., 4., 5.], xs(&buffer));
        buffer.remove(2).unwrap();
        assert_eq!(vec![1., 2., 4., 5.], xs(&buffer));
        buffer.remove(3).unwrap();
        assert_eq!(vec![1., 2., 4.], xs(&buffer));
        assert_eq!(Err(EcsError::OutOfBounds), buffer.remove(3));
        buffer.append(Position { x: 9., y: 0. }).unwrap();
        assert_eq!(vec![1., 2., 4., 9.], xs(&buffer));
    }

    #[test]
    fn odd_stride() {
        let mut buffer = Buffer::new(ComponentInfo::of::<[u8; 3]>(ComponentId::new(2)));
        for i in 0..5u8 {
            buffer.append([i, i + 1, i + 2]).unwrap();
        }
        buffer.remove(1).unwrap();
        assert_eq!(
            vec![[0, 1, 2], [2, 3, 4], [3, 4, 5], [4, 5, 6]],
            buffer.rows::<[u8; 3]>().unwrap().copied().collect_vec()
        );
    }

    #[test]
    fn zero_sized() {
        let mut buffer = Buffer::new(ComponentInfo::of::<Tag>(ComponentId::new(1)));
        buffer.append(Tag).unwrap();
        buffer.append(Tag).unwrap();
        assert_eq!(0, buffer.stride());
        assert_eq!(2, buffer.len());
        assert_eq!(&Tag, buffer.at::<Tag>(1).unwrap());
        assert_eq!(2, buffer.rows_mut::<Tag>().unwrap().count());
        buffer.remove(0).unwrap();
        assert_eq!(1, buffer.len());
    }

    #[test]
    fn rows_mut() {
        let mut buffer = position_buffer();
        for i in 0..3 {
            buffer.append(Position { x: i as f32, y: 0. }).unwrap();
        }
        for p in buffer.rows_mut::<Position>().unwrap() {
            p.x *= 10.;
        }
        assert_eq!(vec![0., 10., 20.], xs(&buffer));
    }

    #[test]
    fn copy_and_drain() {
        let mut a = position_buffer();
        let mut b = position_buffer();
        a.append(Position { x: 1., y: 1. }).unwrap();
        a.append(Position { x: 2., y: 2. }).unwrap();
        b.append(Position { x: 0., y: 0. }).unwrap();

        assert_eq!(1, b.append_from(&a, 1).unwrap());
        assert_eq!(vec![0., 2.], xs(&b));

        b.drain_from(&mut a).unwrap();
        assert!(a.is_empty());
        assert_eq!(vec![0., 2., 1., 2.], xs(&b));

        b.truncate(1);
        assert_eq!(vec![0.], xs(&b));

        let mut other = Buffer::new(ComponentInfo::of::<u64>(ComponentId::new(0)));
        assert!(other.drain_from(&mut b).is_err());
    }
}
